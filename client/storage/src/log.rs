//! Logging setup for the inscription indexer
//!
//! - JSON logging in Bunyan format or human-readable text
//! - Auto-detection based on whether stdout is a TTY (JSON if non-TTY, Text if TTY)
//! - Bunyan output renames the `log.` fields to `indexer_log.`, which log
//!   ingestion tools reserve

use std::io::Write;

use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::{config::LogFormat, constants::log::APP_NAME};

const RESERVED_PREFIX: &str = "\"log.";
const REPLACEMENT_PREFIX: &str = "\"indexer_log.";

/// Writer replacing the `log.` field prefix of Bunyan records.
struct PrefixReplacingWriter<W: Write> {
    inner: W,
}

impl<W: Write> PrefixReplacingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for PrefixReplacingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match std::str::from_utf8(buf) {
            Ok(s) => {
                let replaced = s.replace(RESERVED_PREFIX, REPLACEMENT_PREFIX);
                self.inner.write_all(replaced.as_bytes())?;
                Ok(buf.len())
            }
            // Not UTF-8, pass it through untouched
            Err(_) => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

struct PrefixReplacingMakeWriter;

impl<'a> MakeWriter<'a> for PrefixReplacingMakeWriter {
    type Writer = PrefixReplacingWriter<std::io::Stdout>;

    fn make_writer(&'a self) -> Self::Writer {
        PrefixReplacingWriter::new(std::io::stdout())
    }
}

/// Install the global tracing subscriber.
///
/// Filtering follows `RUST_LOG`. Batch statements are logged under the
/// `insc_storage::sql` target, so `RUST_LOG=insc_storage::sql=debug` shows them
/// when `database.enable_log` is set.
pub fn initialize_logging(log_format: LogFormat) {
    let env_filter = EnvFilter::from_default_env();

    match log_format.resolve() {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(JsonStorageLayer)
                .with(BunyanFormattingLayer::new(
                    APP_NAME.to_string(),
                    PrefixReplacingMakeWriter,
                ))
                .init();
        }
        LogFormat::Text | LogFormat::Auto => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
