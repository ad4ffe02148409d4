use std::{fs::File, io::BufReader, time::Duration};

use diesel::{ConnectionError, ConnectionResult};
use diesel_async::{
    pooled_connection::{
        bb8::{Pool, PooledConnection},
        AsyncDieselConnectionManager, ManagerConfig,
    },
    AsyncPgConnection, RunQueryDsl,
};
use futures::{future::BoxFuture, FutureExt};
use rustls::{ClientConfig, RootCertStore};
use rustls_pemfile::certs as load_pem_certs;
use rustls_platform_verifier::ConfigVerifierExt;
use thiserror::Error;
use tracing::warn;

pub mod batch;
pub mod models;
pub mod schema;
pub mod types;

pub use batch::{BatchExecutor, BatchPatchSet, BatchUpdate, BatchUpdateError};
pub use types::Sid;

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConnection<'a> = PooledConnection<'a, AsyncPgConnection>;

#[derive(Error, Debug)]
pub enum DbSetupError {
    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] ConnectionError),
}

/// Sizing and lifetime knobs of the connection pool.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_size: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    pub min_idle: Option<u32>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_size: 16,
            connection_timeout: Duration::from_secs(15),
            idle_timeout: Some(Duration::from_secs(300)),
            max_lifetime: Some(Duration::from_secs(3600)),
            min_idle: Some(4),
        }
    }
}

pub async fn setup_db_pool(
    database_url: String,
    settings: &PoolSettings,
) -> Result<DbPool, DbSetupError> {
    let mut cfg = ManagerConfig::default();
    cfg.custom_setup = Box::new(|config: &str| establish_connection(config));
    let mgr = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(database_url, cfg);

    let pool = Pool::builder()
        .max_size(settings.max_size)
        .connection_timeout(settings.connection_timeout)
        .idle_timeout(settings.idle_timeout)
        .max_lifetime(settings.max_lifetime)
        .min_idle(settings.min_idle)
        .build(mgr)
        .await
        .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;

    // Health-check immediately (surface PG/libpq errors now, not later):
    {
        let mut conn = pool
            .get()
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?; // Obeys connection_timeout above
        diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
    }

    Ok(pool)
}

/// Environment variable pointing to a PEM bundle of trusted database CAs.
pub const DB_TLS_CA_FILE_ENV: &str = "INSC_DB_TLS_CA_FILE";

/// TLS settings for database connections.
///
/// Trusts the certificates of [`DB_TLS_CA_FILE_ENV`] when set, the platform trust
/// store otherwise. An unreadable bundle falls back to the platform verifier.
fn make_rustls_config_from_env() -> ClientConfig {
    let Some(path) = std::env::var_os(DB_TLS_CA_FILE_ENV) else {
        return ClientConfig::with_platform_verifier();
    };

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) => {
            warn!(path = ?path, error = %err, "Failed to open CA file, falling back to platform verifier");
            return ClientConfig::with_platform_verifier();
        }
    };

    let certs: Result<Vec<_>, std::io::Error> = load_pem_certs(&mut BufReader::new(file)).collect();
    let certs = match certs {
        Ok(certs) => certs,
        Err(err) => {
            warn!(path = ?path, error = %err, "Failed to parse PEM certs, falling back to platform verifier");
            return ClientConfig::with_platform_verifier();
        }
    };

    let mut roots = RootCertStore::empty();
    for cert in certs {
        if let Err(err) = roots.add(cert) {
            warn!(error = %err, "Failed to add certificate to root store");
        }
    }

    config_with_roots(roots)
}

/// Client config trusting only `roots`, on the protocol versions the provider
/// enables by default.
fn config_with_roots(roots: RootCertStore) -> ClientConfig {
    let provider = rustls::crypto::ring::default_provider();
    match ClientConfig::builder_with_provider(provider.into())
        .with_safe_default_protocol_versions()
    {
        Ok(builder) => builder.with_root_certificates(roots).with_no_client_auth(),
        Err(err) => {
            warn!(error = %err, "Unsupported TLS versions, falling back to platform verifier");
            ClientConfig::with_platform_verifier()
        }
    }
}

/// Open a TLS-capable connection to the database at `config`.
pub fn establish_connection(config: &str) -> BoxFuture<'_, ConnectionResult<AsyncPgConnection>> {
    let fut = async {
        let rustls_config = make_rustls_config_from_env();
        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(rustls_config);
        let (client, conn) = tokio_postgres::connect(config, tls)
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;

        AsyncPgConnection::try_from_client_and_connection(client, conn).await
    };
    fut.boxed()
}
