//! Configuration constants for the inscription indexer storage layer

/// Database configuration
pub mod database {
    /// Default PostgreSQL database URL
    pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/indexer";

    /// Default maximum database connections
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 32;

    /// Default database connection timeout in seconds
    pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 15;

    /// Default idle timeout of pooled connections in seconds
    pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

    /// Default maximum lifetime of pooled connections in seconds
    pub const DEFAULT_MAX_LIFETIME_SECS: u64 = 3600;

    /// Default minimum number of idle connections
    pub const DEFAULT_MIN_IDLE: u32 = 4;

    /// Page size used when a read does not ask for one
    pub const DEFAULT_PAGE_LIMIT: i64 = 20;

    /// Largest page a read may ask for
    pub const MAX_PAGE_LIMIT: i64 = 100;

    /// Rows per `INSERT` statement of the batch writers
    pub const INSERT_CHUNK_ROWS: usize = 1000;
}

/// Logging configuration
pub mod log {
    /// Application name reported in JSON logs
    pub const APP_NAME: &str = "insc-indexer";

    /// Target of the compiled batch statements logged when `enable_log` is set
    pub const SQL_TARGET: &str = "insc_storage::sql";
}
