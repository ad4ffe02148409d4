use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

use crate::config::DatabaseConfig;

// Embed the migrations from the indexer-db crate
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("../indexer-db/migrations");

/// Setup a migrated indexer database (thru a container).
///
/// Returns the container, which must be kept alive for the duration of the
/// test, and a [`DatabaseConfig`] pointing at it with statement logging on.
pub async fn setup_test_db() -> (ContainerAsync<Postgres>, DatabaseConfig) {
    let container = Postgres::default()
        .with_db_name("indexer")
        .with_user("postgres")
        .with_password("postgres")
        .with_tag("15")
        .start()
        .await
        .expect("Failed to start postgres container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");
    let database_url = format!("postgres://postgres:postgres@{}:{}/indexer", host, port);

    let mut conn =
        diesel::PgConnection::establish(&database_url).expect("Failed to connect for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");

    let config = DatabaseConfig {
        url: database_url,
        enable_log: true,
        ..Default::default()
    };

    (container, config)
}

pub fn timestamp(secs: i64) -> NaiveDateTime {
    chrono::DateTime::from_timestamp(secs, 0)
        .expect("valid timestamp")
        .naive_utc()
}
