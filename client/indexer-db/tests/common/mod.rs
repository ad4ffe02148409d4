#![allow(dead_code)]

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::Connection;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use insc_indexer_db::{
    models::{NewBalance, NewInscription, NewInscriptionStats},
    types::{Sid, TransferType},
};
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Start a migrated Postgres container and open an async connection to it.
///
/// The container is stopped when the returned handle is dropped.
pub async fn setup_test_db() -> (ContainerAsync<Postgres>, AsyncPgConnection) {
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

    let conn = AsyncPgConnection::establish(&database_url)
        .await
        .expect("Failed to connect to the test database");

    (container, conn)
}

pub fn amount(v: &str) -> BigDecimal {
    BigDecimal::from_str(v).expect("valid decimal")
}

pub fn timestamp(secs: i64) -> NaiveDateTime {
    chrono::DateTime::from_timestamp(secs, 0)
        .expect("valid timestamp")
        .naive_utc()
}

pub fn new_balance(chain: &str, sid: u32, address: &str, total: &str) -> NewBalance {
    NewBalance {
        sid: Sid::new(sid),
        chain: chain.to_string(),
        protocol: "brc-20".to_string(),
        tick: "ordi".to_string(),
        address: address.to_string(),
        balance: amount(total),
        available: amount(total),
    }
}

pub fn new_inscription(chain: &str, sid: u32, tick: &str) -> NewInscription {
    NewInscription {
        sid: Sid::new(sid),
        chain: chain.to_string(),
        protocol: "ierc-20".to_string(),
        tick: tick.to_string(),
        name: tick.to_string(),
        limit_per_mint: amount("1000"),
        deploy_by: "0xdeployer".to_string(),
        total_supply: amount("21000000"),
        decimals: 18,
        deploy_hash: format!("0xdeploy{}", sid),
        deploy_time: timestamp(1_700_000_000 + i64::from(sid)),
        transfer_type: TransferType::Hash,
    }
}

pub fn new_stats(chain: &str, sid: u32, ins_id: i64, tick: &str) -> NewInscriptionStats {
    NewInscriptionStats {
        sid: Sid::new(sid),
        ins_id,
        chain: chain.to_string(),
        protocol: "ierc-20".to_string(),
        tick: tick.to_string(),
        minted: amount("0"),
        mint_completed_time: None,
        mint_first_block: 0,
        mint_last_block: 0,
        holders: 0,
        tx_cnt: 0,
    }
}
