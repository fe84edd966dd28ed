//! Postgres implementations of the repository traits. Queries are checked at runtime;
//! rows are decoded into `*Row` structs and validated into entities with `TryFrom`.

mod accounts;
mod feed;
mod rituals;
mod tracker;

use std::fmt;

use sqlx::postgres::{PgPoolOptions, PgQueryResult};

use super::RepositoryError;
use crate::config::DatabaseConfig;

pub use accounts::PgUserRepository;
pub use sqlx::postgres::PgPool;
pub use feed::{PgCurseRepository, PgCurseStyleRepository, PgPostRepository};
pub use rituals::{PgRankingRepository, PgRitualRepository};
pub use tracker::{
    PgApplicationRepository, PgCompanyRepository, PgReminderRepository,
    PgSelectionStageRepository,
};

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .connect(&config.url)
        .await
}

pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn corrupt(column: &str, error: impl fmt::Display) -> RepositoryError {
    RepositoryError::Corrupt(format!("{column}: {error}"))
}

fn expect_one(result: PgQueryResult) -> Result<(), RepositoryError> {
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Escapes LIKE wildcards so user input matches literally.
fn like_literal(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
