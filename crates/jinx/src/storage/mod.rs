//! Storage backends behind the slice repository traits.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use crate::accounts::repository::UserRepository;
use crate::feed::repository::{CurseRepository, CurseStyleRepository, PostRepository};
use crate::rituals::repository::{RankingRepository, RitualRepository};
use crate::tracker::repository::{
    ApplicationRepository, CompanyRepository, ReminderRepository, SelectionStageRepository,
};

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stored record is malformed: {0}")]
    Corrupt(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Self::Conflict,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Corrupt(value.to_string())
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Every repository the services need, as shared trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub curses: Arc<dyn CurseRepository>,
    pub curse_styles: Arc<dyn CurseStyleRepository>,
    pub companies: Arc<dyn CompanyRepository>,
    pub applications: Arc<dyn ApplicationRepository>,
    pub stages: Arc<dyn SelectionStageRepository>,
    pub reminders: Arc<dyn ReminderRepository>,
    pub rituals: Arc<dyn RitualRepository>,
    pub rankings: Arc<dyn RankingRepository>,
}

impl Repositories {
    /// Single in-memory store backing every trait, seeded with the basic curse styles.
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(memory::MemoryStore::seeded()))
    }

    pub fn from_store(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            posts: store.clone(),
            curses: store.clone(),
            curse_styles: store.clone(),
            companies: store.clone(),
            applications: store.clone(),
            stages: store.clone(),
            reminders: store.clone(),
            rituals: store.clone(),
            rankings: store,
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        use postgres::*;

        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            curses: Arc::new(PgCurseRepository::new(pool.clone())),
            curse_styles: Arc::new(PgCurseStyleRepository::new(pool.clone())),
            companies: Arc::new(PgCompanyRepository::new(pool.clone())),
            applications: Arc::new(PgApplicationRepository::new(pool.clone())),
            stages: Arc::new(PgSelectionStageRepository::new(pool.clone())),
            reminders: Arc::new(PgReminderRepository::new(pool.clone())),
            rituals: Arc::new(PgRitualRepository::new(pool.clone())),
            rankings: Arc::new(PgRankingRepository::new(pool)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_rows_map_to_not_found() {
        assert!(matches!(
            RepositoryError::from(sqlx::Error::RowNotFound),
            RepositoryError::NotFound
        ));
    }

    #[test]
    fn pool_failures_map_to_unavailable() {
        let err = RepositoryError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepositoryError::Unavailable(_)));
    }
}
