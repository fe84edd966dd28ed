use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::domain::{Ranking, RankingPeriod, Ritual, RitualParticipant};
use crate::storage::RepositoryError;

/// Rituals and their participants. At most one ritual per start time.
#[async_trait]
pub trait RitualRepository: Send + Sync {
    async fn create(&self, ritual: &Ritual) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ritual>, RepositoryError>;
    async fn update(&self, ritual: &Ritual) -> Result<(), RepositoryError>;
    /// The active ritual whose window strictly contains `now`.
    async fn find_active(&self, now: DateTime<Utc>) -> Result<Option<Ritual>, RepositoryError>;

    async fn find_participant(
        &self,
        ritual_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<RitualParticipant>, RepositoryError>;
    /// Inserts or replaces the row for (ritual, user).
    async fn save_participant(&self, participant: &RitualParticipant)
        -> Result<(), RepositoryError>;
    /// Highest total damage first.
    async fn participants(&self, ritual_id: Uuid)
        -> Result<Vec<RitualParticipant>, RepositoryError>;
}

#[async_trait]
pub trait RankingRepository: Send + Sync {
    /// Inserts or replaces the row for (user, period, period_start).
    async fn upsert(&self, ranking: &Ranking) -> Result<(), RepositoryError>;
    /// Rows of one period window, best rank first.
    async fn list_period(
        &self,
        period: RankingPeriod,
        period_start: DateTime<Utc>,
    ) -> Result<Vec<Ranking>, RepositoryError>;
    /// Rows of the most recent window of `period`, best rank first.
    async fn latest(&self, period: RankingPeriod, limit: i64)
        -> Result<Vec<Ranking>, RepositoryError>;
}
