use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{corrupt, expect_one};
use crate::rituals::domain::{Ranking, RankingPeriod, Ritual, RitualParticipant};
use crate::rituals::repository::{RankingRepository, RitualRepository};
use crate::storage::RepositoryError;

const RITUAL_COLUMNS: &str = "id, max_hp, current_hp, status, participant_count, start_time, \
     end_time, created_at, updated_at, completed_at";

#[derive(Debug, FromRow)]
struct RitualRow {
    id: Uuid,
    max_hp: i64,
    current_hp: i64,
    status: String,
    participant_count: i32,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RitualRow> for Ritual {
    type Error = RepositoryError;

    fn try_from(row: RitualRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            max_hp: row.max_hp,
            current_hp: row.current_hp,
            status: row
                .status
                .parse()
                .map_err(|err| corrupt("rituals.status", err))?,
            participant_count: row.participant_count,
            start_time: row.start_time,
            end_time: row.end_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

const PARTICIPANT_COLUMNS: &str = "id, ritual_id, user_id, total_damage, post_count, \
     curse_count, rank, points_earned, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ParticipantRow {
    id: Uuid,
    ritual_id: Uuid,
    user_id: Uuid,
    total_damage: i64,
    post_count: i32,
    curse_count: i32,
    rank: Option<i32>,
    points_earned: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ParticipantRow> for RitualParticipant {
    fn from(row: ParticipantRow) -> Self {
        Self {
            id: row.id,
            ritual_id: row.ritual_id,
            user_id: row.user_id,
            total_damage: row.total_damage,
            post_count: row.post_count,
            curse_count: row.curse_count,
            rank: row.rank,
            points_earned: row.points_earned,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PgRitualRepository {
    pool: PgPool,
}

impl PgRitualRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RitualRepository for PgRitualRepository {
    async fn create(&self, ritual: &Ritual) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO rituals ({RITUAL_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(ritual.id)
        .bind(ritual.max_hp)
        .bind(ritual.current_hp)
        .bind(ritual.status.as_str())
        .bind(ritual.participant_count)
        .bind(ritual.start_time)
        .bind(ritual.end_time)
        .bind(ritual.created_at)
        .bind(ritual.updated_at)
        .bind(ritual.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ritual>, RepositoryError> {
        let row: Option<RitualRow> =
            sqlx::query_as(&format!("SELECT {RITUAL_COLUMNS} FROM rituals WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Ritual::try_from).transpose()
    }

    async fn update(&self, ritual: &Ritual) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE rituals SET current_hp = $2, status = $3, participant_count = $4, \
             updated_at = $5, completed_at = $6 WHERE id = $1",
        )
        .bind(ritual.id)
        .bind(ritual.current_hp)
        .bind(ritual.status.as_str())
        .bind(ritual.participant_count)
        .bind(ritual.updated_at)
        .bind(ritual.completed_at)
        .execute(&self.pool)
        .await?;
        expect_one(result)
    }

    async fn find_active(&self, now: DateTime<Utc>) -> Result<Option<Ritual>, RepositoryError> {
        let row: Option<RitualRow> = sqlx::query_as(&format!(
            "SELECT {RITUAL_COLUMNS} FROM rituals \
             WHERE status = 'active' AND start_time < $1 AND end_time > $1 \
             ORDER BY start_time DESC LIMIT 1"
        ))
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Ritual::try_from).transpose()
    }

    async fn find_participant(
        &self,
        ritual_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<RitualParticipant>, RepositoryError> {
        let row: Option<ParticipantRow> = sqlx::query_as(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM ritual_participants \
             WHERE ritual_id = $1 AND user_id = $2"
        ))
        .bind(ritual_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RitualParticipant::from))
    }

    async fn save_participant(
        &self,
        participant: &RitualParticipant,
    ) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO ritual_participants ({PARTICIPANT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (ritual_id, user_id) DO UPDATE SET \
             total_damage = EXCLUDED.total_damage, post_count = EXCLUDED.post_count, \
             curse_count = EXCLUDED.curse_count, rank = EXCLUDED.rank, \
             points_earned = EXCLUDED.points_earned, updated_at = EXCLUDED.updated_at"
        ))
        .bind(participant.id)
        .bind(participant.ritual_id)
        .bind(participant.user_id)
        .bind(participant.total_damage)
        .bind(participant.post_count)
        .bind(participant.curse_count)
        .bind(participant.rank)
        .bind(participant.points_earned)
        .bind(participant.created_at)
        .bind(participant.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn participants(
        &self,
        ritual_id: Uuid,
    ) -> Result<Vec<RitualParticipant>, RepositoryError> {
        let rows: Vec<ParticipantRow> = sqlx::query_as(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM ritual_participants WHERE ritual_id = $1 \
             ORDER BY total_damage DESC"
        ))
        .bind(ritual_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RitualParticipant::from).collect())
    }
}

const RANKING_COLUMNS: &str = "id, user_id, period, rank, curse_count, post_count, \
     period_start, period_end, created_at, updated_at";

#[derive(Debug, FromRow)]
struct RankingRow {
    id: Uuid,
    user_id: Uuid,
    period: String,
    rank: i32,
    curse_count: i32,
    post_count: i32,
    period_start: DateTime<Utc>,
    period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RankingRow> for Ranking {
    type Error = RepositoryError;

    fn try_from(row: RankingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            period: row
                .period
                .parse()
                .map_err(|err| corrupt("rankings.period", err))?,
            rank: row.rank,
            curse_count: row.curse_count,
            post_count: row.post_count,
            period_start: row.period_start,
            period_end: row.period_end,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgRankingRepository {
    pool: PgPool,
}

impl PgRankingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RankingRepository for PgRankingRepository {
    async fn upsert(&self, ranking: &Ranking) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO rankings ({RANKING_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (user_id, period, period_start) DO UPDATE SET \
             rank = EXCLUDED.rank, curse_count = EXCLUDED.curse_count, \
             post_count = EXCLUDED.post_count, period_end = EXCLUDED.period_end, \
             updated_at = EXCLUDED.updated_at"
        ))
        .bind(ranking.id)
        .bind(ranking.user_id)
        .bind(ranking.period.as_str())
        .bind(ranking.rank)
        .bind(ranking.curse_count)
        .bind(ranking.post_count)
        .bind(ranking.period_start)
        .bind(ranking.period_end)
        .bind(ranking.created_at)
        .bind(ranking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_period(
        &self,
        period: RankingPeriod,
        period_start: DateTime<Utc>,
    ) -> Result<Vec<Ranking>, RepositoryError> {
        let rows: Vec<RankingRow> = sqlx::query_as(&format!(
            "SELECT {RANKING_COLUMNS} FROM rankings WHERE period = $1 AND period_start = $2 \
             ORDER BY rank"
        ))
        .bind(period.as_str())
        .bind(period_start)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Ranking::try_from).collect()
    }

    async fn latest(
        &self,
        period: RankingPeriod,
        limit: i64,
    ) -> Result<Vec<Ranking>, RepositoryError> {
        let rows: Vec<RankingRow> = sqlx::query_as(&format!(
            "SELECT {RANKING_COLUMNS} FROM rankings WHERE period = $1 \
             AND period_start = (SELECT MAX(period_start) FROM rankings WHERE period = $1) \
             ORDER BY rank LIMIT $2"
        ))
        .bind(period.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Ranking::try_from).collect()
    }
}
