use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{
    ContributionKind, Ranking, RankingPeriod, Ritual, RitualParticipant, RitualStatus,
};
use super::repository::{RankingRepository, RitualRepository};
use crate::accounts::repository::UserRepository;
use crate::config::RitualConfig;
use crate::domain::{DomainError, Page};
use crate::storage::RepositoryError;

#[derive(Debug, Clone, Serialize)]
pub struct RitualView {
    pub id: Uuid,
    pub max_hp: i64,
    pub current_hp: i64,
    pub status: RitualStatus,
    pub participant_count: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Ritual> for RitualView {
    fn from(ritual: &Ritual) -> Self {
        Self {
            id: ritual.id,
            max_hp: ritual.max_hp,
            current_hp: ritual.current_hp,
            status: ritual.status,
            participant_count: ritual.participant_count,
            start_time: ritual.start_time,
            end_time: ritual.end_time,
            completed_at: ritual.completed_at,
        }
    }
}

/// Result of one hit against the ritual pool.
#[derive(Debug, Clone)]
pub struct Contribution {
    pub ritual: Ritual,
    pub participant: RitualParticipant,
    pub applied_damage: i64,
}

/// Schedules rituals, records damage and pays out rewards. Rank order comes from the
/// caller.
pub struct RitualService {
    rituals: Arc<dyn RitualRepository>,
    users: Arc<dyn UserRepository>,
    config: RitualConfig,
}

impl RitualService {
    pub fn new(
        rituals: Arc<dyn RitualRepository>,
        users: Arc<dyn UserRepository>,
        config: RitualConfig,
    ) -> Self {
        Self {
            rituals,
            users,
            config,
        }
    }

    pub async fn schedule(&self, date: NaiveDate) -> Result<Ritual, RitualError> {
        let ritual = Ritual::new(date, self.config.utc_offset);
        match self.rituals.create(&ritual).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => return Err(RitualError::AlreadyScheduled(date)),
            Err(err) => return Err(err.into()),
        }
        tracing::info!(ritual_id = %ritual.id, start_time = %ritual.start_time, "ritual scheduled");
        Ok(ritual)
    }

    pub async fn start(&self, ritual_id: Uuid) -> Result<Ritual, RitualError> {
        let mut ritual = self.load(ritual_id).await?;
        ritual.start()?;
        self.rituals.update(&ritual).await?;
        tracing::info!(%ritual_id, "ritual started");
        Ok(ritual)
    }

    /// Applies damage and credits it to the user, enrolling them on their first hit.
    pub async fn record_contribution(
        &self,
        ritual_id: Uuid,
        user_id: Uuid,
        damage: i64,
        critical: bool,
        kind: ContributionKind,
    ) -> Result<Contribution, RitualError> {
        let mut ritual = self.load(ritual_id).await?;
        if ritual.status != RitualStatus::Active {
            return Err(DomainError::RitualNotActive.into());
        }
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(RitualError::UserNotFound);
        }

        let mut participant = match self.rituals.find_participant(ritual_id, user_id).await? {
            Some(participant) => participant,
            None => {
                ritual.increment_participant();
                RitualParticipant::new(ritual_id, user_id)
            }
        };

        let applied_damage = ritual.take_damage(damage, critical);
        participant.add_damage(applied_damage, kind);

        self.rituals.save_participant(&participant).await?;
        self.rituals.update(&ritual).await?;
        tracing::debug!(
            %ritual_id,
            %user_id,
            applied_damage,
            remaining_hp = ritual.current_hp,
            "ritual damage recorded"
        );

        Ok(Contribution {
            ritual,
            participant,
            applied_damage,
        })
    }

    pub async fn complete(&self, ritual_id: Uuid) -> Result<Ritual, RitualError> {
        let mut ritual = self.load(ritual_id).await?;
        let outcome = ritual.complete()?;
        self.rituals.update(&ritual).await?;
        tracing::info!(%ritual_id, outcome = %outcome, participants = ritual.participant_count, "ritual completed");
        Ok(ritual)
    }

    /// Ranks participants by their position in `standings` (first is rank 1) and credits
    /// the rewards to their point balances. A ritual settles once.
    pub async fn settle(
        &self,
        ritual_id: Uuid,
        standings: &[Uuid],
    ) -> Result<Vec<RitualParticipant>, RitualError> {
        let ritual = self.load(ritual_id).await?;
        if !ritual.status.is_finished() {
            return Err(RitualError::NotCompleted);
        }

        let participants = self.rituals.participants(ritual_id).await?;
        if participants.iter().any(|p| p.rank.is_some()) {
            return Err(RitualError::AlreadySettled);
        }
        let enrolled: HashSet<Uuid> = participants.iter().map(|p| p.user_id).collect();
        let named: HashSet<Uuid> = standings.iter().copied().collect();
        if named.len() != standings.len() || named != enrolled {
            return Err(RitualError::IncompleteStandings);
        }

        let mut settled = Vec::with_capacity(participants.len());
        for (position, user_id) in standings.iter().enumerate() {
            let Some(mut participant) = participants
                .iter()
                .find(|p| p.user_id == *user_id)
                .cloned()
            else {
                return Err(RitualError::IncompleteStandings);
            };
            let rank = i32::try_from(position + 1).unwrap_or(i32::MAX);
            participant.set_rank_and_points(rank);
            self.rituals.save_participant(&participant).await?;

            match self.users.find_by_id(*user_id).await? {
                Some(mut user) => {
                    user.add_points(participant.points_earned);
                    self.users.update(&user).await?;
                }
                None => {
                    tracing::warn!(%ritual_id, %user_id, "skipping reward for missing user");
                }
            }
            settled.push(participant);
        }

        tracing::info!(%ritual_id, participants = settled.len(), "ritual settled");
        Ok(settled)
    }

    pub async fn active(&self, now: DateTime<Utc>) -> Result<Option<Ritual>, RitualError> {
        Ok(self.rituals.find_active(now).await?)
    }

    async fn load(&self, ritual_id: Uuid) -> Result<Ritual, RitualError> {
        self.rituals
            .find_by_id(ritual_id)
            .await?
            .ok_or(RitualError::RitualNotFound)
    }
}

/// One caller-ranked row handed to [`RankingService::publish`].
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RankingEntry {
    pub user_id: Uuid,
    pub curse_count: i32,
    pub post_count: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingView {
    pub user_id: Uuid,
    pub rank: i32,
    pub curse_count: i32,
    pub post_count: i32,
    pub period_start: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<DateTime<Utc>>,
}

impl From<&Ranking> for RankingView {
    fn from(ranking: &Ranking) -> Self {
        Self {
            user_id: ranking.user_id,
            rank: ranking.rank,
            curse_count: ranking.curse_count,
            post_count: ranking.post_count,
            period_start: ranking.period_start,
            period_end: ranking.period_end,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub period: RankingPeriod,
    pub rankings: Vec<RankingView>,
}

pub struct RankingService {
    rankings: Arc<dyn RankingRepository>,
}

impl RankingService {
    pub fn new(rankings: Arc<dyn RankingRepository>) -> Self {
        Self { rankings }
    }

    /// Stores `entries` as the standings of one window; position in the slice is the rank.
    /// Users already ranked in the window keep their row and get the new rank.
    pub async fn publish(
        &self,
        period: RankingPeriod,
        period_start: DateTime<Utc>,
        entries: &[RankingEntry],
    ) -> Result<Vec<Ranking>, RitualError> {
        let existing = self.rankings.list_period(period, period_start).await?;

        let mut published = Vec::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            let rank = i32::try_from(position + 1).unwrap_or(i32::MAX);
            let ranking = match existing.iter().find(|row| row.user_id == entry.user_id) {
                Some(row) => {
                    let mut row = row.clone();
                    row.update_rank(rank, entry.curse_count);
                    row.post_count = entry.post_count;
                    row
                }
                None => Ranking::new(
                    entry.user_id,
                    period,
                    rank,
                    entry.curse_count,
                    entry.post_count,
                    period_start,
                ),
            };
            self.rankings.upsert(&ranking).await?;
            published.push(ranking);
        }

        tracing::info!(period = %period, %period_start, entries = published.len(), "rankings published");
        Ok(published)
    }

    /// Stamps the end of a window on every row in it.
    pub async fn close_period(
        &self,
        period: RankingPeriod,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<usize, RitualError> {
        let rows = self.rankings.list_period(period, period_start).await?;
        for mut row in rows.iter().cloned() {
            row.close(period_end);
            self.rankings.upsert(&row).await?;
        }
        Ok(rows.len())
    }

    pub async fn leaderboard(
        &self,
        period: RankingPeriod,
        limit: Option<i64>,
    ) -> Result<Leaderboard, RitualError> {
        let page = Page::new(None, limit);
        let rows = self.rankings.latest(period, page.limit).await?;
        Ok(Leaderboard {
            period,
            rankings: rows.iter().map(RankingView::from).collect(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RitualError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("ritual not found")]
    RitualNotFound,
    #[error("no active ritual")]
    NoActiveRitual,
    #[error("user not found")]
    UserNotFound,
    #[error("a ritual is already scheduled for {0}")]
    AlreadyScheduled(NaiveDate),
    #[error("ritual has not been completed")]
    NotCompleted,
    #[error("ritual has already been settled")]
    AlreadySettled,
    #[error("standings must list every participant exactly once")]
    IncompleteStandings,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
