use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::DomainError;

pub const RITUAL_MAX_HP: i64 = 300_000;
const RITUAL_START_HOUR: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RitualStatus {
    Pending,
    Active,
    Success,
    Failed,
}

impl RitualStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RitualStatus::Pending => "pending",
            RitualStatus::Active => "active",
            RitualStatus::Success => "success",
            RitualStatus::Failed => "failed",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, RitualStatus::Success | RitualStatus::Failed)
    }
}

impl FromStr for RitualStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(RitualStatus::Pending),
            "active" => Ok(RitualStatus::Active),
            "success" => Ok(RitualStatus::Success),
            "failed" => Ok(RitualStatus::Failed),
            _ => Err(DomainError::unknown("ritual status", value)),
        }
    }
}

impl fmt::Display for RitualStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What earned a participant their damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionKind {
    Post,
    Curse,
}

/// Nightly community event: everyone chips away at one shared HP pool between 02:00
/// and 03:00.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ritual {
    pub id: Uuid,
    pub max_hp: i64,
    pub current_hp: i64,
    pub status: RitualStatus,
    pub participant_count: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Ritual {
    /// Pending ritual for `date`, starting at 02:00 local to `offset`.
    pub fn new(date: NaiveDate, offset: FixedOffset) -> Self {
        let local_start = date.and_time(
            NaiveTime::from_hms_opt(RITUAL_START_HOUR, 0, 0).unwrap_or(NaiveTime::MIN),
        );
        // Fixed offsets have no gaps or folds, so the mapping is always single.
        let start_time = offset
            .from_local_datetime(&local_start)
            .single()
            .map(|start| start.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&local_start));
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            max_hp: RITUAL_MAX_HP,
            current_hp: RITUAL_MAX_HP,
            status: RitualStatus::Pending,
            participant_count: 0,
            start_time,
            end_time: start_time + Duration::hours(1),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn start(&mut self) -> Result<(), DomainError> {
        if self.status != RitualStatus::Pending {
            return Err(DomainError::RitualAlreadyEnded);
        }
        self.status = RitualStatus::Active;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Critical hits count double. HP never drops below zero; the returned value is the
    /// damage credited to the attacker, even past zero.
    pub fn take_damage(&mut self, damage: i64, critical: bool) -> i64 {
        let damage = damage.max(0);
        let applied = if critical {
            damage.saturating_mul(2)
        } else {
            damage
        };
        self.current_hp = self.current_hp.saturating_sub(applied).max(0);
        self.updated_at = Utc::now();
        applied
    }

    pub fn increment_participant(&mut self) {
        self.participant_count += 1;
        self.updated_at = Utc::now();
    }

    /// Success when the pool is emptied, failure otherwise.
    pub fn complete(&mut self) -> Result<RitualStatus, DomainError> {
        if self.status != RitualStatus::Active {
            return Err(DomainError::RitualNotActive);
        }
        let now = Utc::now();
        self.status = if self.current_hp <= 0 {
            RitualStatus::Success
        } else {
            RitualStatus::Failed
        };
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(self.status)
    }

    /// Active and strictly inside the window.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == RitualStatus::Active && self.start_time < now && now < self.end_time
    }
}

/// Points awarded for a final ritual rank.
pub fn reward_for_rank(rank: i32) -> i32 {
    match rank {
        1 => 500,
        2 => 300,
        3 => 100,
        _ => 50,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RitualParticipant {
    pub id: Uuid,
    pub ritual_id: Uuid,
    pub user_id: Uuid,
    pub total_damage: i64,
    pub post_count: i32,
    pub curse_count: i32,
    pub rank: Option<i32>,
    pub points_earned: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RitualParticipant {
    pub fn new(ritual_id: Uuid, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ritual_id,
            user_id,
            total_damage: 0,
            post_count: 0,
            curse_count: 0,
            rank: None,
            points_earned: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_damage(&mut self, damage: i64, kind: ContributionKind) {
        self.total_damage = self.total_damage.saturating_add(damage.max(0));
        match kind {
            ContributionKind::Post => self.post_count += 1,
            ContributionKind::Curse => self.curse_count += 1,
        }
        self.updated_at = Utc::now();
    }

    pub fn set_rank_and_points(&mut self, rank: i32) {
        self.rank = Some(rank);
        self.points_earned = reward_for_rank(rank);
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingPeriod {
    Weekly,
    Monthly,
    AllTime,
}

impl RankingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingPeriod::Weekly => "weekly",
            RankingPeriod::Monthly => "monthly",
            RankingPeriod::AllTime => "all_time",
        }
    }
}

impl FromStr for RankingPeriod {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(RankingPeriod::Weekly),
            "monthly" => Ok(RankingPeriod::Monthly),
            "all_time" => Ok(RankingPeriod::AllTime),
            _ => Err(DomainError::unknown("ranking period", value)),
        }
    }
}

impl fmt::Display for RankingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's standing within one ranking period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub period: RankingPeriod,
    pub rank: i32,
    pub curse_count: i32,
    pub post_count: i32,
    pub period_start: DateTime<Utc>,
    pub period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ranking {
    pub fn new(
        user_id: Uuid,
        period: RankingPeriod,
        rank: i32,
        curse_count: i32,
        post_count: i32,
        period_start: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            period,
            rank,
            curse_count,
            post_count,
            period_start,
            period_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_rank(&mut self, rank: i32, curse_count: i32) {
        self.rank = rank;
        self.curse_count = curse_count;
        self.updated_at = Utc::now();
    }

    pub fn close(&mut self, period_end: DateTime<Utc>) {
        self.period_end = Some(period_end);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Offset;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 31).expect("valid date")
    }

    fn active_ritual() -> Ritual {
        let mut ritual = Ritual::new(date(), Utc.fix());
        ritual.start().expect("pending ritual starts");
        ritual
    }

    #[test]
    fn window_opens_at_two_in_the_configured_offset() {
        let ritual = Ritual::new(date(), Utc.fix());
        assert_eq!(ritual.start_time.to_rfc3339(), "2025-01-31T02:00:00+00:00");
        assert_eq!(ritual.end_time.to_rfc3339(), "2025-01-31T03:00:00+00:00");

        let tokyo = FixedOffset::east_opt(9 * 3600).expect("valid offset");
        let ritual = Ritual::new(date(), tokyo);
        assert_eq!(ritual.start_time.to_rfc3339(), "2025-01-30T17:00:00+00:00");
        assert_eq!(ritual.current_hp, RITUAL_MAX_HP);
        assert_eq!(ritual.status, RitualStatus::Pending);
    }

    #[test]
    fn only_pending_rituals_start() {
        let mut ritual = active_ritual();
        assert_eq!(ritual.start(), Err(DomainError::RitualAlreadyEnded));
    }

    #[test]
    fn critical_hits_double_and_hp_floors_at_zero() {
        let mut ritual = active_ritual();
        assert_eq!(ritual.take_damage(1_000, false), 1_000);
        assert_eq!(ritual.take_damage(1_000, true), 2_000);
        assert_eq!(ritual.current_hp, RITUAL_MAX_HP - 3_000);

        assert_eq!(ritual.take_damage(RITUAL_MAX_HP, true), RITUAL_MAX_HP * 2);
        assert_eq!(ritual.current_hp, 0);
    }

    #[test]
    fn completion_outcome_follows_remaining_hp() {
        let mut pending = Ritual::new(date(), Utc.fix());
        assert_eq!(pending.complete(), Err(DomainError::RitualNotActive));

        let mut survived = active_ritual();
        survived.take_damage(10, false);
        assert_eq!(survived.complete(), Ok(RitualStatus::Failed));
        assert!(survived.completed_at.is_some());

        let mut slain = active_ritual();
        slain.take_damage(RITUAL_MAX_HP, false);
        assert_eq!(slain.complete(), Ok(RitualStatus::Success));
        assert_eq!(slain.complete(), Err(DomainError::RitualNotActive));
    }

    #[test]
    fn active_only_strictly_inside_window() {
        let ritual = active_ritual();
        assert!(!ritual.is_active(ritual.start_time));
        assert!(ritual.is_active(ritual.start_time + Duration::minutes(30)));
        assert!(!ritual.is_active(ritual.end_time));

        let pending = Ritual::new(date(), Utc.fix());
        assert!(!pending.is_active(pending.start_time + Duration::minutes(30)));
    }

    #[test]
    fn participants_tally_contributions_and_rewards() {
        let mut participant = RitualParticipant::new(Uuid::new_v4(), Uuid::new_v4());
        participant.add_damage(120, ContributionKind::Post);
        participant.add_damage(30, ContributionKind::Curse);
        participant.add_damage(30, ContributionKind::Curse);
        assert_eq!(participant.total_damage, 180);
        assert_eq!(participant.post_count, 1);
        assert_eq!(participant.curse_count, 2);

        for (rank, points) in [(1, 500), (2, 300), (3, 100), (4, 50), (40, 50)] {
            participant.set_rank_and_points(rank);
            assert_eq!(participant.rank, Some(rank));
            assert_eq!(participant.points_earned, points);
        }
    }

    #[test]
    fn ranking_updates_and_closes() {
        let start = Utc::now();
        let mut ranking = Ranking::new(Uuid::new_v4(), RankingPeriod::Weekly, 3, 10, 2, start);
        ranking.update_rank(1, 25);
        assert_eq!((ranking.rank, ranking.curse_count, ranking.post_count), (1, 25, 2));
        assert!(ranking.period_end.is_none());

        let end = start + Duration::days(7);
        ranking.close(end);
        assert_eq!(ranking.period_end, Some(end));
        assert_eq!("ALL_TIME".parse::<RankingPeriod>(), Ok(RankingPeriod::AllTime));
        assert!("daily".parse::<RankingPeriod>().is_err());
    }
}
