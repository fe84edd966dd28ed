//! Nightly rituals, their participants, and periodic rankings.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    reward_for_rank, ContributionKind, Ranking, RankingPeriod, Ritual, RitualParticipant,
    RitualStatus, RITUAL_MAX_HP,
};
pub use repository::{RankingRepository, RitualRepository};
pub use service::{
    Contribution, Leaderboard, RankingEntry, RankingService, RitualError, RitualService,
    RitualView,
};
