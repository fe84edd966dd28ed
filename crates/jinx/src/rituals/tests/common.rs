use std::sync::Arc;

use chrono::{NaiveDate, Offset, Utc};
use uuid::Uuid;

use crate::accounts::domain::{Email, Gender, PasswordHash, User, Username};
use crate::config::RitualConfig;
use crate::rituals::domain::Ritual;
use crate::rituals::service::{RankingService, RitualService};
use crate::storage::memory::MemoryStore;
use crate::storage::Repositories;

pub(super) struct Harness {
    pub(super) repos: Repositories,
    pub(super) rituals: RitualService,
    pub(super) rankings: RankingService,
}

pub(super) fn harness() -> Harness {
    let repos = Repositories::from_store(Arc::new(MemoryStore::seeded()));
    Harness {
        rituals: RitualService::new(
            repos.rituals.clone(),
            repos.users.clone(),
            RitualConfig {
                utc_offset: Utc.fix(),
            },
        ),
        rankings: RankingService::new(repos.rankings.clone()),
        repos,
    }
}

pub(super) fn night() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date")
}

impl Harness {
    pub(super) async fn user(&self, name: &str) -> User {
        let user = User::new(
            Email::parse(&format!("{name}@example.com")).expect("email"),
            PasswordHash::from_phc("unused"),
            Username::parse(name).expect("username"),
            30,
            Gender::Unknown,
            Uuid::new_v4(),
        );
        self.repos.users.create(&user).await.expect("user stored");
        user
    }

    pub(super) async fn points(&self, user_id: Uuid) -> i32 {
        self.repos
            .users
            .find_by_id(user_id)
            .await
            .expect("lookup")
            .expect("user exists")
            .points
    }

    /// Scheduled and started ritual for [`night`].
    pub(super) async fn running_ritual(&self) -> Ritual {
        let ritual = self.rituals.schedule(night()).await.expect("scheduled");
        self.rituals.start(ritual.id).await.expect("started")
    }
}
