//! Process-local store implementing every repository trait. Backs the test suites and
//! `serve --in-memory`; all tables sit behind one mutex.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::RepositoryError;
use crate::accounts::domain::{Email, User};
use crate::accounts::repository::{UserRepository, UserStats};
use crate::feed::domain::{Curse, CurseStyle, Post, PostType};
use crate::feed::repository::{
    CurseRepository, CurseStyleRepository, PostRepository, PostWithAuthor,
};
use crate::rituals::domain::{Ranking, RankingPeriod, Ritual, RitualParticipant};
use crate::rituals::repository::{RankingRepository, RitualRepository};
use crate::tracker::domain::{
    Application, ApplicationCategory, Company, Reminder, SelectionStage,
};
use crate::tracker::repository::{
    ApplicationRepository, CompanyListing, CompanyQuery, CompanyRepository, ReminderRepository,
    SelectionStageRepository,
};

/// The five free styles every deployment starts with.
pub fn basic_curse_styles() -> Vec<CurseStyle> {
    [
        ("炎獄の儀式", "Infernal Rite", "Curses wrapped in hellfire that smoulder long after they land."),
        ("氷結の呪縛", "Frozen Curse", "A cold binding that freezes its target in place."),
        ("闇夜の囁き", "Shadow Whisper", "Quiet malice murmured from the dark."),
        ("血盟の刻印", "Blood Covenant", "A mark sealed in blood that cannot be washed away."),
        ("骸骨の舞踏", "Danse Macabre", "The dead dance on and drag the living along."),
    ]
    .into_iter()
    .map(|(name, name_en, description)| CurseStyle::new(name, name_en, description, false, 0))
    .collect()
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    curses: HashMap<(Uuid, Uuid), Curse>,
    curse_styles: Vec<CurseStyle>,
    companies: HashMap<Uuid, Company>,
    applications: HashMap<Uuid, Application>,
    stages: HashMap<Uuid, SelectionStage>,
    reminders: HashMap<Uuid, Reminder>,
    rituals: HashMap<Uuid, Ritual>,
    participants: HashMap<(Uuid, Uuid), RitualParticipant>,
    rankings: HashMap<Uuid, Ranking>,
}

impl Tables {
    fn active_user(&self, id: Uuid) -> Option<&User> {
        self.users.get(&id).filter(|user| !user.is_deleted)
    }

    fn with_author(&self, post: &Post, viewer: Option<Uuid>) -> Option<PostWithAuthor> {
        let author = self.active_user(post.user_id)?;
        Some(PostWithAuthor {
            post: post.clone(),
            author_name: author.username.to_string(),
            author_curse_style_id: author.curse_style_id,
            cursed_by_viewer: viewer
                .is_some_and(|viewer| self.curses.contains_key(&(viewer, post.id))),
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        let store = Self::new();
        if let Ok(mut tables) = store.tables.lock() {
            tables.curse_styles = basic_curse_styles();
        }
        store
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn page<T>(rows: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    rows.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if tables.users.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.tables()?.active_user(id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .users
            .values()
            .find(|user| !user.is_deleted && &user.email == email)
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn stats(&self, id: Uuid) -> Result<UserStats, RepositoryError> {
        let tables = self.tables()?;
        let posts = tables
            .posts
            .values()
            .filter(|post| post.user_id == id && !post.is_deleted);
        let (count, curses) = posts.fold((0_i64, 0_i64), |(count, curses), post| {
            (count + 1, curses + i64::from(post.curse_count))
        });
        Ok(UserStats {
            posts: count,
            curses,
        })
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create(&self, post: &Post) -> Result<(), RepositoryError> {
        self.tables()?.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepositoryError> {
        Ok(self.tables()?.posts.get(&id).cloned())
    }

    async fn update(&self, post: &Post) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.posts.get_mut(&post.id) {
            Some(existing) => {
                *existing = post.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn timeline(
        &self,
        viewer: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostWithAuthor>, RepositoryError> {
        let tables = self.tables()?;
        let mut rows: Vec<PostWithAuthor> = tables
            .posts
            .values()
            .filter(|post| !post.is_deleted && post.post_type == PostType::Normal)
            .filter_map(|post| tables.with_author(post, Some(viewer)))
            .collect();
        rows.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));
        Ok(page(rows, limit, offset))
    }

    async fn by_author(
        &self,
        author: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostWithAuthor>, RepositoryError> {
        let tables = self.tables()?;
        let mut rows: Vec<PostWithAuthor> = tables
            .posts
            .values()
            .filter(|post| post.user_id == author && !post.is_deleted)
            .filter_map(|post| tables.with_author(post, None))
            .collect();
        rows.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));
        Ok(page(rows, limit, offset))
    }

    async fn increment_curse_count(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let post = tables.posts.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        post.increment_curse_count();
        Ok(())
    }

    async fn decrement_curse_count(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let post = tables.posts.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        post.decrement_curse_count();
        Ok(())
    }
}

#[async_trait]
impl CurseRepository for MemoryStore {
    async fn create(&self, curse: &Curse) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let key = (curse.user_id, curse.post_id);
        if tables.curses.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        tables.curses.insert(key, curse.clone());
        Ok(())
    }

    async fn find(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<Curse>, RepositoryError> {
        Ok(self.tables()?.curses.get(&(user_id, post_id)).cloned())
    }

    async fn delete(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RepositoryError> {
        self.tables()?
            .curses
            .remove(&(user_id, post_id))
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl CurseStyleRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<CurseStyle>, RepositoryError> {
        let mut styles = self.tables()?.curse_styles.clone();
        styles.sort_by_key(|style| style.is_special);
        Ok(styles)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CurseStyle>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables.curse_styles.iter().find(|style| style.id == id).cloned())
    }

    async fn find_by_name_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<CurseStyle>, RepositoryError> {
        let mut styles = self.tables()?.curse_styles.clone();
        styles.sort_by_key(|style| style.is_special);
        Ok(styles.into_iter().find(|style| style.matches_prefix(prefix)))
    }
}

#[async_trait]
impl CompanyRepository for MemoryStore {
    async fn create(&self, company: &Company) -> Result<(), RepositoryError> {
        self.tables()?.companies.insert(company.id, company.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, RepositoryError> {
        Ok(self.tables()?.companies.get(&id).cloned())
    }

    async fn list(&self, query: &CompanyQuery) -> Result<Vec<CompanyListing>, RepositoryError> {
        let tables = self.tables()?;
        let needle = query.search.as_ref().map(|search| search.to_lowercase());

        let mut listings: Vec<CompanyListing> = tables
            .companies
            .values()
            .filter(|company| {
                needle
                    .as_ref()
                    .map_or(true, |needle| company.name.to_lowercase().contains(needle))
            })
            .map(|company| {
                let application = tables
                    .applications
                    .values()
                    .filter(|app| app.company_id == company.id && app.user_id == query.user_id)
                    .filter(|app| query.category.map_or(true, |category| app.category == category))
                    .filter(|app| query.status.map_or(true, |status| app.status == status))
                    .max_by_key(|app| app.updated_at)
                    .cloned();
                CompanyListing {
                    company: company.clone(),
                    application,
                }
            })
            .filter(|listing| !query.only_mine || listing.application.is_some())
            .collect();

        listings.sort_by(|a, b| a.company.name.cmp(&b.company.name));
        Ok(page(listings, query.page.limit, query.page.offset))
    }
}

fn same_slot(a: &Application, b: &Application) -> bool {
    a.id != b.id
        && a.user_id == b.user_id
        && a.company_id == b.company_id
        && a.category == b.category
}

#[async_trait]
impl ApplicationRepository for MemoryStore {
    async fn create(&self, application: &Application) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if tables
            .applications
            .values()
            .any(|existing| same_slot(existing, application))
        {
            return Err(RepositoryError::Conflict);
        }
        tables
            .applications
            .insert(application.id, application.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>, RepositoryError> {
        Ok(self.tables()?.applications.get(&id).cloned())
    }

    async fn find_by_user_and_company(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        category: ApplicationCategory,
    ) -> Result<Option<Application>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .applications
            .values()
            .find(|app| {
                app.user_id == user_id && app.company_id == company_id && app.category == category
            })
            .cloned())
    }

    async fn update(&self, application: &Application) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if tables
            .applications
            .values()
            .any(|existing| same_slot(existing, application))
        {
            return Err(RepositoryError::Conflict);
        }
        match tables.applications.get_mut(&application.id) {
            Some(existing) => {
                *existing = application.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.tables()?;
        let mut applications: Vec<Application> = tables
            .applications
            .values()
            .filter(|app| app.user_id == user_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(applications)
    }
}

#[async_trait]
impl SelectionStageRepository for MemoryStore {
    async fn create(&self, stage: &SelectionStage) -> Result<(), RepositoryError> {
        self.tables()?.stages.insert(stage.id, stage.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SelectionStage>, RepositoryError> {
        Ok(self.tables()?.stages.get(&id).cloned())
    }

    async fn update(&self, stage: &SelectionStage) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.stages.get_mut(&stage.id) {
            Some(existing) => {
                *existing = stage.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn list_by_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<SelectionStage>, RepositoryError> {
        let tables = self.tables()?;
        let mut stages: Vec<SelectionStage> = tables
            .stages
            .values()
            .filter(|stage| stage.application_id == application_id)
            .cloned()
            .collect();
        stages.sort_by_key(|stage| {
            (stage.scheduled_at.is_none(), stage.scheduled_at, stage.created_at)
        });
        Ok(stages)
    }
}

#[async_trait]
impl ReminderRepository for MemoryStore {
    async fn create(&self, reminder: &Reminder) -> Result<(), RepositoryError> {
        self.tables()?.reminders.insert(reminder.id, reminder.clone());
        Ok(())
    }

    async fn list_by_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<Reminder>, RepositoryError> {
        let tables = self.tables()?;
        let mut reminders: Vec<Reminder> = tables
            .reminders
            .values()
            .filter(|reminder| reminder.application_id == application_id)
            .cloned()
            .collect();
        reminders.sort_by_key(|reminder| reminder.target_at);
        Ok(reminders)
    }
}

#[async_trait]
impl RitualRepository for MemoryStore {
    async fn create(&self, ritual: &Ritual) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        if tables
            .rituals
            .values()
            .any(|existing| existing.start_time == ritual.start_time)
        {
            return Err(RepositoryError::Conflict);
        }
        tables.rituals.insert(ritual.id, ritual.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ritual>, RepositoryError> {
        Ok(self.tables()?.rituals.get(&id).cloned())
    }

    async fn update(&self, ritual: &Ritual) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        match tables.rituals.get_mut(&ritual.id) {
            Some(existing) => {
                *existing = ritual.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn find_active(&self, now: DateTime<Utc>) -> Result<Option<Ritual>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .rituals
            .values()
            .filter(|ritual| ritual.is_active(now))
            .max_by_key(|ritual| ritual.start_time)
            .cloned())
    }

    async fn find_participant(
        &self,
        ritual_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<RitualParticipant>, RepositoryError> {
        Ok(self
            .tables()?
            .participants
            .get(&(ritual_id, user_id))
            .cloned())
    }

    async fn save_participant(
        &self,
        participant: &RitualParticipant,
    ) -> Result<(), RepositoryError> {
        self.tables()?.participants.insert(
            (participant.ritual_id, participant.user_id),
            participant.clone(),
        );
        Ok(())
    }

    async fn participants(
        &self,
        ritual_id: Uuid,
    ) -> Result<Vec<RitualParticipant>, RepositoryError> {
        let tables = self.tables()?;
        let mut participants: Vec<RitualParticipant> = tables
            .participants
            .values()
            .filter(|participant| participant.ritual_id == ritual_id)
            .cloned()
            .collect();
        participants.sort_by(|a, b| b.total_damage.cmp(&a.total_damage));
        Ok(participants)
    }
}

#[async_trait]
impl RankingRepository for MemoryStore {
    async fn upsert(&self, ranking: &Ranking) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        tables.rankings.retain(|_, row| {
            !(row.user_id == ranking.user_id
                && row.period == ranking.period
                && row.period_start == ranking.period_start)
        });
        tables.rankings.insert(ranking.id, ranking.clone());
        Ok(())
    }

    async fn list_period(
        &self,
        period: RankingPeriod,
        period_start: DateTime<Utc>,
    ) -> Result<Vec<Ranking>, RepositoryError> {
        let tables = self.tables()?;
        let mut rows: Vec<Ranking> = tables
            .rankings
            .values()
            .filter(|row| row.period == period && row.period_start == period_start)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.rank);
        Ok(rows)
    }

    async fn latest(
        &self,
        period: RankingPeriod,
        limit: i64,
    ) -> Result<Vec<Ranking>, RepositoryError> {
        let tables = self.tables()?;
        let Some(latest_start) = tables
            .rankings
            .values()
            .filter(|row| row.period == period)
            .map(|row| row.period_start)
            .max()
        else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Ranking> = tables
            .rankings
            .values()
            .filter(|row| row.period == period && row.period_start == latest_start)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.rank);
        Ok(page(rows, limit, 0))
    }
}
