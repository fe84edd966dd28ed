use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{Email, User};
use crate::storage::RepositoryError;

/// Aggregate counts over a user's non-deleted posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub posts: i64,
    pub curses: i64,
}

/// Storage abstraction for accounts. Reads never return soft-deleted users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;
    async fn update(&self, user: &User) -> Result<(), RepositoryError>;
    async fn stats(&self, id: Uuid) -> Result<UserStats, RepositoryError>;
}
