use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{Curse, CurseStyle, Post};
use crate::storage::RepositoryError;

/// Post joined with the author columns the feed needs.
#[derive(Debug, Clone)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author_name: String,
    pub author_curse_style_id: Uuid,
    pub cursed_by_viewer: bool,
}

/// Post storage. `find_by_id` also returns soft-deleted posts; listings never do.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: &Post) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepositoryError>;
    async fn update(&self, post: &Post) -> Result<(), RepositoryError>;
    /// Non-deleted `normal` posts by non-deleted authors, newest first.
    async fn timeline(
        &self,
        viewer: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostWithAuthor>, RepositoryError>;
    /// Non-deleted posts of one author, newest first. `cursed_by_viewer` is always false.
    async fn by_author(
        &self,
        author: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostWithAuthor>, RepositoryError>;
    async fn increment_curse_count(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// Never drops the counter below zero.
    async fn decrement_curse_count(&self, id: Uuid) -> Result<(), RepositoryError>;
}

/// Curse records, unique per (user, post).
#[async_trait]
pub trait CurseRepository: Send + Sync {
    async fn create(&self, curse: &Curse) -> Result<(), RepositoryError>;
    async fn find(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<Curse>, RepositoryError>;
    async fn delete(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CurseStyleRepository: Send + Sync {
    /// All styles, basic ones first, in creation order.
    async fn list(&self) -> Result<Vec<CurseStyle>, RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CurseStyle>, RepositoryError>;
    async fn find_by_name_prefix(&self, prefix: &str)
        -> Result<Option<CurseStyle>, RepositoryError>;
}
