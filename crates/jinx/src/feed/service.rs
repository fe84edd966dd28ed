use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use uuid::Uuid;

use super::domain::{Curse, CurseStyle, Post, PostContent, PostType};
use super::repository::{CurseRepository, CurseStyleRepository, PostRepository, PostWithAuthor};
use crate::accounts::repository::UserRepository;
use crate::domain::{DomainError, Page};
use crate::storage::RepositoryError;

/// Display name shown instead of the author on anonymous posts.
pub const ANONYMOUS_NAME: &str = "匿名";

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub content: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePostInput {
    pub content: String,
}

/// Post as rendered to API clients, with author and curse-style details.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub content: String,
    pub post_type: PostType,
    pub is_anonymous: bool,
    pub curse_count: u32,
    pub is_cursed_by_me: bool,
    pub created_at: DateTime<Utc>,
    pub curse_style_name: String,
    pub curse_style_name_en: String,
    pub curse_style_description: String,
}

impl PostView {
    fn render(post: &Post, author_name: &str, cursed_by_viewer: bool, style: &CurseStyle) -> Self {
        let username = if post.is_anonymous {
            ANONYMOUS_NAME.to_string()
        } else {
            author_name.to_string()
        };

        Self {
            id: post.id,
            user_id: post.user_id,
            username,
            content: post.content.to_string(),
            post_type: post.post_type,
            is_anonymous: post.is_anonymous,
            curse_count: post.curse_count,
            is_cursed_by_me: cursed_by_viewer,
            created_at: post.created_at,
            curse_style_name: style.name.clone(),
            curse_style_name_en: style.name_en.clone(),
            curse_style_description: style.description.clone(),
        }
    }
}

/// Post creation, editing, and the curse-style enriched timeline.
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    styles: Arc<dyn CurseStyleRepository>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        styles: Arc<dyn CurseStyleRepository>,
    ) -> Self {
        Self {
            posts,
            users,
            styles,
        }
    }

    pub async fn timeline(&self, viewer: Uuid, page: Page) -> Result<Vec<PostView>, FeedError> {
        let rows = self.posts.timeline(viewer, page.limit, page.offset).await?;
        self.render(rows).await
    }

    pub async fn by_author(&self, author: Uuid, page: Page) -> Result<Vec<PostView>, FeedError> {
        let rows = self.posts.by_author(author, page.limit, page.offset).await?;
        self.render(rows).await
    }

    pub async fn create(&self, author: Uuid, input: CreatePostInput) -> Result<PostView, FeedError> {
        let user = self
            .users
            .find_by_id(author)
            .await?
            .ok_or(FeedError::UserNotFound)?;
        let content = PostContent::parse(&input.content)?;

        let post = Post::new(author, content, PostType::Normal, input.is_anonymous);
        self.posts.create(&post).await?;
        tracing::info!(post_id = %post.id, user_id = %author, "post created");

        let style = load_style(Arc::clone(&self.styles), user.curse_style_id)
            .await?
            .1;
        Ok(PostView::render(&post, user.username.as_str(), false, &style))
    }

    pub async fn update(
        &self,
        post_id: Uuid,
        editor: Uuid,
        input: UpdatePostInput,
    ) -> Result<(), FeedError> {
        let mut post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(FeedError::PostNotFound)?;
        let content = PostContent::parse(&input.content)?;

        post.update_content(content, editor)?;
        self.posts.update(&post).await?;
        tracing::info!(post_id = %post.id, "post updated");
        Ok(())
    }

    pub async fn delete(&self, post_id: Uuid, actor: Uuid) -> Result<(), FeedError> {
        let mut post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(FeedError::PostNotFound)?;

        post.delete(actor)?;
        self.posts.update(&post).await?;
        tracing::info!(post_id = %post.id, "post deleted");
        Ok(())
    }

    async fn render(&self, rows: Vec<PostWithAuthor>) -> Result<Vec<PostView>, FeedError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let style_ids: HashSet<Uuid> = rows.iter().map(|row| row.author_curse_style_id).collect();
        let styles = self.fetch_styles(style_ids).await?;

        rows.iter()
            .map(|row| {
                styles
                    .get(&row.author_curse_style_id)
                    .map(|style| {
                        PostView::render(&row.post, &row.author_name, row.cursed_by_viewer, style)
                    })
                    .ok_or(FeedError::CurseStyleNotFound(row.author_curse_style_id))
            })
            .collect()
    }

    /// One lookup task per distinct style id. The first failure drops the set, which
    /// aborts every lookup still in flight.
    async fn fetch_styles(
        &self,
        style_ids: HashSet<Uuid>,
    ) -> Result<HashMap<Uuid, CurseStyle>, FeedError> {
        let mut lookups = JoinSet::new();
        for id in style_ids.iter().copied() {
            lookups.spawn(load_style(Arc::clone(&self.styles), id));
        }

        let mut resolved = HashMap::with_capacity(style_ids.len());
        while let Some(joined) = lookups.join_next().await {
            let (id, style) = joined??;
            resolved.insert(id, style);
        }
        Ok(resolved)
    }
}

async fn load_style(
    styles: Arc<dyn CurseStyleRepository>,
    id: Uuid,
) -> Result<(Uuid, CurseStyle), FeedError> {
    match styles.find_by_id(id).await? {
        Some(style) => Ok((id, style)),
        None => Err(FeedError::CurseStyleNotFound(id)),
    }
}

/// Toggles curse records and keeps each post's counter in step.
pub struct CurseService {
    curses: Arc<dyn CurseRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CurseService {
    pub fn new(curses: Arc<dyn CurseRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { curses, posts }
    }

    // The record and the counter are written by two separate statements.
    pub async fn curse_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), FeedError> {
        if self.curses.find(user_id, post_id).await?.is_some() {
            return Err(FeedError::AlreadyCursed);
        }

        let post = match self.posts.find_by_id(post_id).await? {
            Some(post) if !post.is_deleted => post,
            _ => return Err(FeedError::PostNotFound),
        };

        let curse = Curse::new(user_id, &post)?;
        match self.curses.create(&curse).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => return Err(FeedError::AlreadyCursed),
            Err(err) => return Err(err.into()),
        }
        self.posts.increment_curse_count(post_id).await?;

        tracing::info!(%post_id, %user_id, "post cursed");
        Ok(())
    }

    pub async fn uncurse_post(&self, user_id: Uuid, post_id: Uuid) -> Result<(), FeedError> {
        if self.curses.find(user_id, post_id).await?.is_none() {
            return Err(FeedError::CurseNotFound);
        }

        match self.curses.delete(user_id, post_id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(FeedError::CurseNotFound),
            Err(err) => return Err(err.into()),
        }
        self.posts.decrement_curse_count(post_id).await?;

        tracing::info!(%post_id, %user_id, "post uncursed");
        Ok(())
    }
}

/// Error raised by the feed services.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("post not found")]
    PostNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("already cursed this post")]
    AlreadyCursed,
    #[error("curse not found")]
    CurseNotFound,
    #[error("curse style {0} not found")]
    CurseStyleNotFound(Uuid),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("curse style lookup aborted: {0}")]
    Lookup(#[from] tokio::task::JoinError),
}
