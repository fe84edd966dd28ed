use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::accounts::domain::{Email, Gender, PasswordHash, User, Username};
use crate::feed::domain::CurseStyle;
use crate::feed::repository::CurseStyleRepository;
use crate::feed::service::{CreatePostInput, CurseService, PostService, PostView};
use crate::storage::memory::MemoryStore;
use crate::storage::{RepositoryError, Repositories};

pub(super) struct Harness {
    pub(super) repos: Repositories,
    pub(super) posts: PostService,
    pub(super) curses: CurseService,
}

pub(super) fn harness() -> Harness {
    let repos = Repositories::from_store(Arc::new(MemoryStore::seeded()));
    Harness {
        posts: PostService::new(
            repos.posts.clone(),
            repos.users.clone(),
            repos.curse_styles.clone(),
        ),
        curses: CurseService::new(repos.curses.clone(), repos.posts.clone()),
        repos,
    }
}

impl Harness {
    /// Stores a user wearing the first seeded style.
    pub(super) async fn user(&self, name: &str) -> User {
        let style = self
            .repos
            .curse_styles
            .list()
            .await
            .expect("styles")
            .into_iter()
            .next()
            .expect("seeded style");
        self.user_with_style(name, style.id).await
    }

    pub(super) async fn user_with_style(&self, name: &str, curse_style_id: Uuid) -> User {
        let user = User::new(
            Email::parse(&format!("{name}@example.com")).expect("email"),
            PasswordHash::from_phc("unused"),
            Username::parse(name).expect("username"),
            30,
            Gender::Unknown,
            curse_style_id,
        );
        self.repos.users.create(&user).await.expect("user stored");
        user
    }

    pub(super) async fn post(&self, author: &User, content: &str, is_anonymous: bool) -> PostView {
        self.posts
            .create(
                author.id,
                CreatePostInput {
                    content: content.to_string(),
                    is_anonymous,
                },
            )
            .await
            .expect("post created")
    }

    pub(super) async fn curse_count(&self, post_id: Uuid) -> u32 {
        self.repos
            .posts
            .find_by_id(post_id)
            .await
            .expect("lookup")
            .expect("post exists")
            .curse_count
    }
}

/// Style store that is always down.
pub(super) struct UnavailableStyles;

#[async_trait]
impl CurseStyleRepository for UnavailableStyles {
    async fn list(&self) -> Result<Vec<CurseStyle>, RepositoryError> {
        Err(RepositoryError::Unavailable("styles offline".to_string()))
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<CurseStyle>, RepositoryError> {
        Err(RepositoryError::Unavailable("styles offline".to_string()))
    }

    async fn find_by_name_prefix(
        &self,
        _prefix: &str,
    ) -> Result<Option<CurseStyle>, RepositoryError> {
        Err(RepositoryError::Unavailable("styles offline".to_string()))
    }
}
