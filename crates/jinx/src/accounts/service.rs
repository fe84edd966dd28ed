use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{validate_age, Email, Gender, PasswordHash, User, Username};
use super::repository::{UserRepository, UserStats};
use super::token::{TokenError, TokenKind, TokenManager};
use crate::domain::{DomainError, Page};
use crate::feed::domain::CurseStyle;
use crate::feed::repository::CurseStyleRepository;
use crate::feed::service::{FeedError, PostService, PostView};
use crate::storage::RepositoryError;

const MY_POSTS_LIMIT: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub age: i32,
    pub gender: String,
    /// Case-insensitive prefix of the style's English name, e.g. `"infernal"`.
    #[serde(alias = "curseStyle")]
    pub curse_style: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshInput {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileInput {
    pub username: String,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub age: i32,
    pub gender: String,
    #[serde(default)]
    pub curse_style_id: Option<Uuid>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AgeField {
    Number(i64),
    Text(String),
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    match AgeField::deserialize(deserializer)? {
        AgeField::Number(value) => i32::try_from(value).map_err(de::Error::custom),
        AgeField::Text(value) => value.trim().parse::<i32>().map_err(de::Error::custom),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub age: i32,
    pub gender: Gender,
    pub curse_style_id: Uuid,
    pub points: i32,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.to_string(),
            username: user.username.to_string(),
            age: user.age,
            gender: user.gender,
            curse_style_id: user.curse_style_id,
            points: user.points,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: UserView,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurseStyleSummary {
    pub id: Uuid,
    pub name: String,
    pub name_en: String,
    pub description: String,
}

impl From<&CurseStyle> for CurseStyleSummary {
    fn from(style: &CurseStyle) -> Self {
        Self {
            id: style.id,
            name: style.name.clone(),
            name_en: style.name_en.clone(),
            description: style.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileStats {
    pub posts: i64,
    pub curses: i64,
    pub days: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub age: i32,
    pub gender: Gender,
    pub curse_style: CurseStyleSummary,
    pub points: i32,
    pub stats: ProfileStats,
    pub created_at: DateTime<Utc>,
}

/// Registration, login, and token refresh.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    styles: Arc<dyn CurseStyleRepository>,
    tokens: Arc<TokenManager>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        styles: Arc<dyn CurseStyleRepository>,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            users,
            styles,
            tokens,
        }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<AuthResponse, AccountError> {
        let email = Email::parse(&input.email)?;
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let username = Username::parse(&input.username)?;
        let age = validate_age(input.age)?;
        let gender = input.gender.parse::<Gender>()?;
        let style = match input.curse_style.trim() {
            "" => None,
            prefix => self.styles.find_by_name_prefix(prefix).await?,
        }
        .ok_or_else(|| AccountError::UnknownCurseStyle(input.curse_style.clone()))?;
        let password = hash_password(input.password).await?;

        let user = User::new(email, password, username, age, gender, style.id);
        match self.users.create(&user).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => return Err(AccountError::EmailTaken),
            Err(err) => return Err(err.into()),
        }
        tracing::info!(user_id = %user.id, curse_style = %style.name_en, "user registered");

        self.respond_with_tokens(&user)
    }

    pub async fn login(&self, input: LoginInput) -> Result<AuthResponse, AccountError> {
        let email = Email::parse(&input.email).map_err(|_| AccountError::InvalidCredentials)?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(user.password.clone(), input.password).await? {
            tracing::warn!(user_id = %user.id, "login rejected");
            return Err(AccountError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "user logged in");
        self.respond_with_tokens(&user)
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AccountError> {
        let claims = self
            .tokens
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|err| {
                tracing::warn!(error = %err, "refresh rejected");
                AccountError::InvalidToken
            })?;

        if self.users.find_by_id(claims.user_id).await?.is_none() {
            return Err(AccountError::InvalidToken);
        }

        Ok(self.tokens.issue(claims.user_id, TokenKind::Access)?)
    }

    /// Resolve the account behind an access token. Tokens of deleted users are refused.
    pub async fn authenticate(&self, access_token: &str) -> Result<Uuid, AccountError> {
        let claims = self
            .tokens
            .verify(access_token, TokenKind::Access)
            .map_err(|err| {
                tracing::warn!(error = %err, "rejected bearer token");
                AccountError::InvalidToken
            })?;

        if self.users.find_by_id(claims.user_id).await?.is_none() {
            tracing::warn!(user_id = %claims.user_id, "bearer token for unknown user");
            return Err(AccountError::InvalidToken);
        }
        Ok(claims.user_id)
    }

    fn respond_with_tokens(&self, user: &User) -> Result<AuthResponse, AccountError> {
        let pair = self.tokens.issue_pair(user.id)?;
        Ok(AuthResponse {
            user: UserView::from(user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }
}

async fn hash_password(plain: String) -> Result<PasswordHash, AccountError> {
    let hashed = tokio::task::spawn_blocking(move || PasswordHash::from_plaintext(&plain)).await?;
    Ok(hashed?)
}

async fn verify_password(hash: PasswordHash, plain: String) -> Result<bool, AccountError> {
    Ok(tokio::task::spawn_blocking(move || hash.verify(&plain)).await?)
}

/// Profile reads and edits for the authenticated user.
pub struct ProfileService {
    users: Arc<dyn UserRepository>,
    styles: Arc<dyn CurseStyleRepository>,
    posts: Arc<PostService>,
}

impl ProfileService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        styles: Arc<dyn CurseStyleRepository>,
        posts: Arc<PostService>,
    ) -> Self {
        Self {
            users,
            styles,
            posts,
        }
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<ProfileView, AccountError> {
        let user = self.load_user(user_id).await?;
        self.render(&user).await
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<ProfileView, AccountError> {
        let mut user = self.load_user(user_id).await?;
        let username = Username::parse(&input.username)?;
        let age = validate_age(input.age)?;
        let gender = input.gender.parse::<Gender>()?;

        if let Some(style_id) = input.curse_style_id {
            if self.styles.find_by_id(style_id).await?.is_none() {
                return Err(AccountError::UnknownCurseStyle(style_id.to_string()));
            }
            user.change_curse_style(style_id);
        }
        user.update_profile(username, age, gender);
        self.users.update(&user).await?;
        tracing::info!(%user_id, "profile updated");

        self.render(&user).await
    }

    pub async fn curse_styles(&self) -> Result<Vec<CurseStyle>, AccountError> {
        Ok(self.styles.list().await?)
    }

    /// Up to 100 of the user's own posts, newest first.
    pub async fn my_posts(&self, user_id: Uuid) -> Result<Vec<PostView>, AccountError> {
        let page = Page {
            offset: 0,
            limit: MY_POSTS_LIMIT,
        };
        Ok(self.posts.by_author(user_id, page).await?)
    }

    async fn load_user(&self, user_id: Uuid) -> Result<User, AccountError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    async fn render(&self, user: &User) -> Result<ProfileView, AccountError> {
        let style = self
            .styles
            .find_by_id(user.curse_style_id)
            .await?
            .ok_or(AccountError::MissingCurseStyle(user.curse_style_id))?;
        let UserStats { posts, curses } = self.users.stats(user.id).await?;

        Ok(ProfileView {
            id: user.id,
            email: user.email.to_string(),
            username: user.username.to_string(),
            age: user.age,
            gender: user.gender,
            curse_style: CurseStyleSummary::from(&style),
            points: user.points,
            stats: ProfileStats {
                posts,
                curses,
                days: user.days_registered(Utc::now()),
            },
            created_at: user.created_at,
        })
    }
}

/// Error raised by the account services.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("user not found")]
    UserNotFound,
    #[error("unknown curse style: {0}")]
    UnknownCurseStyle(String),
    #[error("curse style {0} referenced by user is missing")]
    MissingCurseStyle(Uuid),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("password worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
