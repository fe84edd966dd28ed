use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{corrupt, expect_one};
use crate::accounts::domain::{Email, PasswordHash, User, Username};
use crate::accounts::repository::{UserRepository, UserStats};
use crate::storage::RepositoryError;

const USER_COLUMNS: &str = "id, email, password_hash, username, age, gender, curse_style_id, \
     points, profile_public, notify_curse, notify_ritual, is_deleted, created_at, updated_at, \
     deleted_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    username: String,
    age: i32,
    gender: String,
    curse_style_id: Uuid,
    points: i32,
    profile_public: bool,
    notify_curse: bool,
    notify_ritual: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            email: Email::parse(&row.email).map_err(|err| corrupt("users.email", err))?,
            password: PasswordHash::from_phc(row.password_hash),
            username: Username::parse(&row.username)
                .map_err(|err| corrupt("users.username", err))?,
            age: row.age,
            gender: row.gender.parse().map_err(|err| corrupt("users.gender", err))?,
            curse_style_id: row.curse_style_id,
            points: row.points,
            profile_public: row.profile_public,
            notify_curse: row.notify_curse,
            notify_ritual: row.notify_ritual,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, username, age, gender, curse_style_id, \
             points, profile_public, notify_curse, notify_ritual, is_deleted, created_at, \
             updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(user.id)
        .bind(user.email.as_str())
        .bind(user.password.as_str())
        .bind(user.username.as_str())
        .bind(user.age)
        .bind(user.gender.as_str())
        .bind(user.curse_style_id)
        .bind(user.points)
        .bind(user.profile_public)
        .bind(user.notify_curse)
        .bind(user.notify_ritual)
        .bind(user.is_deleted)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.deleted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_deleted = FALSE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_deleted = FALSE"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn update(&self, user: &User) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET username = $2, age = $3, gender = $4, curse_style_id = $5, \
             points = $6, profile_public = $7, notify_curse = $8, notify_ritual = $9, \
             is_deleted = $10, updated_at = $11, deleted_at = $12 \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(user.username.as_str())
        .bind(user.age)
        .bind(user.gender.as_str())
        .bind(user.curse_style_id)
        .bind(user.points)
        .bind(user.profile_public)
        .bind(user.notify_curse)
        .bind(user.notify_ritual)
        .bind(user.is_deleted)
        .bind(user.updated_at)
        .bind(user.deleted_at)
        .execute(&self.pool)
        .await?;
        expect_one(result)
    }

    async fn stats(&self, id: Uuid) -> Result<UserStats, RepositoryError> {
        let (posts, curses): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(curse_count), 0)::BIGINT \
             FROM posts WHERE user_id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(UserStats { posts, curses })
    }
}
