use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{corrupt, expect_one, like_literal};
use crate::feed::domain::{Curse, CurseStyle, Post, PostContent};
use crate::feed::repository::{
    CurseRepository, CurseStyleRepository, PostRepository, PostWithAuthor,
};
use crate::storage::RepositoryError;

const POST_COLUMNS: &str = "p.id, p.user_id, p.content, p.post_type, p.is_anonymous, \
     p.ritual_id, p.curse_count, p.is_deleted, p.created_at, p.updated_at, p.deleted_at";

#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    user_id: Uuid,
    content: String,
    post_type: String,
    is_anonymous: bool,
    ritual_id: Option<Uuid>,
    curse_count: i32,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<PostRow> for Post {
    type Error = RepositoryError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            content: PostContent::parse(&row.content)
                .map_err(|err| corrupt("posts.content", err))?,
            post_type: row
                .post_type
                .parse()
                .map_err(|err| corrupt("posts.post_type", err))?,
            is_anonymous: row.is_anonymous,
            ritual_id: row.ritual_id,
            curse_count: u32::try_from(row.curse_count)
                .map_err(|err| corrupt("posts.curse_count", err))?,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PostWithAuthorRow {
    #[sqlx(flatten)]
    post: PostRow,
    author_name: String,
    author_curse_style_id: Uuid,
    cursed_by_viewer: bool,
}

impl TryFrom<PostWithAuthorRow> for PostWithAuthor {
    type Error = RepositoryError;

    fn try_from(row: PostWithAuthorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            post: Post::try_from(row.post)?,
            author_name: row.author_name,
            author_curse_style_id: row.author_curse_style_id,
            cursed_by_viewer: row.cursed_by_viewer,
        })
    }
}

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create(&self, post: &Post) -> Result<(), RepositoryError> {
        let curse_count =
            i32::try_from(post.curse_count).map_err(|err| corrupt("posts.curse_count", err))?;
        sqlx::query(
            "INSERT INTO posts (id, user_id, content, post_type, is_anonymous, ritual_id, \
             curse_count, is_deleted, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(post.id)
        .bind(post.user_id)
        .bind(post.content.as_str())
        .bind(post.post_type.as_str())
        .bind(post.is_anonymous)
        .bind(post.ritual_id)
        .bind(curse_count)
        .bind(post.is_deleted)
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(post.deleted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepositoryError> {
        let row: Option<PostRow> =
            sqlx::query_as(&format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Post::try_from).transpose()
    }

    // The curse counter is owned by the increment/decrement statements and left alone here.
    async fn update(&self, post: &Post) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE posts SET content = $2, ritual_id = $3, is_deleted = $4, updated_at = $5, \
             deleted_at = $6 WHERE id = $1",
        )
        .bind(post.id)
        .bind(post.content.as_str())
        .bind(post.ritual_id)
        .bind(post.is_deleted)
        .bind(post.updated_at)
        .bind(post.deleted_at)
        .execute(&self.pool)
        .await?;
        expect_one(result)
    }

    async fn timeline(
        &self,
        viewer: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostWithAuthor>, RepositoryError> {
        let rows: Vec<PostWithAuthorRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS}, u.username AS author_name, \
             u.curse_style_id AS author_curse_style_id, \
             EXISTS (SELECT 1 FROM curses c WHERE c.user_id = $1 AND c.post_id = p.id) \
             AS cursed_by_viewer \
             FROM posts p JOIN users u ON u.id = p.user_id \
             WHERE p.is_deleted = FALSE AND p.post_type = 'normal' AND u.is_deleted = FALSE \
             ORDER BY p.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(viewer)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PostWithAuthor::try_from).collect()
    }

    async fn by_author(
        &self,
        author: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostWithAuthor>, RepositoryError> {
        let rows: Vec<PostWithAuthorRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS}, u.username AS author_name, \
             u.curse_style_id AS author_curse_style_id, FALSE AS cursed_by_viewer \
             FROM posts p JOIN users u ON u.id = p.user_id \
             WHERE p.user_id = $1 AND p.is_deleted = FALSE AND u.is_deleted = FALSE \
             ORDER BY p.created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(author)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PostWithAuthor::try_from).collect()
    }

    async fn increment_curse_count(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE posts SET curse_count = curse_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        expect_one(result)
    }

    async fn decrement_curse_count(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE posts SET curse_count = GREATEST(curse_count - 1, 0), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        expect_one(result)
    }
}

#[derive(Debug, FromRow)]
struct CurseRow {
    id: Uuid,
    user_id: Uuid,
    post_id: Uuid,
    ritual_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<CurseRow> for Curse {
    fn from(row: CurseRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            post_id: row.post_id,
            ritual_id: row.ritual_id,
            created_at: row.created_at,
        }
    }
}

pub struct PgCurseRepository {
    pool: PgPool,
}

impl PgCurseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CurseRepository for PgCurseRepository {
    async fn create(&self, curse: &Curse) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO curses (id, user_id, post_id, ritual_id, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(curse.id)
        .bind(curse.user_id)
        .bind(curse.post_id)
        .bind(curse.ritual_id)
        .bind(curse.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<Curse>, RepositoryError> {
        let row: Option<CurseRow> = sqlx::query_as(
            "SELECT id, user_id, post_id, ritual_id, created_at FROM curses \
             WHERE user_id = $1 AND post_id = $2",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Curse::from))
    }

    async fn delete(&self, user_id: Uuid, post_id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM curses WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;
        expect_one(result)
    }
}

#[derive(Debug, FromRow)]
struct CurseStyleRow {
    id: Uuid,
    name: String,
    name_en: String,
    description: String,
    is_special: bool,
    point_cost: i32,
    created_at: DateTime<Utc>,
}

impl From<CurseStyleRow> for CurseStyle {
    fn from(row: CurseStyleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            name_en: row.name_en,
            description: row.description,
            is_special: row.is_special,
            point_cost: row.point_cost,
            created_at: row.created_at,
        }
    }
}

const STYLE_COLUMNS: &str = "id, name, name_en, description, is_special, point_cost, created_at";

pub struct PgCurseStyleRepository {
    pool: PgPool,
}

impl PgCurseStyleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CurseStyleRepository for PgCurseStyleRepository {
    async fn list(&self) -> Result<Vec<CurseStyle>, RepositoryError> {
        let rows: Vec<CurseStyleRow> = sqlx::query_as(&format!(
            "SELECT {STYLE_COLUMNS} FROM curse_styles ORDER BY is_special, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CurseStyle::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CurseStyle>, RepositoryError> {
        let row: Option<CurseStyleRow> =
            sqlx::query_as(&format!("SELECT {STYLE_COLUMNS} FROM curse_styles WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(CurseStyle::from))
    }

    async fn find_by_name_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<CurseStyle>, RepositoryError> {
        let row: Option<CurseStyleRow> = sqlx::query_as(&format!(
            "SELECT {STYLE_COLUMNS} FROM curse_styles WHERE name_en ILIKE $1 \
             ORDER BY is_special, created_at LIMIT 1"
        ))
        .bind(format!("{}%", like_literal(prefix.trim())))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CurseStyle::from))
    }
}
