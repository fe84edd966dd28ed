use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::DomainError;

const MIN_CONTENT_CHARS: usize = 10;
const MAX_CONTENT_CHARS: usize = 300;

/// Trimmed post body, 10 to 300 code points inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PostContent(String);

impl PostContent {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let length = trimmed.chars().count();
        if !(MIN_CONTENT_CHARS..=MAX_CONTENT_CHARS).contains(&length) {
            return Err(DomainError::InvalidPostContent);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Normal,
    Ritual,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Normal => "normal",
            PostType::Ritual => "ritual",
        }
    }
}

impl FromStr for PostType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(PostType::Normal),
            "ritual" => Ok(PostType::Ritual),
            _ => Err(DomainError::unknown("post type", value)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: PostContent,
    pub post_type: PostType,
    pub is_anonymous: bool,
    pub ritual_id: Option<Uuid>,
    pub curse_count: u32,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(user_id: Uuid, content: PostContent, post_type: PostType, is_anonymous: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            content,
            post_type,
            is_anonymous,
            ritual_id: None,
            curse_count: 0,
            is_deleted: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn ensure_editable_by(&self, actor: Uuid) -> Result<(), DomainError> {
        if self.user_id != actor || self.is_deleted {
            return Err(DomainError::Forbidden);
        }
        Ok(())
    }

    pub fn update_content(&mut self, content: PostContent, editor: Uuid) -> Result<(), DomainError> {
        self.ensure_editable_by(editor)?;
        self.content = content;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn delete(&mut self, actor: Uuid) -> Result<(), DomainError> {
        self.ensure_editable_by(actor)?;
        let now = Utc::now();
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn increment_curse_count(&mut self) {
        self.curse_count = self.curse_count.saturating_add(1);
        self.updated_at = Utc::now();
    }

    pub fn decrement_curse_count(&mut self) {
        self.curse_count = self.curse_count.saturating_sub(1);
        self.updated_at = Utc::now();
    }

    pub fn attach_ritual(&mut self, ritual_id: Uuid) {
        self.ritual_id = Some(ritual_id);
        self.updated_at = Utc::now();
    }
}

/// A like by one user on another user's post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub ritual_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Curse {
    pub fn new(actor: Uuid, post: &Post) -> Result<Self, DomainError> {
        if post.user_id == actor {
            return Err(DomainError::CannotCurseSelf);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: actor,
            post_id: post.id,
            ritual_id: None,
            created_at: Utc::now(),
        })
    }

    pub fn attach_ritual(&mut self, ritual_id: Uuid) {
        self.ritual_id = Some(ritual_id);
    }
}

/// Cosmetic profile category. The five basic styles cost nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurseStyle {
    pub id: Uuid,
    pub name: String,
    pub name_en: String,
    pub description: String,
    pub is_special: bool,
    pub point_cost: i32,
    pub created_at: DateTime<Utc>,
}

impl CurseStyle {
    pub fn new(
        name: impl Into<String>,
        name_en: impl Into<String>,
        description: impl Into<String>,
        is_special: bool,
        point_cost: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            name_en: name_en.into(),
            description: description.into(),
            is_special,
            point_cost,
            created_at: Utc::now(),
        }
    }

    /// Case-insensitive prefix match on the English name, e.g. `"frozen"`.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.name_en
            .to_lowercase()
            .starts_with(&prefix.trim().to_lowercase())
    }
}
