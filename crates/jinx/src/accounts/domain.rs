use std::fmt;
use std::str::FromStr;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

const MIN_PASSWORD_BYTES: usize = 8;
const MAX_USERNAME_CHARS: usize = 50;
const MAX_AGE: i32 = 150;

/// Lowercased, syntactically valid e-mail address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if !EMAIL_PATTERN.is_match(trimmed) {
            return Err(DomainError::InvalidEmail);
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Argon2id PHC string; the plaintext is never retained.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn from_plaintext(plain: &str) -> Result<Self, DomainError> {
        if plain.len() < MIN_PASSWORD_BYTES {
            return Err(DomainError::PasswordTooShort);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|err| DomainError::PasswordHashing(err.to_string()))?;
        Ok(Self(hash.to_string()))
    }

    /// Wrap a hash loaded from storage.
    pub fn from_phc(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn verify(&self, plain: &str) -> bool {
        match PhcString::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let length = trimmed.chars().count();
        if length == 0 || length > MAX_USERNAME_CHARS {
            return Err(DomainError::InvalidUsername);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn validate_age(age: i32) -> Result<i32, DomainError> {
    if (0..=MAX_AGE).contains(&age) {
        Ok(age)
    } else {
        Err(DomainError::InvalidAge)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

impl FromStr for Gender {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "unknown" => Ok(Gender::Unknown),
            _ => Err(DomainError::unknown("gender", value)),
        }
    }
}

/// Registered account. Soft-deleted users stay in storage but are hidden from reads.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: Email,
    pub password: PasswordHash,
    pub username: Username,
    pub age: i32,
    pub gender: Gender,
    pub curse_style_id: Uuid,
    pub points: i32,
    pub profile_public: bool,
    pub notify_curse: bool,
    pub notify_ritual: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(
        email: Email,
        password: PasswordHash,
        username: Username,
        age: i32,
        gender: Gender,
        curse_style_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password,
            username,
            age,
            gender,
            curse_style_id,
            points: 0,
            profile_public: true,
            notify_curse: true,
            notify_ritual: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn update_profile(&mut self, username: Username, age: i32, gender: Gender) {
        self.username = username;
        self.age = age;
        self.gender = gender;
        self.updated_at = Utc::now();
    }

    pub fn change_curse_style(&mut self, curse_style_id: Uuid) {
        self.curse_style_id = curse_style_id;
        self.updated_at = Utc::now();
    }

    pub fn add_points(&mut self, points: i32) {
        self.points = self.points.saturating_add(points);
        self.updated_at = Utc::now();
    }

    pub fn delete(&mut self) {
        let now = Utc::now();
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    /// Whole days since registration, counting the registration day itself.
    pub fn days_registered(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0) + 1
    }
}
