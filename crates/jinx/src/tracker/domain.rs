use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::policy::ProgressPolicy;
use crate::domain::DomainError;

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(DomainError::unknown($kind, value)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Kind of opening being tracked.
    ApplicationCategory, "category", {
        Main => "main",
        Intern => "intern",
        Info => "info",
    }
);

text_enum!(
    /// Progress of an application; transitions are governed by [`ProgressPolicy`].
    ApplicationStatus, "status", {
        Todo => "todo",
        Scheduled => "scheduled",
        InProgress => "in_progress",
        Done => "done",
        Withdrawn => "withdrawn",
    }
);

text_enum!(
    ColorTag, "color tag", {
        Orange => "orange",
        Purple => "purple",
    }
);

text_enum!(
    SelectionStageStatus, "stage status", {
        Pending => "pending",
        Passed => "passed",
        Failed => "failed",
    }
);

text_enum!(
    ReminderChannel, "reminder channel", {
        InApp => "in_app",
        Email => "email",
    }
);

impl Default for ColorTag {
    fn default() -> Self {
        ColorTag::Orange
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub recruitment_url: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn new(
        name: &str,
        recruitment_url: Option<String>,
        industry: Option<String>,
        location: Option<String>,
    ) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::InvalidCompanyName);
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            recruitment_url: optional_text(recruitment_url),
            industry: optional_text(industry),
            location: optional_text(location),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of the free-text notes; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct NotesPatch {
    pub motivation: Option<String>,
    pub what_to_do: Option<String>,
    pub job_axis: Option<String>,
    pub strengths: Option<String>,
}

/// A user's tracked application to one company, unique per (user, company, category).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub category: ApplicationCategory,
    pub status: ApplicationStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub color_tag: ColorTag,
    pub completed: bool,
    pub motivation: String,
    pub what_to_do: String,
    pub job_axis: String,
    pub strengths: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn new(
        user_id: Uuid,
        company_id: Uuid,
        category: ApplicationCategory,
        status: ApplicationStatus,
        scheduled_at: Option<DateTime<Utc>>,
        color_tag: ColorTag,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            company_id,
            category,
            status,
            scheduled_at,
            color_tag,
            completed: false,
            motivation: String::new(),
            what_to_do: String::new(),
            job_axis: String::new(),
            strengths: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Writes the status unchecked. Writing `done` raises `completed`, which never drops.
    pub fn update_status(&mut self, next: ApplicationStatus) {
        self.status = next;
        if next == ApplicationStatus::Done {
            self.completed = true;
        }
        self.updated_at = Utc::now();
    }

    pub fn transition_to(
        &mut self,
        next: ApplicationStatus,
        policy: &ProgressPolicy,
    ) -> Result<(), DomainError> {
        policy.validate_status_transition(self.status, next)?;
        self.update_status(next);
        Ok(())
    }

    pub fn update_notes(&mut self, patch: NotesPatch) {
        if let Some(motivation) = patch.motivation {
            self.motivation = motivation;
        }
        if let Some(what_to_do) = patch.what_to_do {
            self.what_to_do = what_to_do;
        }
        if let Some(job_axis) = patch.job_axis {
            self.job_axis = job_axis;
        }
        if let Some(strengths) = patch.strengths {
            self.strengths = strengths;
        }
        self.updated_at = Utc::now();
    }

    pub fn reschedule(&mut self, scheduled_at: Option<DateTime<Utc>>) {
        self.scheduled_at = scheduled_at;
        self.updated_at = Utc::now();
    }

    pub fn recategorize(&mut self, category: ApplicationCategory) {
        self.category = category;
        self.updated_at = Utc::now();
    }

    pub fn retag(&mut self, color_tag: ColorTag) {
        self.color_tag = color_tag;
        self.updated_at = Utc::now();
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// One step of a selection process (document screening, interviews, offer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionStage {
    pub id: Uuid,
    pub application_id: Uuid,
    pub name: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: SelectionStageStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SelectionStage {
    pub fn new(
        application_id: Uuid,
        name: &str,
        scheduled_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::InvalidStageName);
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            application_id,
            name: name.to_string(),
            scheduled_at,
            status: SelectionStageStatus::Pending,
            notes: optional_text(notes),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_status(&mut self, status: SelectionStageStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn reschedule(&mut self, scheduled_at: Option<DateTime<Utc>>) {
        self.scheduled_at = scheduled_at;
        self.updated_at = Utc::now();
    }

    pub fn update_notes(&mut self, notes: Option<String>) {
        self.notes = optional_text(notes);
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: Uuid,
    pub application_id: Uuid,
    pub target_at: DateTime<Utc>,
    pub channel: ReminderChannel,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(
        application_id: Uuid,
        target_at: DateTime<Utc>,
        channel: ReminderChannel,
        message: &str,
    ) -> Result<Self, DomainError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(DomainError::InvalidReminderMessage);
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            application_id,
            target_at,
            channel,
            message: message.to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}
