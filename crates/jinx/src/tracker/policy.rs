//! Domain services for the tracker: status progression, scheduling conflicts, reminders.

use chrono::{DateTime, Utc};

use super::domain::{Application, ApplicationStatus, Reminder, ReminderChannel};
use crate::domain::DomainError;

/// Static transition table for [`ApplicationStatus`]. `done` and `withdrawn` are terminal
/// and no status may transition to itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressPolicy;

impl ProgressPolicy {
    pub fn allowed_next(current: ApplicationStatus) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;

        match current {
            Todo => &[Scheduled, InProgress, Withdrawn],
            Scheduled => &[InProgress, Withdrawn],
            InProgress => &[Done, Withdrawn],
            Done | Withdrawn => &[],
        }
    }

    pub fn validate_status_transition(
        &self,
        current: ApplicationStatus,
        next: ApplicationStatus,
    ) -> Result<(), DomainError> {
        if Self::allowed_next(current).contains(&next) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                current: current.as_str(),
                next: next.as_str(),
            })
        }
    }
}

/// Detects two applications of the same user booked for the exact same instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationScheduler;

impl ApplicationScheduler {
    pub fn has_conflict(&self, existing: &[Application], candidate: &Application) -> bool {
        let Some(target) = candidate.scheduled_at else {
            return false;
        };

        existing.iter().any(|other| {
            other.id != candidate.id
                && other.user_id == candidate.user_id
                && other.scheduled_at == Some(target)
        })
    }
}

/// Builds reminders attached to an application. Delivery is someone else's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReminderService;

impl ReminderService {
    pub fn build(
        &self,
        application: &Application,
        channel: ReminderChannel,
        message: &str,
        target_at: DateTime<Utc>,
    ) -> Result<Reminder, DomainError> {
        Reminder::new(application.id, target_at, channel, message)
    }
}
