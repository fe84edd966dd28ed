//! Job-application tracking: companies, applications, selection stages and reminders.

pub mod domain;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationCategory, ApplicationStatus, ColorTag, Company, NotesPatch, Reminder,
    ReminderChannel, SelectionStage, SelectionStageStatus,
};
pub use policy::{ApplicationScheduler, ProgressPolicy, ReminderService};
pub use repository::{
    ApplicationRepository, CompanyListing, CompanyQuery, CompanyRepository, ReminderRepository,
    SelectionStageRepository,
};
pub use service::{ApplicationOutcome, ApplicationService, CompanyService, TrackerError};
