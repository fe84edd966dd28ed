use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{
    Application, ApplicationCategory, ApplicationStatus, ColorTag, Company, NotesPatch, Reminder,
    ReminderChannel, SelectionStage, SelectionStageStatus,
};
use super::policy::{ApplicationScheduler, ProgressPolicy, ReminderService};
use super::repository::{
    ApplicationRepository, CompanyListing, CompanyQuery, CompanyRepository, ReminderRepository,
    SelectionStageRepository,
};
use crate::domain::{DomainError, Page};
use crate::storage::RepositoryError;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompanyInput {
    pub name: String,
    #[serde(default)]
    pub recruitment_url: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Query string of `GET /companies`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// `my` restricts the listing to companies the requester applied to.
    pub filter: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateApplicationInput {
    pub company_id: Uuid,
    pub category: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub color_tag: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub what_to_do: Option<String>,
    #[serde(default)]
    pub job_axis: Option<String>,
    #[serde(default)]
    pub strengths: Option<String>,
}

/// Absent or empty fields are left untouched, except `scheduled_at` where an empty
/// string clears the schedule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateApplicationInput {
    pub category: Option<String>,
    pub status: Option<String>,
    pub color_tag: Option<String>,
    pub scheduled_at: Option<String>,
    pub motivation: Option<String>,
    pub what_to_do: Option<String>,
    pub job_axis: Option<String>,
    pub strengths: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStageInput {
    pub name: String,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStageInput {
    pub status: Option<String>,
    pub scheduled_at: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderInput {
    pub target_at: String,
    #[serde(default)]
    pub channel: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyView {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recruitment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl From<&Company> for CompanyView {
    fn from(company: &Company) -> Self {
        Self {
            id: company.id,
            name: company.name.clone(),
            recruitment_url: company.recruitment_url.clone(),
            industry: company.industry.clone(),
            location: company.location.clone(),
        }
    }
}

/// Compact application shape embedded in company listings.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub category: ApplicationCategory,
    pub status: ApplicationStatus,
    pub color_tag: ColorTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub motivation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub what_to_do: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub job_axis: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub strengths: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&Application> for ApplicationSummary {
    fn from(app: &Application) -> Self {
        Self {
            id: app.id,
            category: app.category,
            status: app.status,
            color_tag: app.color_tag,
            scheduled_at: app.scheduled_at,
            motivation: app.motivation.clone(),
            what_to_do: app.what_to_do.clone(),
            job_axis: app.job_axis.clone(),
            strengths: app.strengths.clone(),
            updated_at: app.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyListingView {
    pub company: CompanyView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_application: Option<ApplicationSummary>,
}

impl From<&CompanyListing> for CompanyListingView {
    fn from(listing: &CompanyListing) -> Self {
        Self {
            company: CompanyView::from(&listing.company),
            my_application: listing.application.as_ref().map(ApplicationSummary::from),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyPage {
    pub data: Vec<CompanyListingView>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub category: ApplicationCategory,
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
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

impl From<&Application> for ApplicationView {
    fn from(app: &Application) -> Self {
        Self {
            id: app.id,
            user_id: app.user_id,
            company_id: app.company_id,
            category: app.category,
            status: app.status,
            scheduled_at: app.scheduled_at,
            color_tag: app.color_tag,
            completed: app.completed,
            motivation: app.motivation.clone(),
            what_to_do: app.what_to_do.clone(),
            job_axis: app.job_axis.clone(),
            strengths: app.strengths.clone(),
            created_at: app.created_at,
            updated_at: app.updated_at,
        }
    }
}

/// Saved application plus the advisory scheduling-conflict flag.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationOutcome {
    #[serde(flatten)]
    pub application: ApplicationView,
    pub schedule_conflict: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageView {
    pub id: Uuid,
    pub application_id: Uuid,
    pub name: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: SelectionStageStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SelectionStage> for StageView {
    fn from(stage: &SelectionStage) -> Self {
        Self {
            id: stage.id,
            application_id: stage.application_id,
            name: stage.name.clone(),
            scheduled_at: stage.scheduled_at,
            status: stage.status,
            notes: stage.notes.clone(),
            created_at: stage.created_at,
            updated_at: stage.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderView {
    pub id: Uuid,
    pub application_id: Uuid,
    pub target_at: DateTime<Utc>,
    pub channel: ReminderChannel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Reminder> for ReminderView {
    fn from(reminder: &Reminder) -> Self {
        Self {
            id: reminder.id,
            application_id: reminder.application_id,
            target_at: reminder.target_at,
            channel: reminder.channel,
            message: reminder.message.clone(),
            created_at: reminder.created_at,
        }
    }
}

/// Company catalog shared by every user.
pub struct CompanyService {
    companies: Arc<dyn CompanyRepository>,
}

impl CompanyService {
    pub fn new(companies: Arc<dyn CompanyRepository>) -> Self {
        Self { companies }
    }

    pub async fn create(&self, input: CreateCompanyInput) -> Result<CompanyView, TrackerError> {
        let company = Company::new(
            &input.name,
            input.recruitment_url,
            input.industry,
            input.location,
        )?;
        self.companies.create(&company).await?;
        tracing::info!(company_id = %company.id, name = %company.name, "company created");
        Ok(CompanyView::from(&company))
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        params: CompanyListParams,
    ) -> Result<CompanyPage, TrackerError> {
        let page = Page::new(params.offset, params.limit);
        let query = CompanyQuery {
            user_id,
            page,
            only_mine: params
                .filter
                .as_deref()
                .is_some_and(|filter| filter.trim().eq_ignore_ascii_case("my")),
            category: parse_optional(params.category.as_deref())?,
            status: parse_optional(params.status.as_deref())?,
            search: non_empty(params.search),
        };

        let listings = self.companies.list(&query).await?;
        Ok(CompanyPage {
            data: listings.iter().map(CompanyListingView::from).collect(),
            pagination: Pagination {
                limit: page.limit,
                offset: page.offset,
            },
        })
    }
}

/// Applications, their selection stages and reminders. Every operation is scoped to the
/// owning user.
pub struct ApplicationService {
    applications: Arc<dyn ApplicationRepository>,
    companies: Arc<dyn CompanyRepository>,
    stages: Arc<dyn SelectionStageRepository>,
    reminders: Arc<dyn ReminderRepository>,
    policy: ProgressPolicy,
    scheduler: ApplicationScheduler,
    reminder_builder: ReminderService,
}

impl ApplicationService {
    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        companies: Arc<dyn CompanyRepository>,
        stages: Arc<dyn SelectionStageRepository>,
        reminders: Arc<dyn ReminderRepository>,
    ) -> Self {
        Self {
            applications,
            companies,
            stages,
            reminders,
            policy: ProgressPolicy,
            scheduler: ApplicationScheduler,
            reminder_builder: ReminderService,
        }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateApplicationInput,
    ) -> Result<ApplicationOutcome, TrackerError> {
        let category = input.category.parse::<ApplicationCategory>()?;
        let status = parse_optional(input.status.as_deref())?.unwrap_or(ApplicationStatus::Todo);
        let color_tag = parse_optional(input.color_tag.as_deref())?.unwrap_or_default();
        let scheduled_at = match input.scheduled_at.as_deref() {
            Some(raw) => parse_optional_timestamp("scheduled_at", raw)?,
            None => None,
        };

        if self.companies.find_by_id(input.company_id).await?.is_none() {
            return Err(TrackerError::CompanyNotFound);
        }
        if self
            .applications
            .find_by_user_and_company(user_id, input.company_id, category)
            .await?
            .is_some()
        {
            return Err(TrackerError::DuplicateApplication);
        }

        let mut application = Application::new(
            user_id,
            input.company_id,
            category,
            status,
            scheduled_at,
            color_tag,
        );
        application.update_notes(NotesPatch {
            motivation: input.motivation,
            what_to_do: input.what_to_do,
            job_axis: input.job_axis,
            strengths: input.strengths,
        });

        match self.applications.create(&application).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => return Err(TrackerError::DuplicateApplication),
            Err(err) => return Err(err.into()),
        }
        tracing::info!(
            application_id = %application.id,
            company_id = %application.company_id,
            category = %application.category,
            "application created"
        );

        let schedule_conflict = self.detect_conflict(&application).await?;
        Ok(ApplicationOutcome {
            application: ApplicationView::from(&application),
            schedule_conflict,
        })
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        application_id: Uuid,
        input: UpdateApplicationInput,
    ) -> Result<ApplicationOutcome, TrackerError> {
        let mut application = self.owned_application(user_id, application_id).await?;

        if let Some(category) = parse_optional::<ApplicationCategory>(input.category.as_deref())? {
            if category != application.category {
                let taken = self
                    .applications
                    .find_by_user_and_company(user_id, application.company_id, category)
                    .await?
                    .is_some();
                if taken {
                    return Err(TrackerError::DuplicateApplication);
                }
                application.recategorize(category);
            }
        }

        if let Some(next) = parse_optional::<ApplicationStatus>(input.status.as_deref())? {
            if next != application.status {
                let previous = application.status;
                application.transition_to(next, &self.policy)?;
                tracing::info!(%application_id, from = %previous, to = %next, "application status changed");
            }
        }

        if let Some(color_tag) = parse_optional::<ColorTag>(input.color_tag.as_deref())? {
            application.retag(color_tag);
        }

        if let Some(raw) = input.scheduled_at.as_deref() {
            application.reschedule(parse_optional_timestamp("scheduled_at", raw)?);
        }

        application.update_notes(NotesPatch {
            motivation: input.motivation,
            what_to_do: input.what_to_do,
            job_axis: input.job_axis,
            strengths: input.strengths,
        });

        match self.applications.update(&application).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict) => return Err(TrackerError::DuplicateApplication),
            Err(err) => return Err(err.into()),
        }

        let schedule_conflict = self.detect_conflict(&application).await?;
        Ok(ApplicationOutcome {
            application: ApplicationView::from(&application),
            schedule_conflict,
        })
    }

    pub async fn list_mine(&self, user_id: Uuid) -> Result<Vec<ApplicationView>, TrackerError> {
        let applications = self.applications.list_by_user(user_id).await?;
        Ok(applications.iter().map(ApplicationView::from).collect())
    }

    pub async fn add_stage(
        &self,
        user_id: Uuid,
        application_id: Uuid,
        input: CreateStageInput,
    ) -> Result<StageView, TrackerError> {
        let application = self.owned_application(user_id, application_id).await?;
        let scheduled_at = match input.scheduled_at.as_deref() {
            Some(raw) => parse_optional_timestamp("scheduled_at", raw)?,
            None => None,
        };

        let stage = SelectionStage::new(application.id, &input.name, scheduled_at, input.notes)?;
        self.stages.create(&stage).await?;
        tracing::info!(%application_id, stage_id = %stage.id, name = %stage.name, "selection stage added");
        Ok(StageView::from(&stage))
    }

    pub async fn update_stage(
        &self,
        user_id: Uuid,
        application_id: Uuid,
        stage_id: Uuid,
        input: UpdateStageInput,
    ) -> Result<StageView, TrackerError> {
        let application = self.owned_application(user_id, application_id).await?;
        let mut stage = match self.stages.find_by_id(stage_id).await? {
            Some(stage) if stage.application_id == application.id => stage,
            _ => return Err(TrackerError::StageNotFound),
        };

        if let Some(status) = parse_optional::<SelectionStageStatus>(input.status.as_deref())? {
            stage.update_status(status);
        }
        if let Some(raw) = input.scheduled_at.as_deref() {
            stage.reschedule(parse_optional_timestamp("scheduled_at", raw)?);
        }
        if input.notes.is_some() {
            stage.update_notes(input.notes);
        }

        self.stages.update(&stage).await?;
        Ok(StageView::from(&stage))
    }

    pub async fn stages(
        &self,
        user_id: Uuid,
        application_id: Uuid,
    ) -> Result<Vec<StageView>, TrackerError> {
        let application = self.owned_application(user_id, application_id).await?;
        let stages = self.stages.list_by_application(application.id).await?;
        Ok(stages.iter().map(StageView::from).collect())
    }

    pub async fn schedule_reminder(
        &self,
        user_id: Uuid,
        application_id: Uuid,
        input: CreateReminderInput,
    ) -> Result<ReminderView, TrackerError> {
        let application = self.owned_application(user_id, application_id).await?;
        let target_at = parse_timestamp("target_at", &input.target_at)?;
        let channel = parse_optional(input.channel.as_deref())?.unwrap_or(ReminderChannel::InApp);

        let reminder =
            self.reminder_builder
                .build(&application, channel, &input.message, target_at)?;
        self.reminders.create(&reminder).await?;
        tracing::info!(%application_id, reminder_id = %reminder.id, %target_at, "reminder scheduled");
        Ok(ReminderView::from(&reminder))
    }

    pub async fn reminders(
        &self,
        user_id: Uuid,
        application_id: Uuid,
    ) -> Result<Vec<ReminderView>, TrackerError> {
        let application = self.owned_application(user_id, application_id).await?;
        let reminders = self.reminders.list_by_application(application.id).await?;
        Ok(reminders.iter().map(ReminderView::from).collect())
    }

    async fn owned_application(
        &self,
        user_id: Uuid,
        application_id: Uuid,
    ) -> Result<Application, TrackerError> {
        let application = self
            .applications
            .find_by_id(application_id)
            .await?
            .ok_or(TrackerError::ApplicationNotFound)?;
        if !application.is_owned_by(user_id) {
            return Err(DomainError::Forbidden.into());
        }
        Ok(application)
    }

    /// Advisory only: a clash is logged and reported, never rejected.
    async fn detect_conflict(&self, application: &Application) -> Result<bool, TrackerError> {
        if application.scheduled_at.is_none() {
            return Ok(false);
        }

        let existing = self.applications.list_by_user(application.user_id).await?;
        let conflict = self.scheduler.has_conflict(&existing, application);
        if conflict {
            tracing::warn!(
                application_id = %application.id,
                scheduled_at = ?application.scheduled_at,
                "application overlaps another scheduled application"
            );
        }
        Ok(conflict)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Absent and blank values both mean "not provided".
fn parse_optional<T>(raw: Option<&str>) -> Result<Option<T>, DomainError>
where
    T: std::str::FromStr<Err = DomainError>,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some),
    }
}

fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, TrackerError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| TrackerError::InvalidTimestamp { field })
}

/// Empty input clears the value.
fn parse_optional_timestamp(
    field: &'static str,
    raw: &str,
) -> Result<Option<DateTime<Utc>>, TrackerError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_timestamp(field, raw).map(Some)
}

/// Error raised by the tracker services.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("company not found")]
    CompanyNotFound,
    #[error("application not found")]
    ApplicationNotFound,
    #[error("selection stage not found")]
    StageNotFound,
    #[error("application already exists for this company and category")]
    DuplicateApplication,
    #[error("invalid {field} format, expected RFC 3339")]
    InvalidTimestamp { field: &'static str },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_optional_values_are_absent() {
        assert_eq!(parse_optional::<ColorTag>(None), Ok(None));
        assert_eq!(parse_optional::<ColorTag>(Some("  ")), Ok(None));
        assert_eq!(parse_optional::<ColorTag>(Some("Purple")), Ok(Some(ColorTag::Purple)));
        assert!(parse_optional::<ColorTag>(Some("teal")).is_err());
    }

    #[test]
    fn timestamps_are_normalised_to_utc() {
        let parsed = parse_timestamp("scheduled_at", "2025-03-14T19:00:00+09:00").expect("valid");
        assert_eq!(parsed.to_rfc3339(), "2025-03-14T10:00:00+00:00");
        assert!(matches!(
            parse_timestamp("scheduled_at", "tomorrow"),
            Err(TrackerError::InvalidTimestamp { field: "scheduled_at" })
        ));
        assert_eq!(parse_optional_timestamp("scheduled_at", "").ok(), Some(None));
    }
}
