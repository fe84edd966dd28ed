use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{corrupt, expect_one, like_literal};
use crate::storage::RepositoryError;
use crate::tracker::domain::{
    Application, ApplicationCategory, Company, Reminder, SelectionStage,
};
use crate::tracker::repository::{
    ApplicationRepository, CompanyListing, CompanyQuery, CompanyRepository, ReminderRepository,
    SelectionStageRepository,
};

#[derive(Debug, FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    recruitment_url: Option<String>,
    industry: Option<String>,
    location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            recruitment_url: row.recruitment_url,
            industry: row.industry,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const APPLICATION_COLUMNS: &str = "id, user_id, company_id, category, status, scheduled_at, \
     color_tag, completed, motivation, what_to_do, job_axis, strengths, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ApplicationRow {
    id: Uuid,
    user_id: Uuid,
    company_id: Uuid,
    category: String,
    status: String,
    scheduled_at: Option<DateTime<Utc>>,
    color_tag: String,
    completed: bool,
    motivation: String,
    what_to_do: String,
    job_axis: String,
    strengths: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = RepositoryError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            company_id: row.company_id,
            category: row
                .category
                .parse()
                .map_err(|err| corrupt("applications.category", err))?,
            status: row
                .status
                .parse()
                .map_err(|err| corrupt("applications.status", err))?,
            scheduled_at: row.scheduled_at,
            color_tag: row
                .color_tag
                .parse()
                .map_err(|err| corrupt("applications.color_tag", err))?,
            completed: row.completed,
            motivation: row.motivation,
            what_to_do: row.what_to_do,
            job_axis: row.job_axis,
            strengths: row.strengths,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Company columns plus the requester's application, all null when there is none.
#[derive(Debug, FromRow)]
struct CompanyListingRow {
    #[sqlx(flatten)]
    company: CompanyRow,
    app_id: Option<Uuid>,
    app_category: Option<String>,
    app_status: Option<String>,
    app_scheduled_at: Option<DateTime<Utc>>,
    app_color_tag: Option<String>,
    app_completed: Option<bool>,
    app_motivation: Option<String>,
    app_what_to_do: Option<String>,
    app_job_axis: Option<String>,
    app_strengths: Option<String>,
    app_created_at: Option<DateTime<Utc>>,
    app_updated_at: Option<DateTime<Utc>>,
}

impl CompanyListingRow {
    fn into_listing(self, user_id: Uuid) -> Result<CompanyListing, RepositoryError> {
        let application = match (
            self.app_id,
            self.app_category,
            self.app_status,
            self.app_color_tag,
            self.app_created_at,
            self.app_updated_at,
        ) {
            (Some(id), Some(category), Some(status), Some(color_tag), Some(created), Some(updated)) => {
                Some(Application::try_from(ApplicationRow {
                    id,
                    user_id,
                    company_id: self.company.id,
                    category,
                    status,
                    scheduled_at: self.app_scheduled_at,
                    color_tag,
                    completed: self.app_completed.unwrap_or(false),
                    motivation: self.app_motivation.unwrap_or_default(),
                    what_to_do: self.app_what_to_do.unwrap_or_default(),
                    job_axis: self.app_job_axis.unwrap_or_default(),
                    strengths: self.app_strengths.unwrap_or_default(),
                    created_at: created,
                    updated_at: updated,
                })?)
            }
            _ => None,
        };

        Ok(CompanyListing {
            company: Company::from(self.company),
            application,
        })
    }
}

pub struct PgCompanyRepository {
    pool: PgPool,
}

impl PgCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn create(&self, company: &Company) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO companies (id, name, recruitment_url, industry, location, created_at, \
             updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(company.id)
        .bind(&company.name)
        .bind(&company.recruitment_url)
        .bind(&company.industry)
        .bind(&company.location)
        .bind(company.created_at)
        .bind(company.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, RepositoryError> {
        let row: Option<CompanyRow> = sqlx::query_as(
            "SELECT id, name, recruitment_url, industry, location, created_at, updated_at \
             FROM companies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Company::from))
    }

    async fn list(&self, query: &CompanyQuery) -> Result<Vec<CompanyListing>, RepositoryError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT c.id, c.name, c.recruitment_url, c.industry, c.location, c.created_at, \
             c.updated_at, a.id AS app_id, a.category AS app_category, a.status AS app_status, \
             a.scheduled_at AS app_scheduled_at, a.color_tag AS app_color_tag, \
             a.completed AS app_completed, a.motivation AS app_motivation, \
             a.what_to_do AS app_what_to_do, a.job_axis AS app_job_axis, \
             a.strengths AS app_strengths, a.created_at AS app_created_at, \
             a.updated_at AS app_updated_at \
             FROM companies c LEFT JOIN LATERAL ( \
             SELECT * FROM applications a WHERE a.company_id = c.id AND a.user_id = ",
        );
        builder.push_bind(query.user_id);
        if let Some(category) = query.category {
            builder.push(" AND a.category = ").push_bind(category.as_str());
        }
        if let Some(status) = query.status {
            builder.push(" AND a.status = ").push_bind(status.as_str());
        }
        builder.push(" ORDER BY a.updated_at DESC LIMIT 1) a ON TRUE WHERE TRUE");
        if query.only_mine {
            builder.push(" AND a.id IS NOT NULL");
        }
        if let Some(search) = &query.search {
            builder
                .push(" AND c.name ILIKE ")
                .push_bind(format!("%{}%", like_literal(search)));
        }
        builder
            .push(" ORDER BY c.name LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.offset);

        let rows: Vec<CompanyListingRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| row.into_listing(query.user_id))
            .collect()
    }
}

pub struct PgApplicationRepository {
    pool: PgPool,
}

impl PgApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationRepository for PgApplicationRepository {
    async fn create(&self, application: &Application) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO applications ({APPLICATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(application.id)
        .bind(application.user_id)
        .bind(application.company_id)
        .bind(application.category.as_str())
        .bind(application.status.as_str())
        .bind(application.scheduled_at)
        .bind(application.color_tag.as_str())
        .bind(application.completed)
        .bind(&application.motivation)
        .bind(&application.what_to_do)
        .bind(&application.job_axis)
        .bind(&application.strengths)
        .bind(application.created_at)
        .bind(application.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>, RepositoryError> {
        let row: Option<ApplicationRow> = sqlx::query_as(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Application::try_from).transpose()
    }

    async fn find_by_user_and_company(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        category: ApplicationCategory,
    ) -> Result<Option<Application>, RepositoryError> {
        let row: Option<ApplicationRow> = sqlx::query_as(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE user_id = $1 AND company_id = $2 AND category = $3"
        ))
        .bind(user_id)
        .bind(company_id)
        .bind(category.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Application::try_from).transpose()
    }

    async fn update(&self, application: &Application) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE applications SET category = $2, status = $3, scheduled_at = $4, \
             color_tag = $5, completed = $6, motivation = $7, what_to_do = $8, job_axis = $9, \
             strengths = $10, updated_at = $11 WHERE id = $1",
        )
        .bind(application.id)
        .bind(application.category.as_str())
        .bind(application.status.as_str())
        .bind(application.scheduled_at)
        .bind(application.color_tag.as_str())
        .bind(application.completed)
        .bind(&application.motivation)
        .bind(&application.what_to_do)
        .bind(&application.job_axis)
        .bind(&application.strengths)
        .bind(application.updated_at)
        .execute(&self.pool)
        .await?;
        expect_one(result)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Application>, RepositoryError> {
        let rows: Vec<ApplicationRow> = sqlx::query_as(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE user_id = $1 \
             ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Application::try_from).collect()
    }
}

#[derive(Debug, FromRow)]
struct StageRow {
    id: Uuid,
    application_id: Uuid,
    name: String,
    scheduled_at: Option<DateTime<Utc>>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StageRow> for SelectionStage {
    type Error = RepositoryError;

    fn try_from(row: StageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            application_id: row.application_id,
            name: row.name,
            scheduled_at: row.scheduled_at,
            status: row
                .status
                .parse()
                .map_err(|err| corrupt("selection_stages.status", err))?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const STAGE_COLUMNS: &str =
    "id, application_id, name, scheduled_at, status, notes, created_at, updated_at";

pub struct PgSelectionStageRepository {
    pool: PgPool,
}

impl PgSelectionStageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SelectionStageRepository for PgSelectionStageRepository {
    async fn create(&self, stage: &SelectionStage) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO selection_stages ({STAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(stage.id)
        .bind(stage.application_id)
        .bind(&stage.name)
        .bind(stage.scheduled_at)
        .bind(stage.status.as_str())
        .bind(&stage.notes)
        .bind(stage.created_at)
        .bind(stage.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SelectionStage>, RepositoryError> {
        let row: Option<StageRow> = sqlx::query_as(&format!(
            "SELECT {STAGE_COLUMNS} FROM selection_stages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(SelectionStage::try_from).transpose()
    }

    async fn update(&self, stage: &SelectionStage) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE selection_stages SET scheduled_at = $2, status = $3, notes = $4, \
             updated_at = $5 WHERE id = $1",
        )
        .bind(stage.id)
        .bind(stage.scheduled_at)
        .bind(stage.status.as_str())
        .bind(&stage.notes)
        .bind(stage.updated_at)
        .execute(&self.pool)
        .await?;
        expect_one(result)
    }

    async fn list_by_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<SelectionStage>, RepositoryError> {
        let rows: Vec<StageRow> = sqlx::query_as(&format!(
            "SELECT {STAGE_COLUMNS} FROM selection_stages WHERE application_id = $1 \
             ORDER BY scheduled_at NULLS LAST, created_at"
        ))
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SelectionStage::try_from).collect()
    }
}

#[derive(Debug, FromRow)]
struct ReminderRow {
    id: Uuid,
    application_id: Uuid,
    target_at: DateTime<Utc>,
    channel: String,
    message: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = RepositoryError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            application_id: row.application_id,
            target_at: row.target_at,
            channel: row
                .channel
                .parse()
                .map_err(|err| corrupt("reminders.channel", err))?,
            message: row.message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgReminderRepository {
    pool: PgPool,
}

impl PgReminderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderRepository for PgReminderRepository {
    async fn create(&self, reminder: &Reminder) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO reminders (id, application_id, target_at, channel, message, created_at, \
             updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(reminder.id)
        .bind(reminder.application_id)
        .bind(reminder.target_at)
        .bind(reminder.channel.as_str())
        .bind(&reminder.message)
        .bind(reminder.created_at)
        .bind(reminder.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_by_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<Reminder>, RepositoryError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(
            "SELECT id, application_id, target_at, channel, message, created_at, updated_at \
             FROM reminders WHERE application_id = $1 ORDER BY target_at",
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Reminder::try_from).collect()
    }
}
