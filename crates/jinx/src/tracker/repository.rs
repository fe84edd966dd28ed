use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{
    Application, ApplicationCategory, ApplicationStatus, Company, Reminder, SelectionStage,
};
use crate::domain::Page;
use crate::storage::RepositoryError;

/// Company listing filters. `category` and `status` narrow which of the requester's
/// applications is attached; only `only_mine` drops companies without one.
#[derive(Debug, Clone)]
pub struct CompanyQuery {
    pub user_id: Uuid,
    pub page: Page,
    pub only_mine: bool,
    pub category: Option<ApplicationCategory>,
    pub status: Option<ApplicationStatus>,
    pub search: Option<String>,
}

/// One listing row: a company plus the requester's matching application, if any.
#[derive(Debug, Clone)]
pub struct CompanyListing {
    pub company: Company,
    pub application: Option<Application>,
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn create(&self, company: &Company) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, RepositoryError>;
    /// Ordered by company name.
    async fn list(&self, query: &CompanyQuery) -> Result<Vec<CompanyListing>, RepositoryError>;
}

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Fails with `Conflict` when (user, company, category) is taken.
    async fn create(&self, application: &Application) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Application>, RepositoryError>;
    async fn find_by_user_and_company(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        category: ApplicationCategory,
    ) -> Result<Option<Application>, RepositoryError>;
    async fn update(&self, application: &Application) -> Result<(), RepositoryError>;
    /// Most recently updated first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Application>, RepositoryError>;
}

#[async_trait]
pub trait SelectionStageRepository: Send + Sync {
    async fn create(&self, stage: &SelectionStage) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SelectionStage>, RepositoryError>;
    async fn update(&self, stage: &SelectionStage) -> Result<(), RepositoryError>;
    /// Scheduled stages first by time, unscheduled ones after in creation order.
    async fn list_by_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<SelectionStage>, RepositoryError>;
}

#[async_trait]
pub trait ReminderRepository: Send + Sync {
    async fn create(&self, reminder: &Reminder) -> Result<(), RepositoryError>;
    /// Soonest target first.
    async fn list_by_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<Reminder>, RepositoryError>;
}
