use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::accounts::domain::{Email, Gender, PasswordHash, User, Username};
use crate::storage::memory::MemoryStore;
use crate::storage::{RepositoryError, Repositories};
use crate::tracker::domain::{Application, ApplicationCategory};
use crate::tracker::repository::ApplicationRepository;
use crate::tracker::service::{
    ApplicationOutcome, ApplicationService, CompanyService, CreateApplicationInput,
    CreateCompanyInput,
};

pub(super) struct Harness {
    pub(super) repos: Repositories,
    pub(super) companies: CompanyService,
    pub(super) applications: ApplicationService,
}

pub(super) fn harness() -> Harness {
    let repos = Repositories::from_store(Arc::new(MemoryStore::seeded()));
    Harness {
        companies: CompanyService::new(repos.companies.clone()),
        applications: application_service(&repos, repos.applications.clone()),
        repos,
    }
}

pub(super) fn application_service(
    repos: &Repositories,
    applications: Arc<dyn ApplicationRepository>,
) -> ApplicationService {
    ApplicationService::new(
        applications,
        repos.companies.clone(),
        repos.stages.clone(),
        repos.reminders.clone(),
    )
}

pub(super) fn application_input(company_id: Uuid, category: &str) -> CreateApplicationInput {
    CreateApplicationInput {
        company_id,
        category: category.to_string(),
        status: None,
        color_tag: None,
        scheduled_at: None,
        motivation: None,
        what_to_do: None,
        job_axis: None,
        strengths: None,
    }
}

impl Harness {
    pub(super) async fn user(&self, name: &str) -> Uuid {
        let user = User::new(
            Email::parse(&format!("{name}@example.com")).expect("email"),
            PasswordHash::from_phc("unused"),
            Username::parse(name).expect("username"),
            24,
            Gender::Unknown,
            Uuid::new_v4(),
        );
        self.repos.users.create(&user).await.expect("user stored");
        user.id
    }

    pub(super) async fn company(&self, name: &str) -> Uuid {
        self.companies
            .create(CreateCompanyInput {
                name: name.to_string(),
                recruitment_url: None,
                industry: None,
                location: None,
            })
            .await
            .expect("company created")
            .id
    }

    pub(super) async fn apply(&self, user_id: Uuid, company_id: Uuid, category: &str) -> ApplicationOutcome {
        self.applications
            .create(user_id, application_input(company_id, category))
            .await
            .expect("application created")
    }
}

/// Reports no existing application but loses every insert to a concurrent writer.
pub(super) struct RacingApplications;

#[async_trait]
impl ApplicationRepository for RacingApplications {
    async fn create(&self, _application: &Application) -> Result<(), RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Application>, RepositoryError> {
        Ok(None)
    }

    async fn find_by_user_and_company(
        &self,
        _user_id: Uuid,
        _company_id: Uuid,
        _category: ApplicationCategory,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(None)
    }

    async fn update(&self, _application: &Application) -> Result<(), RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    async fn list_by_user(&self, _user_id: Uuid) -> Result<Vec<Application>, RepositoryError> {
        Ok(Vec::new())
    }
}
