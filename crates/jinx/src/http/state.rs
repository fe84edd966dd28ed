use std::sync::Arc;

use crate::accounts::service::{AuthService, ProfileService};
use crate::accounts::token::TokenManager;
use crate::config::{AuthConfig, RitualConfig};
use crate::feed::service::{CurseService, PostService};
use crate::rituals::service::{RankingService, RitualService};
use crate::storage::Repositories;
use crate::tracker::service::{ApplicationService, CompanyService};

/// Services shared by every handler.
#[derive(Clone)]
pub struct ApiState {
    pub tokens: Arc<TokenManager>,
    pub auth: Arc<AuthService>,
    pub profiles: Arc<ProfileService>,
    pub posts: Arc<PostService>,
    pub curses: Arc<CurseService>,
    pub companies: Arc<CompanyService>,
    pub applications: Arc<ApplicationService>,
    pub rituals: Arc<RitualService>,
    pub rankings: Arc<RankingService>,
}

impl ApiState {
    pub fn new(repos: Repositories, auth: &AuthConfig, rituals: RitualConfig) -> Self {
        let tokens = Arc::new(TokenManager::new(auth));
        let posts = Arc::new(PostService::new(
            repos.posts.clone(),
            repos.users.clone(),
            repos.curse_styles.clone(),
        ));

        Self {
            auth: Arc::new(AuthService::new(
                repos.users.clone(),
                repos.curse_styles.clone(),
                tokens.clone(),
            )),
            profiles: Arc::new(ProfileService::new(
                repos.users.clone(),
                repos.curse_styles.clone(),
                posts.clone(),
            )),
            curses: Arc::new(CurseService::new(repos.curses, repos.posts)),
            companies: Arc::new(CompanyService::new(repos.companies.clone())),
            applications: Arc::new(ApplicationService::new(
                repos.applications,
                repos.companies,
                repos.stages,
                repos.reminders,
            )),
            rituals: Arc::new(RitualService::new(repos.rituals, repos.users, rituals)),
            rankings: Arc::new(RankingService::new(repos.rankings)),
            posts,
            tokens,
        }
    }
}
