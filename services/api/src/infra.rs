use jinx::config::{AppConfig, DatabaseConfig};
use jinx::error::AppError;
use jinx::storage::postgres;
use jinx::Repositories;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Storage the server runs against.
pub(crate) enum Backend {
    Memory,
    Postgres,
}

impl Backend {
    pub(crate) fn select(in_memory: bool) -> Self {
        if in_memory {
            Backend::Memory
        } else {
            Backend::Postgres
        }
    }

    /// Postgres connections are migrated before the repositories are handed out.
    pub(crate) async fn repositories(&self, config: &AppConfig) -> Result<Repositories, AppError> {
        match self {
            Backend::Memory => {
                info!("using in-memory storage; data is lost on shutdown");
                Ok(Repositories::in_memory())
            }
            Backend::Postgres => {
                let pool = connect_and_migrate(&config.database).await?;
                Ok(Repositories::postgres(pool))
            }
        }
    }
}

pub(crate) async fn connect_and_migrate(
    database: &DatabaseConfig,
) -> Result<postgres::PgPool, AppError> {
    let pool = postgres::connect(database).await?;
    postgres::migrate(&pool).await?;
    info!(max_connections = database.max_connections, "database migrated");
    Ok(pool)
}
