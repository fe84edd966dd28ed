use crate::cli::ServeArgs;
use crate::infra::{connect_and_migrate, AppState, Backend};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use jinx::config::AppConfig;
use jinx::error::AppError;
use jinx::{api_router, telemetry, ApiState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repositories = Backend::select(args.in_memory)
        .repositories(&config)
        .await?;
    let api_state = ApiState::new(repositories, &config.auth, config.rituals);

    let app = with_service_routes(api_router(api_state))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, in_memory = args.in_memory, "jinx api ready");

    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) async fn migrate() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    connect_and_migrate(&config.database).await?;
    Ok(())
}
