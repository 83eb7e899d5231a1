use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryHackathonStore, LoggingNotificationSink, PathCertificateRenderer,
};
use crate::routes::with_hackathon_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hackfest::config::AppConfig;
use hackfest::error::AppError;
use hackfest::telemetry;
use hackfest::workflows::hackathon::HackathonService;
use std::sync::atomic::Ordering;
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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryHackathonStore::default());
    let notifier = Arc::new(LoggingNotificationSink::default());
    let renderer = Arc::new(PathCertificateRenderer);
    let service = Arc::new(HackathonService::new(store, notifier, renderer));

    let app = with_hackathon_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "hackathon coordination service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
