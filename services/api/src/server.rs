use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryLedger, InMemoryVault};
use crate::routes::with_verification_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use credential_verify::config::AppConfig;
use credential_verify::error::AppError;
use credential_verify::telemetry;
use credential_verify::workflows::verification::{
    TesseractCli, VerificationService, VerificationSettings,
};
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let verification = &config.verification;
    let engine = Arc::new(TesseractCli::new(
        &verification.tesseract_cmd,
        verification.ocr_timeout,
    ));
    let service = Arc::new(VerificationService::new(
        Arc::new(InMemoryLedger::default()),
        engine,
        Arc::new(InMemoryVault::default()),
        VerificationSettings::from(verification),
    ));

    let app = with_verification_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        tesseract = %verification.tesseract_cmd,
        max_upload_bytes = verification.max_upload_bytes,
        "credential verification service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
