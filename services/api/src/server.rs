use crate::cli::ServeArgs;
use crate::infra::{autosave_tick, build_gateway, load_schema, AppState};
use crate::routes::with_questionnaire_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use matchpoint::config::AppConfig;
use matchpoint::error::AppError;
use matchpoint::questionnaire::{FileDraftSlotFactory, QuestionnaireService};
use matchpoint::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let schema = Arc::new(load_schema(config.questionnaire.schema_path.as_deref())?);
    let gateway = build_gateway(&config.matching)?;
    let drafts = Arc::new(FileDraftSlotFactory::new(
        config.questionnaire.draft_directory.clone(),
    ));
    let service = Arc::new(QuestionnaireService::new(
        schema,
        gateway,
        drafts,
        config.questionnaire.draft_debounce,
    )
    .with_idle_expiry(config.questionnaire.session_idle));
    let autosave = service.spawn_autosave(autosave_tick(config.questionnaire.draft_debounce));

    let app = with_questionnaire_routes(service.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        drafts = %config.questionnaire.draft_directory.display(),
        "questionnaire service ready"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    readiness_flag.store(false, Ordering::Release);
    autosave.abort();
    let flushed = service.flush_all();
    info!(flushed, "flushed pending questionnaire drafts on shutdown");

    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
