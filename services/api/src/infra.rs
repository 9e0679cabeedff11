use async_trait::async_trait;
use chrono::Utc;
use matchpoint::config::MatchingConfig;
use matchpoint::error::AppError;
use matchpoint::questionnaire::{
    HttpMatchingGateway, QuestionSchema, SubmissionError, SubmissionGateway, SubmissionPayload,
    SubmissionReceipt,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

const MIN_AUTOSAVE_TICK: Duration = Duration::from_millis(25);

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Keeps submitted profiles in process when no matching endpoint is configured.
#[derive(Default, Clone)]
pub(crate) struct InMemorySubmissionGateway {
    submissions: Arc<Mutex<Vec<SubmissionPayload>>>,
}

#[async_trait]
impl SubmissionGateway for InMemorySubmissionGateway {
    async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let mut guard = self.submissions.lock().expect("submission mutex poisoned");
        guard.push(payload.clone());
        Ok(SubmissionReceipt {
            reference: Some(format!(
                "local-{}-{}",
                payload.user_id,
                Utc::now().timestamp_millis()
            )),
            matches: Vec::new(),
        })
    }
}

impl InMemorySubmissionGateway {
    pub(crate) fn submissions(&self) -> Vec<SubmissionPayload> {
        self.submissions
            .lock()
            .expect("submission mutex poisoned")
            .clone()
    }
}

pub(crate) fn load_schema(path: Option<&Path>) -> Result<QuestionSchema, AppError> {
    match path {
        Some(path) => {
            let schema = QuestionSchema::from_path(path)?;
            info!(path = %path.display(), questions = schema.len(), "loaded questionnaire schema");
            Ok(schema)
        }
        None => Ok(QuestionSchema::standard()),
    }
}

pub(crate) fn build_gateway(config: &MatchingConfig) -> Result<Arc<dyn SubmissionGateway>, AppError> {
    match &config.endpoint {
        Some(endpoint) => {
            let gateway = HttpMatchingGateway::new(endpoint.clone(), config.timeout)?;
            info!(endpoint = %gateway.endpoint(), "delivering profiles to matching service");
            Ok(Arc::new(gateway))
        }
        None => {
            info!("no matching endpoint configured; keeping submissions in memory");
            Ok(Arc::new(InMemorySubmissionGateway::default()))
        }
    }
}

/// Sweep often enough that a draft lands shortly after its quiet period ends.
pub(crate) fn autosave_tick(debounce: Duration) -> Duration {
    (debounce / 4).max(MIN_AUTOSAVE_TICK)
}
