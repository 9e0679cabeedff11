use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{QuestionId, RawAnswer, UserId};
use super::normalize::NormalizedProfile;

/// Body delivered to the external matching service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub user_id: UserId,
    pub raw_answers: BTreeMap<QuestionId, RawAnswer>,
    pub normalized_profile: NormalizedProfile,
    /// Answers that feed no dimension (school, sport, bio).
    pub contextual: BTreeMap<QuestionId, RawAnswer>,
    pub completed_at: DateTime<Utc>,
}

/// Acknowledgement from the matching service. Ranked matches stay opaque here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub matches: Vec<serde_json::Value>,
}

/// Gateway failure, reported to the caller as-is.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SubmissionError {
    #[error("matching service rejected the profile ({status}): {reason}")]
    Rejected { status: u16, reason: String },
    #[error("matching service unreachable: {0}")]
    Transport(String),
    #[error("matching service returned an unreadable response: {0}")]
    InvalidResponse(String),
}

/// Outbound boundary to the matching service.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmissionError>;
}

/// Posts payloads as JSON to a configured endpoint. No retries at this layer.
#[derive(Debug, Clone)]
pub struct HttpMatchingGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMatchingGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SubmissionGateway for HttpMatchingGateway {
    async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                reason: body,
            });
        }

        if body.trim().is_empty() {
            return Ok(SubmissionReceipt::default());
        }
        serde_json::from_str(&body).map_err(|err| SubmissionError::InvalidResponse(err.to_string()))
    }
}
