use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::Notify;

use crate::questionnaire::domain::{
    AnswerKind, Dimension, MultiChoiceScoring, QuestionDefinition, QuestionId, RawAnswer, UserId,
};
use crate::questionnaire::draft::{DraftPersistence, DraftSlot, DraftSlotFactory, MemoryDraftSlot};
use crate::questionnaire::schema::QuestionSchema;
use crate::questionnaire::service::QuestionnaireService;
use crate::questionnaire::session::QuestionnaireSession;
use crate::questionnaire::submission::{
    SubmissionError, SubmissionGateway, SubmissionPayload, SubmissionReceipt,
};

pub(super) const QUIET: Duration = Duration::from_millis(500);

pub(super) fn id(value: &str) -> QuestionId {
    QuestionId::new(value)
}

pub(super) fn user() -> UserId {
    UserId("athlete-7".to_string())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn dimensions(values: &[&str]) -> Vec<Dimension> {
    values.iter().copied().map(Dimension::new).collect()
}

pub(super) fn text_question(question_id: &str) -> QuestionDefinition {
    QuestionDefinition {
        id: id(question_id),
        category: "Account".to_string(),
        prompt: format!("Tell us your {question_id}"),
        kind: AnswerKind::Text,
        target_dimensions: Vec::new(),
    }
}

pub(super) fn slider_question(
    question_id: &str,
    min: f64,
    max: f64,
    step: f64,
    targets: &[&str],
) -> QuestionDefinition {
    QuestionDefinition {
        id: id(question_id),
        category: "Audience".to_string(),
        prompt: format!("Rate {question_id}"),
        kind: AnswerKind::NumericSlider { min, max, step },
        target_dimensions: dimensions(targets),
    }
}

pub(super) fn single_choice_question(
    question_id: &str,
    options: &[&str],
    targets: &[&str],
) -> QuestionDefinition {
    QuestionDefinition {
        id: id(question_id),
        category: "Content".to_string(),
        prompt: format!("Pick one {question_id}"),
        kind: AnswerKind::SingleChoice {
            options: strings(options),
            option_scores: BTreeMap::new(),
        },
        target_dimensions: dimensions(targets),
    }
}

pub(super) fn multi_choice_question(
    question_id: &str,
    options: &[&str],
    scoring: MultiChoiceScoring,
    targets: &[&str],
) -> QuestionDefinition {
    QuestionDefinition {
        id: id(question_id),
        category: "Partnerships".to_string(),
        prompt: format!("Pick any {question_id}"),
        kind: AnswerKind::MultiChoice {
            options: strings(options),
            scoring,
        },
        target_dimensions: dimensions(targets),
    }
}

pub(super) fn ranked_question(
    question_id: &str,
    options: &[&str],
    max_rank_count: usize,
    targets: &[&str],
) -> QuestionDefinition {
    QuestionDefinition {
        id: id(question_id),
        category: "Partnerships".to_string(),
        prompt: format!("Rank {question_id}"),
        kind: AnswerKind::RankedChoice {
            options: strings(options),
            max_rank_count,
            option_dimensions: BTreeMap::new(),
        },
        target_dimensions: dimensions(targets),
    }
}

/// Three questions: a contextual name, a scored slider and a scored multi-choice.
pub(super) fn compact_schema() -> Arc<QuestionSchema> {
    Arc::new(
        QuestionSchema::new(vec![
            text_question("name"),
            slider_question("hours", 0.0, 10.0, 1.0, &["consistency"]),
            multi_choice_question(
                "formats",
                &["video", "photo", "live", "written"],
                MultiChoiceScoring::Breadth,
                &["versatility"],
            ),
        ])
        .expect("compact schema is valid"),
    )
}

pub(super) fn compact_answers() -> Vec<(QuestionId, RawAnswer)> {
    vec![
        (id("name"), RawAnswer::Text("Jordan Reyes".to_string())),
        (id("hours"), RawAnswer::NumericSlider(5.0)),
        (
            id("formats"),
            RawAnswer::MultiChoice(strings(&["video", "photo"])),
        ),
    ]
}

/// A complete, valid answer set for [`QuestionSchema::standard`].
pub(super) fn standard_answers() -> Vec<(QuestionId, RawAnswer)> {
    vec![
        (id("school"), RawAnswer::Text("Lakeside State".to_string())),
        (id("sport"), RawAnswer::SingleChoice("volleyball".to_string())),
        (
            id("posting_frequency"),
            RawAnswer::SingleChoice("few_per_week".to_string()),
        ),
        (id("weekly_content_hours"), RawAnswer::NumericSlider(8.0)),
        (
            id("content_formats"),
            RawAnswer::MultiChoice(strings(&["short_video", "photo", "stories"])),
        ),
        (id("audience_replies"), RawAnswer::NumericSlider(60.0)),
        (
            id("partnership_styles"),
            RawAnswer::MultiChoice(strings(&["long_term_ambassador", "one_off_post"])),
        ),
        (
            id("brand_priorities"),
            RawAnswer::RankedChoice(strings(&["local_roots", "compensation", "shared_values"])),
        ),
        (id("local_business_interest"), RawAnswer::NumericSlider(4.0)),
        (
            id("bio"),
            RawAnswer::Text("Outside hitter who coaches youth clinics.".to_string()),
        ),
    ]
}

/// Gateway that records payloads. With a gate, each call parks until notified.
#[derive(Default)]
pub(super) struct RecordingGateway {
    calls: AtomicUsize,
    payloads: Mutex<Vec<SubmissionPayload>>,
    gate: Option<Arc<Notify>>,
}

impl RecordingGateway {
    pub(super) fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn payloads(&self) -> Vec<SubmissionPayload> {
        self.payloads.lock().expect("payload mutex poisoned").clone()
    }
}

#[async_trait]
impl SubmissionGateway for RecordingGateway {
    async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.payloads
            .lock()
            .expect("payload mutex poisoned")
            .push(payload.clone());
        Ok(SubmissionReceipt {
            reference: Some(format!("match-{}", payload.user_id)),
            matches: Vec::new(),
        })
    }
}

/// Gateway that always refuses.
#[derive(Default)]
pub(super) struct FailingGateway {
    calls: AtomicUsize,
}

impl FailingGateway {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionGateway for FailingGateway {
    async fn submit(
        &self,
        _payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SubmissionError::Rejected {
            status: 503,
            reason: "matching temporarily unavailable".to_string(),
        })
    }
}

/// In-memory slots keyed by scope, shared with the test for inspection.
#[derive(Default)]
pub(super) struct MemorySlotFactory {
    slots: Mutex<HashMap<String, Arc<MemoryDraftSlot>>>,
}

impl MemorySlotFactory {
    pub(super) fn slot(&self, scope: &str) -> Arc<MemoryDraftSlot> {
        self.slots
            .lock()
            .expect("slot mutex poisoned")
            .entry(scope.to_string())
            .or_default()
            .clone()
    }
}

impl DraftSlotFactory for MemorySlotFactory {
    fn slot_for(&self, scope: &str) -> Box<dyn DraftSlot> {
        Box::new(self.slot(scope))
    }
}

pub(super) fn drafts_over(slot: &Arc<MemoryDraftSlot>) -> DraftPersistence {
    DraftPersistence::new(Box::new(slot.clone()), QUIET)
}

pub(super) fn session_with(
    schema: Arc<QuestionSchema>,
    slot: &Arc<MemoryDraftSlot>,
    gateway: Arc<dyn SubmissionGateway>,
) -> QuestionnaireSession {
    QuestionnaireSession::start(user(), schema, drafts_over(slot), gateway)
}

/// Answer every question of `answers` in order, advancing after each one.
pub(super) fn complete(session: &QuestionnaireSession, answers: Vec<(QuestionId, RawAnswer)>) {
    for (question_id, answer) in answers {
        session.answer(question_id, answer).expect("answer accepted");
        session.next().expect("answer validates");
    }
}

pub(super) fn build_service(
    gateway: Arc<dyn SubmissionGateway>,
) -> (Arc<QuestionnaireService>, Arc<MemorySlotFactory>) {
    let slots = Arc::new(MemorySlotFactory::default());
    let service = Arc::new(QuestionnaireService::new(
        compact_schema(),
        gateway,
        slots.clone(),
        QUIET,
    ));
    (service, slots)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
