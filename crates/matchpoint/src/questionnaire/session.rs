use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{QuestionDefinition, QuestionId, RawAnswer, UserId};
use super::draft::DraftPersistence;
use super::navigator::{NavigationError, Navigator, NavigatorState};
use super::normalize::NormalizedProfile;
use super::schema::QuestionSchema;
use super::store::AnswerStore;
use super::submission::{SubmissionError, SubmissionGateway, SubmissionPayload, SubmissionReceipt};
use super::validation::validate;

/// One user's questionnaire attempt: navigator, answers, draft mirror and gateway.
pub struct QuestionnaireSession {
    user_id: UserId,
    schema: Arc<QuestionSchema>,
    gateway: Arc<dyn SubmissionGateway>,
    inner: Mutex<SessionState>,
}

struct SessionState {
    navigator: Navigator,
    store: AnswerStore,
    drafts: DraftPersistence,
    last_submission: Option<SubmittedProfile>,
}

/// Error raised by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error("question `{0}` is not part of this questionnaire")]
    UnknownQuestion(QuestionId),
    #[error("answers are locked; reset to start a new attempt")]
    Locked,
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

/// What the matching service received and how it acknowledged it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedProfile {
    pub payload: SubmissionPayload,
    pub receipt: SubmissionReceipt,
}

/// Snapshot of a session for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub user_id: UserId,
    pub state: &'static str,
    pub step: usize,
    pub total_steps: usize,
    pub furthest_step: usize,
    pub answered: usize,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_answer: Option<RawAnswer>,
    /// Why the current answer would not pass `next`, if it would not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_issue: Option<String>,
    pub submission_in_flight: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_profile: Option<NormalizedProfile>,
}

impl QuestionnaireSession {
    /// Open a session, resuming from the stored draft when one is readable.
    pub fn start(
        user_id: UserId,
        schema: Arc<QuestionSchema>,
        drafts: DraftPersistence,
        gateway: Arc<dyn SubmissionGateway>,
    ) -> Self {
        let (navigator, store) = match drafts.load() {
            Some(mut store) => {
                let navigator = Navigator::restore(schema.clone(), &mut store);
                info!(
                    user = %user_id,
                    step = store.current_step(),
                    answered = store.answered_count(),
                    "resumed questionnaire draft"
                );
                (navigator, store)
            }
            None => (Navigator::new(schema.clone()), AnswerStore::new()),
        };

        Self {
            user_id,
            schema,
            gateway,
            inner: Mutex::new(SessionState {
                navigator,
                store,
                drafts,
                last_submission: None,
            }),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn schema(&self) -> &Arc<QuestionSchema> {
        &self.schema
    }

    pub fn view(&self) -> SessionView {
        let state = self.lock();
        self.render(&state)
    }

    pub fn state(&self) -> NavigatorState {
        self.lock().navigator.state()
    }

    /// Copy of the current answers, mainly for callers that render reviews.
    pub fn store_snapshot(&self) -> AnswerStore {
        self.lock().store.clone()
    }

    pub fn last_submission(&self) -> Option<SubmittedProfile> {
        self.lock().last_submission.clone()
    }

    /// Record an answer. Validity is only enforced when moving forward.
    pub fn answer(&self, question_id: QuestionId, answer: RawAnswer) -> Result<SessionView, SessionError> {
        if self.schema.by_id(&question_id).is_none() {
            return Err(SessionError::UnknownQuestion(question_id));
        }
        self.mutate(|state| {
            if matches!(
                state.navigator.state(),
                NavigatorState::Submitting | NavigatorState::Submitted
            ) {
                return Err(SessionError::Locked);
            }
            state.store.set(question_id, answer);
            Ok(())
        })
    }

    pub fn next(&self) -> Result<SessionView, SessionError> {
        self.mutate(|state| {
            state.navigator.next(&mut state.store)?;
            Ok(())
        })
    }

    pub fn prev(&self) -> Result<SessionView, SessionError> {
        self.mutate(|state| {
            state.navigator.prev(&mut state.store)?;
            Ok(())
        })
    }

    pub fn jump(&self, step: usize) -> Result<SessionView, SessionError> {
        self.mutate(|state| {
            state.navigator.jump(step, &mut state.store)?;
            Ok(())
        })
    }

    /// Abandon the attempt: empty answers, first question, no pending or stored draft.
    pub fn reset(&self) -> Result<SessionView, SessionError> {
        let mut state = self.lock();
        let SessionState {
            navigator,
            store,
            drafts,
            last_submission,
        } = &mut *state;
        navigator.reset(store)?;
        drafts.discard();
        *last_submission = None;
        info!(user = %self.user_id, "questionnaire reset");
        Ok(self.render(&state))
    }

    /// Re-validate, normalize and hand the profile to the gateway.
    ///
    /// A second call while one is awaiting the gateway fails with
    /// [`NavigationError::SubmissionInFlight`] and never reaches the gateway.
    pub async fn submit(&self) -> Result<SubmittedProfile, SessionError> {
        let payload = {
            let mut state = self.lock();
            let SessionState {
                navigator, store, ..
            } = &mut *state;
            navigator.begin_submit(store, &self.user_id, Utc::now())?
        };
        let mut in_flight = InFlight {
            session: self,
            armed: true,
        };

        info!(
            user = %self.user_id,
            dimensions = payload.normalized_profile.len(),
            "submitting questionnaire profile"
        );
        let outcome = self.gateway.submit(&payload).await;
        in_flight.armed = false;

        let mut state = self.lock();
        let SessionState {
            navigator,
            store,
            drafts,
            last_submission,
        } = &mut *state;

        match outcome {
            Ok(receipt) => {
                navigator.finish_submit(true, store);
                drafts.discard();
                let submitted = SubmittedProfile { payload, receipt };
                *last_submission = Some(submitted.clone());
                info!(user = %self.user_id, "questionnaire submitted");
                Ok(submitted)
            }
            Err(err) => {
                navigator.finish_submit(false, store);
                warn!(user = %self.user_id, error = %err, "questionnaire submission failed");
                Err(err.into())
            }
        }
    }

    /// Write the pending draft if its quiet period has elapsed at `now`.
    pub fn flush_due(&self, now: Instant) -> bool {
        let mut state = self.lock();
        match state.drafts.flush_due(now) {
            Some(saved_at) => {
                state.store.mark_saved(saved_at);
                true
            }
            None => false,
        }
    }

    /// Write the pending draft immediately (shutdown, explicit "save").
    pub fn flush(&self) -> bool {
        let mut state = self.lock();
        match state.drafts.flush() {
            Some(saved_at) => {
                state.store.mark_saved(saved_at);
                true
            }
            None => false,
        }
    }

    pub fn has_pending_draft(&self) -> bool {
        self.lock().drafts.has_pending()
    }

    /// Drop a scheduled draft write, e.g. when the user navigates away.
    pub fn cancel_pending_draft(&self) {
        self.lock().drafts.cancel_pending();
    }

    fn mutate<F>(&self, apply: F) -> Result<SessionView, SessionError>
    where
        F: FnOnce(&mut SessionState) -> Result<(), SessionError>,
    {
        let mut state = self.lock();
        apply(&mut *state)?;
        let SessionState { store, drafts, .. } = &mut *state;
        drafts.save(store, Instant::now());
        Ok(self.render(&state))
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().expect("questionnaire session mutex poisoned")
    }

    fn render(&self, state: &SessionState) -> SessionView {
        let navigator_state = state.navigator.state();
        let total_steps = self.schema.len();
        let current_question = state.navigator.current_question().cloned();
        let current_answer = current_question
            .as_ref()
            .and_then(|question| state.store.get(&question.id).cloned());
        let current_issue = match (&current_question, &current_answer) {
            (Some(question), Some(answer)) => validate(question, answer).err().map(|err| err.to_string()),
            _ => None,
        };
        let answered = state.store.answered_count();

        SessionView {
            user_id: self.user_id.clone(),
            state: navigator_state.label(),
            step: state.store.current_step(),
            total_steps,
            furthest_step: state.navigator.furthest_step(),
            answered,
            progress: answered as f64 / total_steps as f64,
            current_question,
            current_answer,
            current_issue,
            submission_in_flight: navigator_state == NavigatorState::Submitting,
            last_saved_at: state.store.last_saved_at(),
            submitted_profile: state
                .last_submission
                .as_ref()
                .map(|submitted| submitted.payload.normalized_profile.clone()),
        }
    }
}

/// Returns the navigator to review if a submit future is dropped mid-flight.
struct InFlight<'a> {
    session: &'a QuestionnaireSession,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut state) = self.session.inner.lock() {
            let SessionState {
                navigator, store, ..
            } = &mut *state;
            navigator.finish_submit(false, store);
            warn!(user = %self.session.user_id, "questionnaire submission abandoned");
        }
    }
}
