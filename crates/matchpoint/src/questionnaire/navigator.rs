use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::domain::{QuestionDefinition, UserId};
use super::normalize::{contextual_answers, normalize};
use super::schema::QuestionSchema;
use super::store::AnswerStore;
use super::submission::SubmissionPayload;
use super::validation::{validate_present, QuestionValidationError};

/// Where the user currently is in the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum NavigatorState {
    AtQuestion(usize),
    Review,
    /// Review with a submission in flight.
    Submitting,
    Submitted,
}

impl NavigatorState {
    pub const fn label(self) -> &'static str {
        match self {
            NavigatorState::AtQuestion(_) => "at_question",
            NavigatorState::Review | NavigatorState::Submitting => "review",
            NavigatorState::Submitted => "submitted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavigationError {
    #[error(transparent)]
    Invalid(#[from] QuestionValidationError),
    #[error("already at the first question")]
    AtFirstQuestion,
    #[error("step {requested} has not been reached yet (furthest reachable step is {furthest})")]
    StepLocked { requested: usize, furthest: usize },
    #[error("step {requested} is outside a questionnaire of {len} questions")]
    OutOfRange { requested: usize, len: usize },
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("a submission is already in flight")]
    SubmissionInFlight,
}

/// Step state machine over an explicitly passed [`AnswerStore`].
#[derive(Debug, Clone)]
pub struct Navigator {
    schema: Arc<QuestionSchema>,
    state: NavigatorState,
    /// Highest step reached through validated progression; `len()` means review.
    furthest: usize,
}

impl Navigator {
    pub fn new(schema: Arc<QuestionSchema>) -> Self {
        Self {
            schema,
            state: NavigatorState::AtQuestion(0),
            furthest: 0,
        }
    }

    /// Resume from a restored store. Answers to unknown questions are dropped,
    /// and the saved step is clamped to what the stored answers actually unlock.
    pub fn restore(schema: Arc<QuestionSchema>, store: &mut AnswerStore) -> Self {
        let dropped = store.retain_answers(|id| schema.position(id).is_some());
        if dropped > 0 {
            debug!(dropped, "ignored draft answers for questions outside the schema");
        }

        let furthest = schema
            .all_questions()
            .iter()
            .take_while(|question| validate_present(question, store.get(&question.id)).is_ok())
            .count();
        let step = store.current_step().min(furthest);

        let mut navigator = Self {
            schema,
            state: NavigatorState::AtQuestion(0),
            furthest,
        };
        navigator.move_to(step, store);
        navigator
    }

    pub fn state(&self) -> NavigatorState {
        self.state
    }

    pub fn schema(&self) -> &Arc<QuestionSchema> {
        &self.schema
    }

    pub fn furthest_step(&self) -> usize {
        self.furthest
    }

    pub fn current_question(&self) -> Option<&QuestionDefinition> {
        match self.state {
            NavigatorState::AtQuestion(step) => self.schema.get(step),
            _ => None,
        }
    }

    /// Advance once the current answer validates.
    pub fn next(&mut self, store: &mut AnswerStore) -> Result<NavigatorState, NavigationError> {
        let step = match self.state {
            NavigatorState::AtQuestion(step) => step,
            other => return Err(self.refuse("advance", other)),
        };

        if let Some(question) = self.schema.get(step) {
            validate_present(question, store.get(&question.id))?;
        }

        let target = step + 1;
        self.furthest = self.furthest.max(target);
        self.move_to(target, store);
        Ok(self.state)
    }

    /// Step back without validating. From review this returns to the last question.
    pub fn prev(&mut self, store: &mut AnswerStore) -> Result<NavigatorState, NavigationError> {
        let target = match self.state {
            NavigatorState::AtQuestion(0) => return Err(NavigationError::AtFirstQuestion),
            NavigatorState::AtQuestion(step) => step - 1,
            NavigatorState::Review => self.schema.len() - 1,
            other => return Err(self.refuse("go back", other)),
        };
        self.move_to(target, store);
        Ok(self.state)
    }

    /// Move directly to `step`, which must already have been unlocked.
    pub fn jump(
        &mut self,
        step: usize,
        store: &mut AnswerStore,
    ) -> Result<NavigatorState, NavigationError> {
        if matches!(
            self.state,
            NavigatorState::Submitting | NavigatorState::Submitted
        ) {
            return Err(self.refuse("jump", self.state));
        }
        if step > self.schema.len() {
            return Err(NavigationError::OutOfRange {
                requested: step,
                len: self.schema.len(),
            });
        }
        if step > self.furthest {
            return Err(NavigationError::StepLocked {
                requested: step,
                furthest: self.furthest,
            });
        }
        self.move_to(step, store);
        Ok(self.state)
    }

    /// Re-validate every answer and build the payload. On success the navigator
    /// holds in `Submitting` until [`Navigator::finish_submit`] is called.
    pub fn begin_submit(
        &mut self,
        store: &AnswerStore,
        user_id: &UserId,
        completed_at: DateTime<Utc>,
    ) -> Result<SubmissionPayload, NavigationError> {
        match self.state {
            NavigatorState::Review => {}
            NavigatorState::Submitting => return Err(NavigationError::SubmissionInFlight),
            other => return Err(self.refuse("submit", other)),
        }

        for question in self.schema.all_questions() {
            validate_present(question, store.get(&question.id))?;
        }

        let payload = SubmissionPayload {
            user_id: user_id.clone(),
            raw_answers: store.answers().clone(),
            normalized_profile: normalize(&self.schema, store),
            contextual: contextual_answers(&self.schema, store),
            completed_at,
        };
        self.state = NavigatorState::Submitting;
        Ok(payload)
    }

    /// Settle an in-flight submission. Accepted submissions end the attempt and
    /// empty the store; rejected ones return to review with answers intact.
    pub fn finish_submit(&mut self, accepted: bool, store: &mut AnswerStore) {
        if self.state != NavigatorState::Submitting {
            return;
        }
        if accepted {
            store.clear();
            self.state = NavigatorState::Submitted;
        } else {
            self.state = NavigatorState::Review;
        }
    }

    /// Start a new attempt from the first question with an empty store.
    pub fn reset(&mut self, store: &mut AnswerStore) -> Result<(), NavigationError> {
        if self.state == NavigatorState::Submitting {
            return Err(NavigationError::SubmissionInFlight);
        }
        store.clear();
        self.furthest = 0;
        self.state = NavigatorState::AtQuestion(0);
        Ok(())
    }

    fn move_to(&mut self, step: usize, store: &mut AnswerStore) {
        self.state = if step >= self.schema.len() {
            NavigatorState::Review
        } else {
            NavigatorState::AtQuestion(step)
        };
        store.set_current_step(step.min(self.schema.len()));
    }

    fn refuse(&self, action: &'static str, state: NavigatorState) -> NavigationError {
        if state == NavigatorState::Submitting {
            return NavigationError::SubmissionInFlight;
        }
        NavigationError::InvalidTransition {
            action,
            state: state.label(),
        }
    }
}
