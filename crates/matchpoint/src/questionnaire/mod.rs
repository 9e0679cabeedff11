//! Athlete onboarding questionnaire: schema, answer validation, step navigation,
//! debounced draft persistence, profile normalization and hand-off to the
//! matching service.
//!
//! The engine is split so that every stateful piece takes its collaborators
//! explicitly. [`Navigator`] operates on an [`AnswerStore`] passed in by the
//! caller, [`DraftPersistence`] is driven by caller-supplied instants, and the
//! [`QuestionnaireSession`] facade is the only place that ties them together.

pub mod domain;
pub mod draft;
pub mod navigator;
pub mod normalize;
pub mod router;
pub mod schema;
pub mod service;
pub mod session;
pub mod store;
pub mod submission;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    AnswerKind, Dimension, MultiChoiceScoring, QuestionDefinition, QuestionId, RawAnswer, UserId,
};
pub use draft::{
    DebounceScheduler, DraftPersistence, DraftSlot, DraftSlotError, DraftSlotFactory,
    FileDraftSlot, FileDraftSlotFactory, MemoryDraftSlot, DEFAULT_QUIET_PERIOD, DRAFT_KEY,
};
pub use navigator::{NavigationError, Navigator, NavigatorState};
pub use normalize::{
    contextual_answers, normalize, normalize_with_trail, Contribution, NormalizedProfile,
    NEUTRAL_SCORE,
};
pub use router::questionnaire_router;
pub use schema::{QuestionSchema, SchemaIntegrityError};
pub use service::{QuestionnaireService, DEFAULT_SESSION_IDLE};
pub use session::{QuestionnaireSession, SessionError, SessionView, SubmittedProfile};
pub use store::AnswerStore;
pub use submission::{
    HttpMatchingGateway, SubmissionError, SubmissionGateway, SubmissionPayload, SubmissionReceipt,
};
pub use validation::{validate, validate_present, QuestionValidationError, ValidationError};
