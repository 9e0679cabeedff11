use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{QuestionId, RawAnswer};

/// Answers collected during one questionnaire attempt.
///
/// The same shape is written to the draft slot, so field names follow the
/// slot's camelCase layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnswerStore {
    answers: BTreeMap<QuestionId, RawAnswer>,
    current_step: usize,
    last_saved_at: Option<DateTime<Utc>>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &QuestionId) -> Option<&RawAnswer> {
        self.answers.get(id)
    }

    /// Record an answer, returning the one it replaced.
    pub fn set(&mut self, id: QuestionId, answer: RawAnswer) -> Option<RawAnswer> {
        self.answers.insert(id, answer)
    }

    pub fn remove(&mut self, id: &QuestionId) -> Option<RawAnswer> {
        self.answers.remove(id)
    }

    pub fn answers(&self) -> &BTreeMap<QuestionId, RawAnswer> {
        &self.answers
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub(crate) fn set_current_step(&mut self, step: usize) {
        self.current_step = step;
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    pub fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.last_saved_at = Some(at);
    }

    /// Drop answers whose ids fail `keep`; used when a draft outlives a schema change.
    pub(crate) fn retain_answers<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&QuestionId) -> bool,
    {
        let before = self.answers.len();
        self.answers.retain(|id, _| keep(id));
        before - self.answers.len()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
