mod rules;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Dimension, QuestionId};
use super::schema::QuestionSchema;
use super::store::AnswerStore;

/// Value reported for a dimension no answered question fed.
pub const NEUTRAL_SCORE: f64 = 0.0;

/// Dimension → scalar in `[0, 1]`, as handed to the matching service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedProfile {
    values: BTreeMap<Dimension, f64>,
}

impl NormalizedProfile {
    pub fn get(&self, dimension: &Dimension) -> Option<f64> {
        self.values.get(dimension).copied()
    }

    /// Convenience lookup by dimension name.
    pub fn score(&self, name: &str) -> Option<f64> {
        self.get(&Dimension::new(name))
    }

    pub fn values(&self) -> &BTreeMap<Dimension, f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One question's scalar landing on one dimension, kept for audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub question_id: QuestionId,
    pub dimension: Dimension,
    pub score: f64,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    weight: u32,
}

impl Accumulator {
    fn add(&mut self, score: f64) {
        self.sum += score;
        self.weight += 1;
    }

    fn mean(self) -> f64 {
        if self.weight == 0 {
            NEUTRAL_SCORE
        } else {
            self.sum / f64::from(self.weight)
        }
    }
}

/// Mean contribution per dimension across every answered question that feeds it.
pub fn normalize(schema: &QuestionSchema, store: &AnswerStore) -> NormalizedProfile {
    normalize_with_trail(schema, store).0
}

/// [`normalize`] plus the individual contributions in schema order.
pub fn normalize_with_trail(
    schema: &QuestionSchema,
    store: &AnswerStore,
) -> (NormalizedProfile, Vec<Contribution>) {
    let mut accumulators: BTreeMap<Dimension, Accumulator> = schema
        .dimensions()
        .into_iter()
        .map(|dimension| (dimension, Accumulator::default()))
        .collect();
    let mut trail = Vec::new();

    for question in schema.all_questions() {
        let Some(answer) = store.get(&question.id) else {
            continue;
        };

        for contribution in rules::contributions(question, answer) {
            accumulators
                .entry(contribution.dimension.clone())
                .or_default()
                .add(contribution.score);
            trail.push(contribution);
        }
    }

    let values = accumulators
        .into_iter()
        .map(|(dimension, accumulator)| (dimension, accumulator.mean()))
        .collect();

    (NormalizedProfile { values }, trail)
}

/// Answers to questions that feed no dimension, forwarded as context.
pub fn contextual_answers(
    schema: &QuestionSchema,
    store: &AnswerStore,
) -> BTreeMap<QuestionId, super::domain::RawAnswer> {
    schema
        .all_questions()
        .iter()
        .filter(|question| question.is_contextual())
        .filter_map(|question| {
            store
                .get(&question.id)
                .map(|answer| (question.id.clone(), answer.clone()))
        })
        .collect()
}
