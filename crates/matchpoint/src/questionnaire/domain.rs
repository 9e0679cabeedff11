use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable key of a question within a schema.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named scoring axis consumed by the matching service (e.g. `engagementAuthenticity`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dimension(pub String);

impl Dimension {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier handed to the engine by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a multi-choice selection turns into a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum MultiChoiceScoring {
    /// `|selected| / |options|`
    #[default]
    Breadth,
    /// Share of the chosen options that belong to `positive`.
    PositiveShare { positive: BTreeSet<String> },
}

/// Answer type plus the constraints that apply to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerKind {
    Text,
    SingleChoice {
        options: Vec<String>,
        /// Explicit option scalars; options without an entry score `1.0`.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        option_scores: BTreeMap<String, f64>,
    },
    MultiChoice {
        options: Vec<String>,
        #[serde(default)]
        scoring: MultiChoiceScoring,
    },
    NumericSlider {
        min: f64,
        max: f64,
        step: f64,
    },
    RankedChoice {
        options: Vec<String>,
        max_rank_count: usize,
        /// Dimensions tied to a specific option; others fall back to the question targets.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        option_dimensions: BTreeMap<String, Vec<Dimension>>,
    },
}

impl AnswerKind {
    pub const fn label(&self) -> &'static str {
        match self {
            AnswerKind::Text => "text",
            AnswerKind::SingleChoice { .. } => "single_choice",
            AnswerKind::MultiChoice { .. } => "multi_choice",
            AnswerKind::NumericSlider { .. } => "numeric_slider",
            AnswerKind::RankedChoice { .. } => "ranked_choice",
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            AnswerKind::SingleChoice { options, .. }
            | AnswerKind::MultiChoice { options, .. }
            | AnswerKind::RankedChoice { options, .. } => options,
            AnswerKind::Text | AnswerKind::NumericSlider { .. } => &[],
        }
    }
}

/// Static description of one questionnaire item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub id: QuestionId,
    pub category: String,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: AnswerKind,
    #[serde(default)]
    pub target_dimensions: Vec<Dimension>,
}

impl QuestionDefinition {
    /// True when the question only carries context (school, sport, bio).
    pub fn is_contextual(&self) -> bool {
        self.target_dimensions.is_empty()
    }
}

/// The value a user supplied for one question, shaped by its answer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RawAnswer {
    Text(String),
    SingleChoice(String),
    MultiChoice(Vec<String>),
    NumericSlider(f64),
    RankedChoice(Vec<String>),
}

impl RawAnswer {
    pub const fn label(&self) -> &'static str {
        match self {
            RawAnswer::Text(_) => "text",
            RawAnswer::SingleChoice(_) => "single_choice",
            RawAnswer::MultiChoice(_) => "multi_choice",
            RawAnswer::NumericSlider(_) => "numeric_slider",
            RawAnswer::RankedChoice(_) => "ranked_choice",
        }
    }
}
