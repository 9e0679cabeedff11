use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use super::domain::{AnswerKind, Dimension, MultiChoiceScoring, QuestionDefinition, QuestionId};
use super::validation::on_step_grid;

/// Raised while building a schema; the engine must not start with one of these.
#[derive(Debug, thiserror::Error)]
pub enum SchemaIntegrityError {
    #[error("questionnaire schema has no questions")]
    Empty,
    #[error("question id `{0}` is declared more than once")]
    DuplicateId(QuestionId),
    #[error("question `{0}` has an empty option set")]
    EmptyOptions(QuestionId),
    #[error("question `{id}` lists option `{option}` more than once")]
    DuplicateOption { id: QuestionId, option: String },
    #[error("slider `{id}` has invalid bounds (min {min}, max {max})")]
    InvalidSliderBounds { id: QuestionId, min: f64, max: f64 },
    #[error("slider `{id}` has non-positive step {step}")]
    InvalidSliderStep { id: QuestionId, step: f64 },
    #[error("slider `{id}` range {min}..{max} is not a whole number of {step} steps")]
    UnreachableSliderMax {
        id: QuestionId,
        min: f64,
        max: f64,
        step: f64,
    },
    #[error("ranked question `{id}` allows {max_rank_count} ranks but has {options} options")]
    InvalidRankCount {
        id: QuestionId,
        max_rank_count: usize,
        options: usize,
    },
    #[error("text question `{0}` cannot target scoring dimensions")]
    ScoredTextQuestion(QuestionId),
    #[error("question `{id}` references unknown option `{option}`")]
    UnknownOption { id: QuestionId, option: String },
    #[error("question `{id}` scores option `{option}` at {score}, outside [0, 1]")]
    OptionScoreOutOfRange {
        id: QuestionId,
        option: String,
        score: f64,
    },
    #[error("unable to read schema file: {0}")]
    Io(#[from] std::io::Error),
    #[error("schema file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Ordered, immutable question catalog.
#[derive(Debug, Clone)]
pub struct QuestionSchema {
    questions: Vec<QuestionDefinition>,
    positions: HashMap<QuestionId, usize>,
}

impl QuestionSchema {
    pub fn new(questions: Vec<QuestionDefinition>) -> Result<Self, SchemaIntegrityError> {
        if questions.is_empty() {
            return Err(SchemaIntegrityError::Empty);
        }

        let mut positions = HashMap::with_capacity(questions.len());
        for (index, question) in questions.iter().enumerate() {
            if positions.insert(question.id.clone(), index).is_some() {
                return Err(SchemaIntegrityError::DuplicateId(question.id.clone()));
            }
            check_question(question)?;
        }

        Ok(Self {
            questions,
            positions,
        })
    }

    /// Load a JSON array of question definitions.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SchemaIntegrityError> {
        let questions: Vec<QuestionDefinition> = serde_json::from_reader(reader)?;
        Self::new(questions)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SchemaIntegrityError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn all_questions(&self) -> &[QuestionDefinition] {
        &self.questions
    }

    pub fn by_id(&self, id: &QuestionId) -> Option<&QuestionDefinition> {
        self.position(id).map(|index| &self.questions[index])
    }

    pub fn position(&self, id: &QuestionId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn get(&self, step: usize) -> Option<&QuestionDefinition> {
        self.questions.get(step)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Every dimension any question can feed, sorted by name.
    pub fn dimensions(&self) -> BTreeSet<Dimension> {
        let mut dimensions = BTreeSet::new();
        for question in &self.questions {
            dimensions.extend(question.target_dimensions.iter().cloned());
            if let AnswerKind::RankedChoice {
                option_dimensions, ..
            } = &question.kind
            {
                for targets in option_dimensions.values() {
                    dimensions.extend(targets.iter().cloned());
                }
            }
        }
        dimensions
    }

    /// Categories in first-appearance order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.questions
            .iter()
            .map(|question| question.category.as_str())
            .filter(|category| seen.insert(*category))
            .collect()
    }
}

fn check_question(question: &QuestionDefinition) -> Result<(), SchemaIntegrityError> {
    let id = &question.id;
    match &question.kind {
        AnswerKind::Text => {
            if !question.target_dimensions.is_empty() {
                return Err(SchemaIntegrityError::ScoredTextQuestion(id.clone()));
            }
        }
        AnswerKind::SingleChoice {
            options,
            option_scores,
        } => {
            check_options(id, options)?;
            for (option, score) in option_scores {
                require_option(id, options, option)?;
                if !score.is_finite() || !(0.0..=1.0).contains(score) {
                    return Err(SchemaIntegrityError::OptionScoreOutOfRange {
                        id: id.clone(),
                        option: option.clone(),
                        score: *score,
                    });
                }
            }
        }
        AnswerKind::MultiChoice { options, scoring } => {
            check_options(id, options)?;
            if let MultiChoiceScoring::PositiveShare { positive } = scoring {
                for option in positive {
                    require_option(id, options, option)?;
                }
            }
        }
        AnswerKind::NumericSlider { min, max, step } => {
            if !min.is_finite() || !max.is_finite() || min >= max {
                return Err(SchemaIntegrityError::InvalidSliderBounds {
                    id: id.clone(),
                    min: *min,
                    max: *max,
                });
            }
            if !step.is_finite() || *step <= 0.0 {
                return Err(SchemaIntegrityError::InvalidSliderStep {
                    id: id.clone(),
                    step: *step,
                });
            }
            if !on_step_grid(max - min, *step) {
                return Err(SchemaIntegrityError::UnreachableSliderMax {
                    id: id.clone(),
                    min: *min,
                    max: *max,
                    step: *step,
                });
            }
        }
        AnswerKind::RankedChoice {
            options,
            max_rank_count,
            option_dimensions,
        } => {
            check_options(id, options)?;
            if *max_rank_count == 0 || *max_rank_count > options.len() {
                return Err(SchemaIntegrityError::InvalidRankCount {
                    id: id.clone(),
                    max_rank_count: *max_rank_count,
                    options: options.len(),
                });
            }
            for option in option_dimensions.keys() {
                require_option(id, options, option)?;
            }
        }
    }
    Ok(())
}

fn check_options(id: &QuestionId, options: &[String]) -> Result<(), SchemaIntegrityError> {
    if options.is_empty() {
        return Err(SchemaIntegrityError::EmptyOptions(id.clone()));
    }
    let mut seen = HashSet::with_capacity(options.len());
    for option in options {
        if !seen.insert(option.as_str()) {
            return Err(SchemaIntegrityError::DuplicateOption {
                id: id.clone(),
                option: option.clone(),
            });
        }
    }
    Ok(())
}

fn require_option(
    id: &QuestionId,
    options: &[String],
    option: &str,
) -> Result<(), SchemaIntegrityError> {
    if options.iter().any(|candidate| candidate == option) {
        Ok(())
    } else {
        Err(SchemaIntegrityError::UnknownOption {
            id: id.clone(),
            option: option.to_string(),
        })
    }
}

fn question(
    id: &str,
    category: &str,
    prompt: &str,
    kind: AnswerKind,
    targets: &[&str],
) -> QuestionDefinition {
    QuestionDefinition {
        id: QuestionId::new(id),
        category: category.to_string(),
        prompt: prompt.to_string(),
        kind,
        target_dimensions: targets.iter().map(|name| Dimension::new(*name)).collect(),
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl QuestionSchema {
    /// The athlete questionnaire used by the matching product.
    pub fn standard() -> Self {
        let questions = vec![
            question(
                "school",
                "Account",
                "Which school do you compete for?",
                AnswerKind::Text,
                &[],
            ),
            question(
                "sport",
                "Account",
                "What is your primary sport?",
                AnswerKind::SingleChoice {
                    options: strings(&[
                        "basketball",
                        "football",
                        "soccer",
                        "volleyball",
                        "track_and_field",
                        "swimming",
                        "other",
                    ]),
                    option_scores: BTreeMap::new(),
                },
                &[],
            ),
            question(
                "posting_frequency",
                "Content",
                "How often do you post on social media?",
                AnswerKind::SingleChoice {
                    options: strings(&["daily", "few_per_week", "weekly", "monthly"]),
                    option_scores: BTreeMap::from([
                        ("daily".to_string(), 1.0),
                        ("few_per_week".to_string(), 0.75),
                        ("weekly".to_string(), 0.5),
                        ("monthly".to_string(), 0.25),
                    ]),
                },
                &["contentConsistency"],
            ),
            question(
                "weekly_content_hours",
                "Content",
                "How many hours per week do you spend creating content?",
                AnswerKind::NumericSlider {
                    min: 0.0,
                    max: 20.0,
                    step: 1.0,
                },
                &["contentConsistency"],
            ),
            question(
                "content_formats",
                "Content",
                "Which content formats do you produce?",
                AnswerKind::MultiChoice {
                    options: strings(&[
                        "short_video",
                        "long_video",
                        "photo",
                        "stories",
                        "live",
                        "written",
                    ]),
                    scoring: MultiChoiceScoring::Breadth,
                },
                &["contentVersatility"],
            ),
            question(
                "audience_replies",
                "Audience",
                "What share of comments and messages do you personally answer?",
                AnswerKind::NumericSlider {
                    min: 0.0,
                    max: 100.0,
                    step: 10.0,
                },
                &["engagementAuthenticity"],
            ),
            question(
                "partnership_styles",
                "Partnerships",
                "Which partnership styles interest you?",
                AnswerKind::MultiChoice {
                    options: strings(&[
                        "long_term_ambassador",
                        "community_events",
                        "product_collab",
                        "one_off_post",
                        "appearance_fee",
                    ]),
                    scoring: MultiChoiceScoring::PositiveShare {
                        positive: BTreeSet::from([
                            "long_term_ambassador".to_string(),
                            "community_events".to_string(),
                            "product_collab".to_string(),
                        ]),
                    },
                },
                &["partnershipDepth", "engagementAuthenticity"],
            ),
            question(
                "brand_priorities",
                "Partnerships",
                "Rank what matters most in a brand partner.",
                AnswerKind::RankedChoice {
                    options: strings(&[
                        "local_roots",
                        "shared_values",
                        "compensation",
                        "exposure",
                        "product_quality",
                    ]),
                    max_rank_count: 3,
                    option_dimensions: BTreeMap::from([
                        (
                            "local_roots".to_string(),
                            vec![Dimension::new("communityAlignment")],
                        ),
                        (
                            "shared_values".to_string(),
                            vec![
                                Dimension::new("communityAlignment"),
                                Dimension::new("partnershipDepth"),
                            ],
                        ),
                    ]),
                },
                &["brandFit"],
            ),
            question(
                "local_business_interest",
                "Partnerships",
                "How interested are you in working with local businesses?",
                AnswerKind::NumericSlider {
                    min: 1.0,
                    max: 5.0,
                    step: 1.0,
                },
                &["communityAlignment"],
            ),
            question(
                "bio",
                "Profile",
                "Tell partners about yourself.",
                AnswerKind::Text,
                &[],
            ),
        ];

        debug_assert!(questions.iter().all(|question| check_question(question).is_ok()));
        let positions = questions
            .iter()
            .enumerate()
            .map(|(index, question)| (question.id.clone(), index))
            .collect();
        Self {
            questions,
            positions,
        }
    }
}
