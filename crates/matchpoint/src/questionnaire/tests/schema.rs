use std::collections::BTreeMap;

use super::common::*;

use crate::questionnaire::domain::{AnswerKind, Dimension};
use crate::questionnaire::schema::{QuestionSchema, SchemaIntegrityError};

#[test]
fn standard_schema_is_ordered_and_consistent() {
    let schema = QuestionSchema::standard();

    assert_eq!(schema.len(), 10);
    assert_eq!(schema.position(&id("school")), Some(0));
    assert_eq!(schema.position(&id("bio")), Some(9));
    assert_eq!(
        schema.categories(),
        vec!["Account", "Content", "Audience", "Partnerships", "Profile"]
    );
    assert!(schema.dimensions().contains(&Dimension::new("communityAlignment")));

    let rebuilt = QuestionSchema::new(schema.all_questions().to_vec());
    assert!(rebuilt.is_ok(), "standard schema passes integrity checks");
}

#[test]
fn empty_schemas_are_rejected() {
    assert!(matches!(
        QuestionSchema::new(Vec::new()),
        Err(SchemaIntegrityError::Empty)
    ));
}

#[test]
fn duplicate_question_ids_are_rejected() {
    let result = QuestionSchema::new(vec![text_question("bio"), text_question("bio")]);

    assert!(matches!(result, Err(SchemaIntegrityError::DuplicateId(ref dup)) if *dup == id("bio")));
}

#[test]
fn slider_bounds_and_step_are_checked() {
    assert!(matches!(
        QuestionSchema::new(vec![slider_question("hours", 10.0, 10.0, 1.0, &["d"])]),
        Err(SchemaIntegrityError::InvalidSliderBounds { .. })
    ));
    assert!(matches!(
        QuestionSchema::new(vec![slider_question("hours", 0.0, 10.0, 0.0, &["d"])]),
        Err(SchemaIntegrityError::InvalidSliderStep { .. })
    ));
    assert!(matches!(
        QuestionSchema::new(vec![slider_question("hours", 0.0, 10.0, 3.0, &["d"])]),
        Err(SchemaIntegrityError::UnreachableSliderMax { .. })
    ));
    assert!(QuestionSchema::new(vec![slider_question("rating", 0.0, 1.0, 0.1, &["d"])]).is_ok());
}

#[test]
fn choice_questions_need_distinct_options() {
    assert!(matches!(
        QuestionSchema::new(vec![single_choice_question("sport", &[], &[])]),
        Err(SchemaIntegrityError::EmptyOptions(_))
    ));
    assert!(matches!(
        QuestionSchema::new(vec![single_choice_question("sport", &["golf", "golf"], &[])]),
        Err(SchemaIntegrityError::DuplicateOption { .. })
    ));
}

#[test]
fn ranked_questions_cannot_rank_more_than_they_offer() {
    assert!(matches!(
        QuestionSchema::new(vec![ranked_question("priorities", &["A", "B"], 3, &["d"])]),
        Err(SchemaIntegrityError::InvalidRankCount { .. })
    ));
    assert!(matches!(
        QuestionSchema::new(vec![ranked_question("priorities", &["A", "B"], 0, &["d"])]),
        Err(SchemaIntegrityError::InvalidRankCount { .. })
    ));
}

#[test]
fn text_questions_cannot_be_scored() {
    let mut question = text_question("bio");
    question.target_dimensions = vec![Dimension::new("brandFit")];

    assert!(matches!(
        QuestionSchema::new(vec![question]),
        Err(SchemaIntegrityError::ScoredTextQuestion(_))
    ));
}

#[test]
fn option_scores_must_reference_known_options_within_unit_range() {
    let mut question = single_choice_question("cadence", &["daily", "weekly"], &["consistency"]);
    question.kind = AnswerKind::SingleChoice {
        options: vec!["daily".to_string(), "weekly".to_string()],
        option_scores: BTreeMap::from([("hourly".to_string(), 1.0)]),
    };
    assert!(matches!(
        QuestionSchema::new(vec![question.clone()]),
        Err(SchemaIntegrityError::UnknownOption { .. })
    ));

    question.kind = AnswerKind::SingleChoice {
        options: vec!["daily".to_string(), "weekly".to_string()],
        option_scores: BTreeMap::from([("daily".to_string(), 1.5)]),
    };
    assert!(matches!(
        QuestionSchema::new(vec![question]),
        Err(SchemaIntegrityError::OptionScoreOutOfRange { .. })
    ));
}

#[test]
fn schemas_load_from_json_documents() {
    let document = r#"[
        { "id": "school", "category": "Account", "prompt": "School?", "type": "text" },
        {
            "id": "audience_replies",
            "category": "Audience",
            "prompt": "Reply share?",
            "type": "numeric_slider",
            "min": 0, "max": 100, "step": 10,
            "target_dimensions": ["engagementAuthenticity"]
        }
    ]"#;

    let schema = QuestionSchema::from_reader(document.as_bytes()).expect("schema parses");

    assert_eq!(schema.len(), 2);
    assert!(matches!(
        schema.get(1).map(|question| &question.kind),
        Some(AnswerKind::NumericSlider { step, .. }) if *step == 10.0
    ));
    assert!(matches!(
        QuestionSchema::from_reader("{ not json".as_bytes()),
        Err(SchemaIntegrityError::Parse(_))
    ));
}
