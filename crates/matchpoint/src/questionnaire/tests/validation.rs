use super::common::*;

use crate::questionnaire::domain::{MultiChoiceScoring, RawAnswer};
use crate::questionnaire::validation::{validate, validate_present, ValidationError};

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn slider_accepts_values_on_the_step_grid() {
    let question = slider_question("replies", 0.0, 100.0, 5.0, &["engagement"]);

    for value in [0.0, 5.0, 50.0, 95.0, 100.0] {
        assert_eq!(validate(&question, &RawAnswer::NumericSlider(value)), Ok(()));
    }
}

#[test]
fn slider_rejects_values_off_the_grid_or_out_of_bounds() {
    let question = slider_question("replies", 0.0, 100.0, 5.0, &["engagement"]);

    assert!(matches!(
        validate(&question, &RawAnswer::NumericSlider(52.0)),
        Err(ValidationError::OffStep { .. })
    ));
    assert!(matches!(
        validate(&question, &RawAnswer::NumericSlider(105.0)),
        Err(ValidationError::OutOfRange { .. })
    ));
    assert!(matches!(
        validate(&question, &RawAnswer::NumericSlider(-5.0)),
        Err(ValidationError::OutOfRange { .. })
    ));
    assert_eq!(
        validate(&question, &RawAnswer::NumericSlider(f64::NAN)),
        Err(ValidationError::NotFinite)
    );
}

#[test]
fn slider_grid_tolerates_float_noise_for_fractional_steps() {
    let question = slider_question("rating", 0.0, 1.0, 0.1, &["quality"]);

    assert_eq!(validate(&question, &RawAnswer::NumericSlider(0.3)), Ok(()));
    assert_eq!(
        validate(&question, &RawAnswer::NumericSlider(0.1 + 0.2)),
        Ok(())
    );
    assert!(validate(&question, &RawAnswer::NumericSlider(0.35)).is_err());
}

#[test]
fn slider_grid_stays_strict_on_wide_ranges() {
    let question = slider_question("followers", 0.0, 1_000_000.0, 1.0, &["reach"]);

    for value in [500_000.5, 200_000.1, 999_999.99] {
        assert!(matches!(
            validate(&question, &RawAnswer::NumericSlider(value)),
            Err(ValidationError::OffStep { .. })
        ));
    }
    assert_eq!(
        validate(&question, &RawAnswer::NumericSlider(999_999.0)),
        Ok(())
    );
    assert_eq!(
        validate(&question, &RawAnswer::NumericSlider(1_000_000.0)),
        Ok(())
    );
}

#[test]
fn slider_grid_is_anchored_at_min() {
    let question = slider_question("interest", 1.0, 5.0, 2.0, &["community"]);

    assert_eq!(validate(&question, &RawAnswer::NumericSlider(3.0)), Ok(()));
    assert!(matches!(
        validate(&question, &RawAnswer::NumericSlider(4.0)),
        Err(ValidationError::OffStep { .. })
    ));
}

#[test]
fn multi_choice_requires_distinct_known_options() {
    let question = multi_choice_question(
        "formats",
        &["video", "photo", "live"],
        MultiChoiceScoring::Breadth,
        &["versatility"],
    );

    assert_eq!(
        validate(&question, &RawAnswer::MultiChoice(labels(&["video", "live"]))),
        Ok(())
    );
    assert_eq!(
        validate(&question, &RawAnswer::MultiChoice(Vec::new())),
        Err(ValidationError::EmptySelection)
    );
    assert_eq!(
        validate(&question, &RawAnswer::MultiChoice(labels(&["video", "video"]))),
        Err(ValidationError::DuplicateSelection("video".to_string()))
    );
    assert_eq!(
        validate(&question, &RawAnswer::MultiChoice(labels(&["podcast"]))),
        Err(ValidationError::UnknownOption("podcast".to_string()))
    );
}

#[test]
fn ranked_choice_enforces_rank_count_and_membership() {
    let question = ranked_question("priorities", &["A", "B", "C", "D"], 3, &["brandFit"]);

    assert_eq!(
        validate(&question, &RawAnswer::RankedChoice(labels(&["B", "A"]))),
        Ok(())
    );
    assert_eq!(
        validate(&question, &RawAnswer::RankedChoice(labels(&["A", "B", "C", "D"]))),
        Err(ValidationError::RankCount { max: 3, found: 4 })
    );
    assert_eq!(
        validate(&question, &RawAnswer::RankedChoice(Vec::new())),
        Err(ValidationError::RankCount { max: 3, found: 0 })
    );
    assert_eq!(
        validate(&question, &RawAnswer::RankedChoice(labels(&["A", "A"]))),
        Err(ValidationError::DuplicateSelection("A".to_string()))
    );
}

#[test]
fn text_and_single_choice_rules() {
    let text = text_question("school");
    assert_eq!(validate(&text, &RawAnswer::Text("  ".to_string())), Err(ValidationError::BlankText));
    assert_eq!(validate(&text, &RawAnswer::Text("Lakeside".to_string())), Ok(()));

    let single = single_choice_question("sport", &["soccer", "swimming"], &[]);
    assert_eq!(
        validate(&single, &RawAnswer::SingleChoice("soccer".to_string())),
        Ok(())
    );
    assert_eq!(
        validate(&single, &RawAnswer::SingleChoice("chess".to_string())),
        Err(ValidationError::UnknownOption("chess".to_string()))
    );
}

#[test]
fn answer_shape_must_match_question_type() {
    let question = slider_question("hours", 0.0, 10.0, 1.0, &["consistency"]);

    assert_eq!(
        validate(&question, &RawAnswer::Text("five".to_string())),
        Err(ValidationError::TypeMismatch {
            expected: "numeric_slider",
            found: "text",
        })
    );
}

#[test]
fn missing_answers_carry_the_question_id() {
    let question = text_question("bio");
    let error = validate_present(&question, None).expect_err("missing answer fails");

    assert_eq!(error.question_id, id("bio"));
    assert_eq!(error.reason, ValidationError::Missing);
    assert_eq!(error.to_string(), "question `bio`: an answer is required");
}
