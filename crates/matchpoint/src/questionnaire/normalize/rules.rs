use super::super::domain::{AnswerKind, Dimension, MultiChoiceScoring, QuestionDefinition, RawAnswer};
use super::Contribution;

/// Per-question scalars in `[0, 1]`, each tied to the dimensions it feeds.
pub(crate) fn contributions(question: &QuestionDefinition, answer: &RawAnswer) -> Vec<Contribution> {
    if question.is_contextual() && !has_option_dimensions(question) {
        return Vec::new();
    }

    match (&question.kind, answer) {
        (AnswerKind::NumericSlider { min, max, .. }, RawAnswer::NumericSlider(value)) => {
            let score = clamp_unit((value - min) / (max - min));
            fan_out(
                question,
                &question.target_dimensions,
                score,
                format!("slider {value} on [{min}, {max}]"),
            )
        }
        (AnswerKind::SingleChoice { option_scores, .. }, RawAnswer::SingleChoice(value)) => {
            let (score, notes) = match option_scores.get(value) {
                Some(score) => (*score, format!("option `{value}` scored {score:.2}")),
                None => (1.0, format!("option `{value}` selected")),
            };
            fan_out(question, &question.target_dimensions, score, notes)
        }
        (AnswerKind::MultiChoice { options, scoring }, RawAnswer::MultiChoice(selected)) => {
            let (score, notes) = multi_choice_score(options, scoring, selected);
            fan_out(question, &question.target_dimensions, score, notes)
        }
        (
            AnswerKind::RankedChoice {
                max_rank_count,
                option_dimensions,
                ..
            },
            RawAnswer::RankedChoice(ranking),
        ) => ranking
            .iter()
            .take(*max_rank_count)
            .enumerate()
            .flat_map(|(index, option)| {
                let rank = index + 1;
                let score = (*max_rank_count - rank + 1) as f64 / *max_rank_count as f64;
                let targets = option_dimensions
                    .get(option)
                    .unwrap_or(&question.target_dimensions);
                fan_out(
                    question,
                    targets,
                    score,
                    format!("`{option}` ranked #{rank} of {max_rank_count}"),
                )
            })
            .collect(),
        // Text never scores; mismatched shapes are rejected before normalization.
        _ => Vec::new(),
    }
}

fn multi_choice_score(
    options: &[String],
    scoring: &MultiChoiceScoring,
    selected: &[String],
) -> (f64, String) {
    match scoring {
        MultiChoiceScoring::Breadth => {
            let score = if options.is_empty() {
                0.0
            } else {
                selected.len() as f64 / options.len() as f64
            };
            (
                clamp_unit(score),
                format!("{} of {} options selected", selected.len(), options.len()),
            )
        }
        MultiChoiceScoring::PositiveShare { positive } => {
            let hits = selected
                .iter()
                .filter(|option| positive.contains(option.as_str()))
                .count();
            let score = if selected.is_empty() {
                0.0
            } else {
                hits as f64 / selected.len() as f64
            };
            (
                clamp_unit(score),
                format!("{hits} of {} selections are positive", selected.len()),
            )
        }
    }
}

fn fan_out(
    question: &QuestionDefinition,
    targets: &[Dimension],
    score: f64,
    notes: String,
) -> Vec<Contribution> {
    targets
        .iter()
        .map(|dimension| Contribution {
            question_id: question.id.clone(),
            dimension: dimension.clone(),
            score,
            notes: notes.clone(),
        })
        .collect()
}

fn has_option_dimensions(question: &QuestionDefinition) -> bool {
    matches!(
        &question.kind,
        AnswerKind::RankedChoice { option_dimensions, .. } if !option_dimensions.is_empty()
    )
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
