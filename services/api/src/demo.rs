use crate::infra::InMemorySubmissionGateway;
use clap::Args;
use matchpoint::error::AppError;
use matchpoint::questionnaire::{
    normalize_with_trail, DraftPersistence, MemoryDraftSlot, QuestionId, QuestionSchema,
    QuestionnaireSession, RawAnswer, SessionError, UserId, DEFAULT_QUIET_PERIOD,
};
use std::sync::Arc;
use std::time::Instant;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Identity used for the scripted athlete.
    #[arg(long, default_value = "demo-athlete")]
    pub(crate) user: String,
    /// Print every per-question contribution behind the normalized profile.
    #[arg(long)]
    pub(crate) show_trail: bool,
    /// Stop after the first half of the questionnaire to show draft resumption.
    #[arg(long)]
    pub(crate) skip_resume: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let schema = Arc::new(QuestionSchema::standard());
    let slot = Arc::new(MemoryDraftSlot::default());
    let gateway = InMemorySubmissionGateway::default();
    let user = UserId(args.user.clone());
    let answers = scripted_answers();
    let split = answers.len() / 2;

    println!("Athlete questionnaire demo");
    println!(
        "Schema: {} questions across {}",
        schema.len(),
        schema.categories().join(", ")
    );

    let session = open_session(&schema, &slot, &gateway, &user);

    println!("\nFirst sitting");
    let (first, rest) = answers.split_at(split);
    answer_all(&session, first)?;
    if let Err(err) = session.answer(
        QuestionId::new("audience_replies"),
        RawAnswer::NumericSlider(55.0),
    ) {
        println!("  Unexpected answer failure: {}", err);
    }
    match session.next() {
        Err(SessionError::Navigation(err)) => println!("  Blocked: {}", err),
        Err(err) => println!("  Unexpected failure: {}", err),
        Ok(_) => println!("  Off-grid slider value was accepted"),
    }
    session.flush_due(Instant::now() + DEFAULT_QUIET_PERIOD);
    println!(
        "  Draft saved after {} answers ({} slot writes)",
        session.view().answered,
        slot.write_count()
    );

    if args.skip_resume {
        println!("\nStopping before resumption; the draft stays in the slot.");
        return Ok(());
    }
    drop(session);

    println!("\nSecond sitting (resumed from draft)");
    let session = open_session(&schema, &slot, &gateway, &user);
    let view = session.view();
    println!(
        "  Resumed at step {} of {} ({:.0}% answered)",
        view.step + 1,
        view.total_steps,
        view.progress * 100.0
    );
    answer_all(&session, rest)?;

    let store = session.store_snapshot();
    let (_, trail) = normalize_with_trail(&schema, &store);

    let submitted = session.submit().await?;
    println!("\nSubmission");
    println!(
        "  Reference: {}",
        submitted.receipt.reference.as_deref().unwrap_or("none")
    );
    println!("  Completed at: {}", submitted.payload.completed_at.to_rfc3339());
    println!(
        "  Profiles held by the local gateway: {}",
        gateway.submissions().len()
    );

    println!("\nNormalized profile");
    for (dimension, score) in submitted.payload.normalized_profile.values() {
        println!("  {:<24} {:.3}", dimension.as_str(), score);
    }

    println!("\nContext forwarded unscored");
    for (question_id, answer) in &submitted.payload.contextual {
        println!("  {}: {}", question_id, describe(answer));
    }

    if args.show_trail {
        println!("\nContribution trail");
        for contribution in &trail {
            println!(
                "  {:<24} {:<24} {:.3}  {}",
                contribution.question_id.as_str(),
                contribution.dimension.as_str(),
                contribution.score,
                contribution.notes
            );
        }
    }

    Ok(())
}

fn open_session(
    schema: &Arc<QuestionSchema>,
    slot: &Arc<MemoryDraftSlot>,
    gateway: &InMemorySubmissionGateway,
    user: &UserId,
) -> QuestionnaireSession {
    QuestionnaireSession::start(
        user.clone(),
        schema.clone(),
        DraftPersistence::new(Box::new(slot.clone()), DEFAULT_QUIET_PERIOD),
        Arc::new(gateway.clone()),
    )
}

fn answer_all(
    session: &QuestionnaireSession,
    answers: &[(QuestionId, RawAnswer)],
) -> Result<(), SessionError> {
    for (question_id, answer) in answers {
        let view = session.answer(question_id.clone(), answer.clone())?;
        let prompt = view
            .current_question
            .map(|question| question.prompt)
            .unwrap_or_default();
        session.next()?;
        println!("  {} -> {}", prompt, describe(answer));
    }
    Ok(())
}

fn describe(answer: &RawAnswer) -> String {
    match answer {
        RawAnswer::Text(text) | RawAnswer::SingleChoice(text) => text.clone(),
        RawAnswer::MultiChoice(values) => values.join(", "),
        RawAnswer::RankedChoice(values) => values
            .iter()
            .enumerate()
            .map(|(index, value)| format!("{}. {}", index + 1, value))
            .collect::<Vec<_>>()
            .join("  "),
        RawAnswer::NumericSlider(value) => format!("{value}"),
    }
}

fn scripted_answers() -> Vec<(QuestionId, RawAnswer)> {
    let labels = |values: &[&str]| -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    };
    vec![
        (
            QuestionId::new("school"),
            RawAnswer::Text("Lakeside State University".to_string()),
        ),
        (
            QuestionId::new("sport"),
            RawAnswer::SingleChoice("basketball".to_string()),
        ),
        (
            QuestionId::new("posting_frequency"),
            RawAnswer::SingleChoice("few_per_week".to_string()),
        ),
        (
            QuestionId::new("weekly_content_hours"),
            RawAnswer::NumericSlider(6.0),
        ),
        (
            QuestionId::new("content_formats"),
            RawAnswer::MultiChoice(labels(&["short_video", "photo", "live"])),
        ),
        (
            QuestionId::new("audience_replies"),
            RawAnswer::NumericSlider(70.0),
        ),
        (
            QuestionId::new("partnership_styles"),
            RawAnswer::MultiChoice(labels(&["community_events", "appearance_fee"])),
        ),
        (
            QuestionId::new("brand_priorities"),
            RawAnswer::RankedChoice(labels(&["local_roots", "shared_values", "exposure"])),
        ),
        (
            QuestionId::new("local_business_interest"),
            RawAnswer::NumericSlider(5.0),
        ),
        (
            QuestionId::new("bio"),
            RawAnswer::Text("Point guard who runs a summer camp in my hometown.".to_string()),
        ),
    ]
}
