use std::sync::Arc;
use std::time::{Duration, Instant};

use super::common::*;

use crate::questionnaire::domain::RawAnswer;
use crate::questionnaire::draft::{
    DraftPersistence, DraftSlot, DraftSlotError, FileDraftSlot, MemoryDraftSlot,
};
use crate::questionnaire::store::AnswerStore;

fn every_shape() -> AnswerStore {
    let mut store = AnswerStore::new();
    store.set(id("school"), RawAnswer::Text("Lakeside \"Lakers\" State".to_string()));
    store.set(id("sport"), RawAnswer::SingleChoice("volleyball".to_string()));
    store.set(
        id("content_formats"),
        RawAnswer::MultiChoice(vec!["photo".to_string(), "live".to_string()]),
    );
    store.set(id("audience_replies"), RawAnswer::NumericSlider(0.1 + 0.2));
    store.set(
        id("brand_priorities"),
        RawAnswer::RankedChoice(vec!["shared_values".to_string(), "local_roots".to_string()]),
    );
    store.set_current_step(4);
    store
}

#[test]
fn flushed_drafts_round_trip_every_answer_shape() {
    let slot = Arc::new(MemoryDraftSlot::default());
    let mut drafts = drafts_over(&slot);
    let store = every_shape();

    drafts.save(&store, Instant::now());
    let saved_at = drafts.flush().expect("pending draft is written");

    let restored = drafts.load().expect("draft is readable");
    assert_eq!(restored.answers(), store.answers());
    assert_eq!(restored.current_step(), 4);
    assert_eq!(restored.last_saved_at(), Some(saved_at));
}

#[test]
fn writes_wait_for_the_quiet_period() {
    let slot = Arc::new(MemoryDraftSlot::default());
    let mut drafts = drafts_over(&slot);
    let start = Instant::now();

    drafts.save(&every_shape(), start);

    assert!(drafts.flush_due(start + Duration::from_millis(499)).is_none());
    assert_eq!(slot.write_count(), 0);
    assert!(drafts.flush_due(start + QUIET).is_some());
    assert_eq!(slot.write_count(), 1);
    assert!(!drafts.has_pending());
}

#[test]
fn rapid_saves_collapse_into_one_write_of_the_latest_state() {
    let slot = Arc::new(MemoryDraftSlot::default());
    let mut drafts = drafts_over(&slot);
    let start = Instant::now();
    let mut store = AnswerStore::new();

    for (offset, hours) in [0u64, 100, 200, 300].into_iter().zip([1.0, 2.0, 3.0, 4.0]) {
        store.set(id("hours"), RawAnswer::NumericSlider(hours));
        drafts.save(&store, start + Duration::from_millis(offset));
    }

    // The quiet period restarts with each save.
    assert!(drafts.flush_due(start + Duration::from_millis(600)).is_none());
    assert!(drafts.flush_due(start + Duration::from_millis(800)).is_some());
    assert_eq!(slot.write_count(), 1);

    let restored = drafts.load().expect("draft");
    assert_eq!(
        restored.get(&id("hours")),
        Some(&RawAnswer::NumericSlider(4.0))
    );
}

#[test]
fn cancelled_writes_never_reach_the_slot() {
    let slot = Arc::new(MemoryDraftSlot::default());
    let mut drafts = drafts_over(&slot);
    let start = Instant::now();

    drafts.save(&every_shape(), start);
    drafts.cancel_pending();
    drafts.cancel_pending();

    assert!(drafts.flush_due(start + QUIET * 2).is_none());
    assert_eq!(slot.write_count(), 0);
}

#[test]
fn discard_drops_pending_and_stored_drafts() {
    let slot = Arc::new(MemoryDraftSlot::default());
    let mut drafts = drafts_over(&slot);

    drafts.save(&every_shape(), Instant::now());
    drafts.flush();
    drafts.save(&AnswerStore::new(), Instant::now());
    drafts.discard();

    assert!(!drafts.has_pending());
    assert!(slot.contents().is_none());
    assert!(drafts.load().is_none());
}

#[test]
fn unreadable_drafts_load_as_absent() {
    for contents in [
        "",
        "{\"answers\":{\"school\":{\"type\":\"text\"",
        "not json at all",
        "[1, 2, 3]",
        "{\"answers\":{},\"currentStep\":0,\"legacyFlag\":true}",
        "{\"answers\":{\"hours\":{\"type\":\"stopwatch\",\"value\":3}}}",
    ] {
        let slot = Arc::new(MemoryDraftSlot::with_contents(contents));
        let drafts = drafts_over(&slot);
        assert!(drafts.load().is_none(), "{contents:?} should not load");
    }
}

#[test]
fn draft_layout_uses_camel_case_keys() {
    let slot = Arc::new(MemoryDraftSlot::default());
    let mut drafts = drafts_over(&slot);
    drafts.save(&every_shape(), Instant::now());
    drafts.flush();

    let raw: serde_json::Value =
        serde_json::from_str(&slot.contents().expect("written")).expect("json draft");
    assert_eq!(raw["currentStep"], 4);
    assert!(raw["lastSavedAt"].is_string());
    assert_eq!(
        raw["answers"]["sport"],
        serde_json::json!({ "type": "single_choice", "value": "volleyball" })
    );
}

#[derive(Debug)]
struct BrokenSlot;

impl DraftSlot for BrokenSlot {
    fn read(&self) -> Result<Option<String>, DraftSlotError> {
        Err(DraftSlotError::Unavailable("storage quota exceeded".to_string()))
    }

    fn write(&self, _contents: &str) -> Result<(), DraftSlotError> {
        Err(DraftSlotError::Unavailable("storage quota exceeded".to_string()))
    }

    fn clear(&self) -> Result<(), DraftSlotError> {
        Err(DraftSlotError::Unavailable("storage quota exceeded".to_string()))
    }
}

#[test]
fn slot_failures_are_swallowed() {
    let mut drafts = DraftPersistence::new(Box::new(BrokenSlot), QUIET);

    drafts.save(&every_shape(), Instant::now());
    assert!(drafts.flush().is_none());
    assert!(drafts.load().is_none());
    drafts.discard();
}

#[test]
fn file_slot_survives_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = every_shape();

    {
        let mut drafts = DraftPersistence::new(Box::new(FileDraftSlot::in_directory(dir.path())), QUIET);
        drafts.save(&store, Instant::now());
        drafts.flush().expect("written to disk");
    }

    let drafts = DraftPersistence::new(Box::new(FileDraftSlot::in_directory(dir.path())), QUIET);
    let restored = drafts.load().expect("draft read back");
    assert_eq!(restored.answers(), store.answers());
}
