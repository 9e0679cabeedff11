//! Best-effort, debounced mirroring of the answer store into a durable slot.
//!
//! Every failure in this module is swallowed and logged: a broken slot must
//! never block the questionnaire, and an unreadable draft simply means the
//! user starts over.

mod debounce;
mod slot;

pub use debounce::DebounceScheduler;
pub use slot::{
    DraftSlot, DraftSlotError, DraftSlotFactory, FileDraftSlot, FileDraftSlotFactory,
    MemoryDraftSlot, DRAFT_KEY,
};

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::store::AnswerStore;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct DraftPersistence {
    slot: Box<dyn DraftSlot>,
    scheduler: DebounceScheduler<AnswerStore>,
}

impl DraftPersistence {
    pub fn new(slot: Box<dyn DraftSlot>, quiet_period: Duration) -> Self {
        Self {
            slot,
            scheduler: DebounceScheduler::new(quiet_period),
        }
    }

    /// Schedule a write of `store`, superseding any write still waiting.
    pub fn save(&mut self, store: &AnswerStore, now: Instant) {
        if self.scheduler.schedule(store.clone(), now) {
            debug!("superseded pending questionnaire draft write");
        }
    }

    /// Write the pending snapshot if its quiet period has elapsed.
    /// Returns the save timestamp when something was written.
    pub fn flush_due(&mut self, now: Instant) -> Option<DateTime<Utc>> {
        let snapshot = self.scheduler.take_due(now)?;
        self.write(snapshot)
    }

    /// Write the pending snapshot immediately.
    pub fn flush(&mut self) -> Option<DateTime<Utc>> {
        let snapshot = self.scheduler.take_pending()?;
        self.write(snapshot)
    }

    pub fn cancel_pending(&mut self) {
        if self.scheduler.cancel_pending() {
            debug!("cancelled pending questionnaire draft write");
        }
    }

    pub fn has_pending(&self) -> bool {
        self.scheduler.has_pending()
    }

    pub fn due_at(&self) -> Option<Instant> {
        self.scheduler.due_at()
    }

    /// Read the stored draft. Absent, unreadable or foreign data all yield `None`.
    pub fn load(&self) -> Option<AnswerStore> {
        let raw = match self.slot.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no questionnaire draft stored");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "questionnaire draft slot unreadable; starting fresh");
                return None;
            }
        };

        match serde_json::from_str::<AnswerStore>(&raw) {
            Ok(store) => Some(store),
            Err(err) => {
                warn!(error = %err, bytes = raw.len(), "discarding corrupt questionnaire draft");
                None
            }
        }
    }

    /// Cancel any pending write and remove the stored draft.
    pub fn discard(&mut self) {
        self.cancel_pending();
        if let Err(err) = self.slot.clear() {
            warn!(error = %err, "failed to clear questionnaire draft");
        }
    }

    fn write(&self, mut snapshot: AnswerStore) -> Option<DateTime<Utc>> {
        let saved_at = Utc::now();
        snapshot.mark_saved(saved_at);

        let encoded = match serde_json::to_string(&snapshot) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(error = %err, "questionnaire draft could not be encoded");
                return None;
            }
        };

        match self.slot.write(&encoded) {
            Ok(()) => {
                debug!(answers = snapshot.answered_count(), "questionnaire draft saved");
                Some(saved_at)
            }
            Err(err) => {
                warn!(error = %err, "questionnaire draft write failed");
                None
            }
        }
    }
}
