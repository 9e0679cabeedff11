use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::debug;

use super::domain::UserId;
use super::draft::{DraftPersistence, DraftSlotFactory};
use super::navigator::NavigatorState;
use super::schema::QuestionSchema;
use super::session::QuestionnaireSession;
use super::submission::SubmissionGateway;

/// How long an untouched session stays open before the sweep closes it.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

struct OpenSession {
    session: Arc<QuestionnaireSession>,
    last_used: Instant,
}

/// Owns one [`QuestionnaireSession`] per user and drives their draft autosave.
pub struct QuestionnaireService {
    schema: Arc<QuestionSchema>,
    gateway: Arc<dyn SubmissionGateway>,
    slots: Arc<dyn DraftSlotFactory>,
    quiet_period: Duration,
    idle_after: Duration,
    sessions: Mutex<HashMap<UserId, OpenSession>>,
}

impl QuestionnaireService {
    pub fn new(
        schema: Arc<QuestionSchema>,
        gateway: Arc<dyn SubmissionGateway>,
        slots: Arc<dyn DraftSlotFactory>,
        quiet_period: Duration,
    ) -> Self {
        Self {
            schema,
            gateway,
            slots,
            quiet_period,
            idle_after: DEFAULT_SESSION_IDLE,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_idle_expiry(mut self, idle_after: Duration) -> Self {
        self.idle_after = idle_after;
        self
    }

    pub fn schema(&self) -> &Arc<QuestionSchema> {
        &self.schema
    }

    /// Session for `user_id`, opened (and resumed from its draft) on first use.
    pub fn session(&self, user_id: &UserId) -> Arc<QuestionnaireSession> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("session registry mutex poisoned");
        let open = sessions.entry(user_id.clone()).or_insert_with(|| {
            let drafts = DraftPersistence::new(self.slots.slot_for(&user_id.0), self.quiet_period);
            OpenSession {
                session: Arc::new(QuestionnaireSession::start(
                    user_id.clone(),
                    self.schema.clone(),
                    drafts,
                    self.gateway.clone(),
                )),
                last_used: now,
            }
        });
        open.last_used = now;
        open.session.clone()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .len()
    }

    /// Write every draft whose quiet period has elapsed. Returns how many were written.
    pub fn flush_due(&self, now: Instant) -> usize {
        self.snapshot()
            .iter()
            .filter(|session| session.flush_due(now))
            .count()
    }

    /// Write every pending draft immediately.
    pub fn flush_all(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|session| session.flush())
            .count()
    }

    /// Close sessions untouched for the idle period, writing any pending draft first.
    ///
    /// Sessions still referenced by a request or awaiting the gateway stay open.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock().expect("session registry mutex poisoned");
        let before = sessions.len();
        sessions.retain(|user_id, open| {
            let idle = now.saturating_duration_since(open.last_used) >= self.idle_after;
            if !idle
                || Arc::strong_count(&open.session) > 1
                || open.session.state() == NavigatorState::Submitting
            {
                return true;
            }
            open.session.flush();
            debug!(user = %user_id, "closed idle questionnaire session");
            false
        });
        before - sessions.len()
    }

    /// Poll due drafts and idle sessions every `tick` until the returned task is aborted.
    pub fn spawn_autosave(self: &Arc<Self>, tick: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let now = Instant::now();
                let written = service.flush_due(now);
                if written > 0 {
                    debug!(written, "autosaved questionnaire drafts");
                }
                let closed = service.evict_idle(now);
                if closed > 0 {
                    debug!(closed, "closed idle questionnaire sessions");
                }
            }
        })
    }

    fn snapshot(&self) -> Vec<Arc<QuestionnaireSession>> {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .values()
            .map(|open| open.session.clone())
            .collect()
    }
}
