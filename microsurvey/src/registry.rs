//! Per-user actor supervision: one `tokio::sync::mpsc` mailbox per live
//! actor, enforcing single-writer semantics, with a soft-cap LRU eviction
//! of idle actors so memory stays bounded under many concurrent users.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::error::SurveyError;
use crate::orchestrator::{ResolvedEffect, SurveyOrchestrator};
use crate::types::{SurveyEvent, SurveyState};

type EventReply = oneshot::Sender<Result<(SurveyState, ResolvedEffect), SurveyError>>;

enum Command {
    Event { survey_id: i64, event: SurveyEvent, now: DateTime<Utc>, user_tz: Option<String>, reply: EventReply },
}

struct LiveActor {
    tx: mpsc::Sender<Command>,
    /// Best-effort snapshot of the actor's last known state, used only to
    /// decide eviction eligibility — a `Question`/`Consent` actor is
    /// mid-interaction and is never evicted, only ones waiting on a timer.
    last_known_state: SurveyState,
}

impl LiveActor {
    fn is_evictable(&self) -> bool {
        matches!(
            self.last_known_state,
            SurveyState::WaitingForConsent | SurveyState::WaitingForQuestion(_)
        )
    }
}

/// Live-actor memory and capacity metrics, per spec.md §4.8.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryMetrics {
    pub live_actor_count: usize,
    pub avg_memory_bytes: u64,
    pub rss_bytes: Option<u64>,
}

/// Per-actor mailbox overhead estimate: channel buffer slots plus the
/// orchestrator `Arc` handle, used only for the coarse `avg_memory_bytes`
/// metric — not a precise accounting.
const ESTIMATED_BYTES_PER_ACTOR: u64 = 512;

pub struct ActorRegistry {
    orchestrator: Arc<SurveyOrchestrator>,
    live: Mutex<IndexMap<i64, LiveActor>>,
    soft_cap: usize,
}

impl ActorRegistry {
    pub fn new(orchestrator: Arc<SurveyOrchestrator>, soft_cap: usize) -> Arc<Self> {
        Arc::new(Self { orchestrator, live: Mutex::new(IndexMap::new()), soft_cap })
    }

    /// Delivers `event` to the actor for `user_id`, spawning (rehydrating)
    /// it first if it isn't currently live.
    pub async fn dispatch(
        self: &Arc<Self>,
        user_id: i64,
        survey_id: i64,
        event: SurveyEvent,
        now: DateTime<Utc>,
        user_tz: Option<String>,
    ) -> Result<(SurveyState, ResolvedEffect), SurveyError> {
        let mut event = event;

        // Retry once: the mailbox can close between `ensure_live` handing
        // back a sender and the send itself if the task was concurrently
        // evicted. One rehydrate-and-retry covers that race.
        for attempt in 0..2 {
            let tx = self.ensure_live(user_id).await;
            let (reply_tx, reply_rx) = oneshot::channel();
            let cmd = Command::Event { survey_id, event, now, user_tz: user_tz.clone(), reply: reply_tx };

            match tx.send(cmd).await {
                Ok(()) => {
                    let result = reply_rx
                        .await
                        .unwrap_or(Err(SurveyError::Malformed("actor mailbox closed".into())));
                    if let Ok((state, _)) = &result {
                        self.record_state(user_id, *state).await;
                    }
                    return result;
                }
                Err(mpsc::error::SendError(Command::Event { event: returned_event, .. })) => {
                    event = returned_event;
                    if attempt == 1 {
                        return Err(SurveyError::Malformed("actor mailbox closed after retry".into()));
                    }
                }
            }
        }

        unreachable!("loop always returns")
    }

    async fn ensure_live(self: &Arc<Self>, user_id: i64) -> mpsc::Sender<Command> {
        let mut live = self.live.lock().await;

        if let Some(actor) = live.shift_remove(&user_id) {
            let tx = actor.tx.clone();
            live.insert(user_id, actor);
            return tx;
        }

        if live.len() >= self.soft_cap {
            evict_one_idle(&mut live);
        }

        let (tx, rx) = mpsc::channel(32);
        spawn_actor_task(Arc::clone(&self.orchestrator), user_id, rx);
        live.insert(user_id, LiveActor { tx: tx.clone(), last_known_state: SurveyState::Idle });
        tx
    }

    async fn record_state(&self, user_id: i64, state: SurveyState) {
        let mut live = self.live.lock().await;
        if let Some(actor) = live.get_mut(&user_id) {
            actor.last_known_state = state;
        }
        if state.is_terminal() {
            live.shift_remove(&user_id);
        }
    }

    pub async fn metrics(&self) -> RegistryMetrics {
        let live = self.live.lock().await;
        RegistryMetrics {
            live_actor_count: live.len(),
            avg_memory_bytes: ESTIMATED_BYTES_PER_ACTOR,
            rss_bytes: read_self_rss_bytes(),
        }
    }
}

/// Evicts the oldest (front of the LRU order) actor eligible for
/// eviction — one waiting on a timer, not mid-interaction. Its task exits
/// when its mailbox sender is dropped; the next event for that user
/// rehydrates it from `SurveyActorState` transparently.
fn evict_one_idle(live: &mut IndexMap<i64, LiveActor>) {
    let victim = live.iter().find(|(_, actor)| actor.is_evictable()).map(|(user_id, _)| *user_id);
    if let Some(user_id) = victim {
        live.shift_remove(&user_id);
    }
}

fn spawn_actor_task(orchestrator: Arc<SurveyOrchestrator>, user_id: i64, mut rx: mpsc::Receiver<Command>) {
    tokio::spawn(async move {
        while let Some(Command::Event { survey_id, event, now, user_tz, reply }) = rx.recv().await {
            let result = orchestrator
                .handle_event(user_id, survey_id, event, now, user_tz.as_deref())
                .await;
            let _ = reply.send(result);
        }
    });
}

/// Best-effort process RSS via `/proc/self/statm`; `None` off Linux or if
/// the read fails.
fn read_self_rss_bytes() -> Option<u64> {
    let contents = std::fs::read_to_string("/proc/self/statm").ok()?;
    let rss_pages: u64 = contents.split_whitespace().nth(1)?.parse().ok()?;
    let page_size = 4096u64;
    Some(rss_pages * page_size)
}
