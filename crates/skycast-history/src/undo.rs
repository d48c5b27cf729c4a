//! Timed undo window for history removals.
//!
//! One removal at a time can be restored. The window closes on undo, on
//! dismissal, or when its countdown runs out; in every case the close
//! callback runs once, after a short settle delay. Starting a new window
//! while one is open discards the old one without running its callback.
//!
//! Timers are tokio tasks tied to a cancellation token owned by the
//! coordinator, so nothing fires after the coordinator is dropped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::store::SharedHistory;

/// How often the remaining time is republished.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Delay between leaving the pending state and running the close callback.
pub const SETTLE_DELAY: Duration = Duration::from_millis(300);

pub const DEFAULT_UNDO_DURATION: Duration = Duration::from_millis(5000);

type CloseCallback = Box<dyn FnOnce() + Send + 'static>;

/// A removed entry and where it used to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    pub city: String,
    pub original_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoState {
    Idle,
    Pending(PendingDeletion),
}

struct Window {
    id: u64,
    record: PendingDeletion,
    started: Instant,
    cancel: CancellationToken,
    on_close: Option<CloseCallback>,
}

#[derive(Default)]
struct WindowSlot {
    window: Option<Window>,
    next_id: u64,
}

struct Shared {
    history: SharedHistory,
    duration: Duration,
    slot: Mutex<WindowSlot>,
    remaining: watch::Sender<Option<Duration>>,
    root: CancellationToken,
}

impl Shared {
    /// Publish the time left in window `id`. Returns `false` once that
    /// window is gone.
    ///
    /// The slot lock is held while sending so a closed window can never
    /// overwrite the `None` published by `resolve`.
    fn publish_remaining(&self, id: u64) -> bool {
        let slot = self.slot.lock();
        let Some(window) = slot.window.as_ref().filter(|w| w.id == id) else {
            return false;
        };
        let left = self.duration.saturating_sub(window.started.elapsed());
        self.remaining.send_replace(Some(left));
        true
    }

    /// Close the open window. With `id`, only if that window is still open.
    fn resolve(&self, id: Option<u64>, restore: bool) -> Option<PendingDeletion> {
        let window = {
            let mut slot = self.slot.lock();
            let open_id = slot.window.as_ref()?.id;
            if id.is_some_and(|id| id != open_id) {
                return None;
            }
            let window = slot.window.take()?;
            self.remaining.send_replace(None);
            window
        };

        window.cancel.cancel();

        if restore {
            let record = &window.record;
            self.history
                .lock()
                .reinsert_at(&record.city, record.original_index);
            tracing::info!(
                "Restored {:?} at position {}",
                record.city,
                record.original_index
            );
        }

        if let Some(on_close) = window.on_close {
            self.schedule_close(on_close);
        }

        Some(window.record)
    }

    fn schedule_close(&self, on_close: CloseCallback) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No runtime for settle delay; closing undo window immediately");
            on_close();
            return;
        };

        let root = self.root.clone();
        handle.spawn(async move {
            tokio::select! {
                _ = root.cancelled() => {}
                _ = tokio::time::sleep(SETTLE_DELAY) => on_close(),
            }
        });
    }
}

fn spawn_timers(shared: &Arc<Shared>, id: u64, cancel: CancellationToken) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!("No runtime for undo countdown; window stays open until resolved");
        return;
    };

    let countdown = {
        let shared = Arc::clone(shared);
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(shared.duration) => {
                    tracing::debug!("Undo window timed out");
                    shared.resolve(Some(id), false);
                }
            }
        }
    };

    let tick = {
        let shared = Arc::clone(shared);
        async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            // First tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        if !shared.publish_remaining(id) {
                            break;
                        }
                    }
                }
            }
        }
    };

    handle.spawn(countdown);
    handle.spawn(tick);
}

/// Owns the single pending deletion and its timers.
pub struct UndoCoordinator {
    shared: Arc<Shared>,
}

impl UndoCoordinator {
    pub fn new(history: SharedHistory, duration: Duration) -> Self {
        let (remaining, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                history,
                duration,
                slot: Mutex::new(WindowSlot::default()),
                remaining,
                root: CancellationToken::new(),
            }),
        }
    }

    pub fn duration(&self) -> Duration {
        self.shared.duration
    }

    /// Remove `city` from the history and open an undo window for it.
    ///
    /// Returns `None` (and changes nothing) when no entry exactly equals the
    /// trimmed `city`.
    pub fn delete(
        &self,
        city: &str,
        on_close: impl FnOnce() + Send + 'static,
    ) -> Option<PendingDeletion> {
        let record = {
            let mut history = self.shared.history.lock();
            let original_index = history.position(city.trim())?;
            let city = history.get(original_index)?.to_string();
            history.remove(&city);
            PendingDeletion {
                city,
                original_index,
            }
        };

        self.begin(record.clone(), on_close);
        Some(record)
    }

    /// Open an undo window for an already-removed entry.
    ///
    /// An open window is discarded first, without running its callback.
    /// Must be called from within a tokio runtime for the timers to run.
    pub fn begin(&self, record: PendingDeletion, on_close: impl FnOnce() + Send + 'static) {
        let cancel = self.shared.root.child_token();

        let id = {
            let mut slot = self.shared.slot.lock();
            if let Some(previous) = slot.window.take() {
                previous.cancel.cancel();
                tracing::debug!(
                    "Undo window for {:?} superseded by {:?}",
                    previous.record.city,
                    record.city
                );
            }

            let id = slot.next_id;
            slot.next_id += 1;
            slot.window = Some(Window {
                id,
                record,
                started: Instant::now(),
                cancel: cancel.clone(),
                on_close: Some(Box::new(on_close)),
            });
            if !self.shared.duration.is_zero() {
                self.shared.remaining.send_replace(Some(self.shared.duration));
            }
            id
        };

        if self.shared.duration.is_zero() {
            self.shared.resolve(Some(id), false);
            return;
        }

        spawn_timers(&self.shared, id, cancel);
    }

    /// Put the pending entry back where it was.
    pub fn undo(&self) -> Option<PendingDeletion> {
        self.shared.resolve(None, true)
    }

    /// Close the window, keeping the entry deleted.
    pub fn dismiss(&self) -> Option<PendingDeletion> {
        self.shared.resolve(None, false)
    }

    pub fn state(&self) -> UndoState {
        match self.pending() {
            Some(record) => UndoState::Pending(record),
            None => UndoState::Idle,
        }
    }

    pub fn pending(&self) -> Option<PendingDeletion> {
        self.shared
            .slot
            .lock()
            .window
            .as_ref()
            .map(|w| w.record.clone())
    }

    pub fn is_pending(&self) -> bool {
        self.shared.slot.lock().window.is_some()
    }

    /// Time left before the open window closes by itself.
    pub fn time_remaining(&self) -> Option<Duration> {
        let slot = self.shared.slot.lock();
        let window = slot.window.as_ref()?;
        Some(self.shared.duration.saturating_sub(window.started.elapsed()))
    }

    /// Elapsed share of the window, from 0.0 to 1.0.
    pub fn progress(&self) -> Option<f64> {
        let left = self.time_remaining()?;
        let total = self.shared.duration.as_secs_f64();
        if total == 0.0 {
            return Some(1.0);
        }
        Some((1.0 - left.as_secs_f64() / total).clamp(0.0, 1.0))
    }

    /// Remaining time, republished every [`TICK_INTERVAL`] while pending.
    pub fn subscribe(&self) -> watch::Receiver<Option<Duration>> {
        self.shared.remaining.subscribe()
    }

    pub fn snackbar_message(&self) -> Option<String> {
        self.pending()
            .map(|record| format!("\"{}\" removed from history", record.city))
    }
}

impl Drop for UndoCoordinator {
    fn drop(&mut self) {
        self.shared.root.cancel();
    }
}
