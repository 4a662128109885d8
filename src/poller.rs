use crate::metrics::{FetchTrigger, MetricsCollector, MetricsSnapshot};
use crate::snapshot::{measure_fetch, StatusSnapshot};
use crate::source::StatusSource;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Shortest time the refreshing indicator stays up after a manual refresh.
pub const MIN_REFRESH_DISPLAY: Duration = Duration::from_millis(1000);
/// How long the duration hint stays visible after a manual refresh completes.
pub const DURATION_HINT_TTL: Duration = Duration::from_millis(3000);
pub const LIVE_VIEW_PERIOD: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerMode {
    Idle,
    Loading,
    Refreshing,
    LiveView,
}

/// Everything the presentation layer may read.
///
/// Mutated only by the owning [`StatusPoller`] and its timers; published
/// through a watch channel so readers always see a consistent copy.
#[derive(Debug, Clone, Default)]
pub struct PollerState {
    pub current_snapshot: Option<StatusSnapshot>,
    pub live_view_enabled: bool,
    pub show_duration_hint: bool,
    loading: bool,
    refreshing: bool,
    torn_down: bool,
    live_view_generation: u64,
    hint_generation: u64,
}

impl PollerState {
    pub fn mode(&self) -> PollerMode {
        if self.live_view_enabled {
            PollerMode::LiveView
        } else if self.refreshing {
            PollerMode::Refreshing
        } else if self.loading {
            PollerMode::Loading
        } else {
            PollerMode::Idle
        }
    }

    /// A manual refresh is still holding the indicator, even if live view
    /// has since taken over the reported mode.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn last_fetch_duration(&self) -> Option<u64> {
        self.current_snapshot.as_ref().map(|s| s.duration_ms)
    }

    /// Whether the last fetch duration should be on screen. Live view keeps
    /// it up permanently.
    pub fn duration_visible(&self) -> bool {
        (self.show_duration_hint || self.live_view_enabled) && self.last_fetch_duration().is_some()
    }
}

#[derive(Default)]
struct TaskHandles {
    initial: Option<JoinHandle<()>>,
    refresh: Option<JoinHandle<()>>,
    hint: Option<JoinHandle<()>>,
    live_view: Option<JoinHandle<()>>,
    closed: bool,
}

#[derive(Clone, Copy)]
enum Slot {
    Initial,
    Refresh,
    Hint,
    LiveView,
}

impl TaskHandles {
    fn slot(&mut self, slot: Slot) -> &mut Option<JoinHandle<()>> {
        match slot {
            Slot::Initial => &mut self.initial,
            Slot::Refresh => &mut self.refresh,
            Slot::Hint => &mut self.hint,
            Slot::LiveView => &mut self.live_view,
        }
    }
}

struct Shared {
    source: Arc<dyn StatusSource>,
    metrics: Arc<MetricsCollector>,
    state: watch::Sender<PollerState>,
    tasks: Mutex<TaskHandles>,
}

impl Shared {
    fn tasks(&self) -> MutexGuard<'_, TaskHandles> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs a task handle, aborting whatever occupied the slot. After
    /// teardown the new task is aborted straight away.
    fn install(&self, slot: Slot, handle: JoinHandle<()>) {
        let mut tasks = self.tasks();
        if tasks.closed {
            handle.abort();
            return;
        }
        if let Some(previous) = tasks.slot(slot).replace(handle) {
            previous.abort();
        }
    }

    fn cancel(&self, slot: Slot) {
        if let Some(handle) = self.tasks().slot(slot).take() {
            handle.abort();
        }
    }

    fn discard(&self, trigger: FetchTrigger) {
        log::debug!("Discarding late {:?} completion", trigger);
        self.metrics.increment_discarded();
    }

    async fn run_initial(self: Arc<Self>) {
        let snapshot = measure_fetch(self.source.as_ref()).await;
        self.metrics
            .record_fetch(FetchTrigger::Initial, snapshot.is_available(), snapshot.duration_ms);

        let applied = self.state.send_if_modified(|s| {
            if s.torn_down {
                return false;
            }
            s.current_snapshot = Some(snapshot);
            s.loading = false;
            true
        });
        if !applied {
            self.discard(FetchTrigger::Initial);
        }
    }

    /// Runs one manual refresh. The result is dropped if live view was
    /// toggled while the fetch was in flight; the indicator still clears.
    async fn run_refresh(self: Arc<Self>, triggered_at: Instant, live_view_generation: u64) {
        let snapshot = measure_fetch(self.source.as_ref()).await;
        self.metrics
            .record_fetch(FetchTrigger::Manual, snapshot.is_available(), snapshot.duration_ms);

        let mut hint_generation = 0;
        let applied = self.state.send_if_modified(|s| {
            if s.torn_down || s.live_view_generation != live_view_generation {
                return false;
            }
            s.current_snapshot = Some(snapshot);
            s.loading = false;
            s.show_duration_hint = true;
            s.hint_generation += 1;
            hint_generation = s.hint_generation;
            true
        });
        if applied {
            self.schedule_hint_clear(hint_generation);
        } else {
            self.discard(FetchTrigger::Manual);
        }

        tokio::time::sleep_until(triggered_at + MIN_REFRESH_DISPLAY).await;
        self.state.send_if_modified(|s| {
            if s.torn_down {
                return false;
            }
            s.refreshing = false;
            true
        });
        log::debug!("Manual refresh finished");
    }

    fn schedule_hint_clear(self: &Arc<Self>, generation: u64) {
        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(DURATION_HINT_TTL).await;
            shared.state.send_if_modified(|s| {
                if s.torn_down || s.hint_generation != generation {
                    return false;
                }
                s.show_duration_hint = false;
                true
            });
        });
        self.install(Slot::Hint, handle);
    }

    async fn run_live_view(self: Arc<Self>, generation: u64) {
        let mut ticker = tokio::time::interval_at(Instant::now() + LIVE_VIEW_PERIOD, LIVE_VIEW_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let snapshot = measure_fetch(self.source.as_ref()).await;
            self.metrics
                .record_fetch(FetchTrigger::LiveView, snapshot.is_available(), snapshot.duration_ms);

            let applied = self.state.send_if_modified(|s| {
                if s.torn_down || !s.live_view_enabled || s.live_view_generation != generation {
                    return false;
                }
                s.current_snapshot = Some(snapshot);
                s.loading = false;
                true
            });
            if !applied {
                self.discard(FetchTrigger::LiveView);
                break;
            }
        }
    }
}

/// Fetches a status payload on demand or on a fixed period and keeps the
/// display state consistent while doing so.
///
/// One poller belongs to one display session. It must be created inside a
/// tokio runtime, and every timer it starts is cancelled by [`teardown`]
/// (also run on drop).
///
/// [`teardown`]: StatusPoller::teardown
pub struct StatusPoller {
    shared: Arc<Shared>,
}

impl StatusPoller {
    /// Starts a session. Without a seed the poller is `Loading` and an
    /// initial fetch is issued right away; with one it starts `Idle`.
    pub fn initialize(
        source: Arc<dyn StatusSource>,
        seed: Option<StatusSnapshot>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        let needs_fetch = seed.is_none();
        let (state_tx, _) = watch::channel(PollerState {
            current_snapshot: seed,
            loading: needs_fetch,
            ..PollerState::default()
        });

        let shared = Arc::new(Shared {
            source,
            metrics: metrics.unwrap_or_else(|| Arc::new(MetricsCollector::new())),
            state: state_tx,
            tasks: Mutex::new(TaskHandles::default()),
        });

        if needs_fetch {
            log::debug!("No seed snapshot, issuing initial fetch");
            let handle = tokio::spawn(Arc::clone(&shared).run_initial());
            shared.install(Slot::Initial, handle);
        }

        Self { shared }
    }

    pub fn state(&self) -> PollerState {
        self.shared.state.borrow().clone()
    }

    pub fn mode(&self) -> PollerMode {
        self.shared.state.borrow().mode()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.shared.state.subscribe()
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Fetches once and shows the result, keeping the refreshing indicator
    /// up for at least [`MIN_REFRESH_DISPLAY`].
    ///
    /// Ignored while a refresh or the initial load is outstanding, while
    /// live view is on, and after teardown. Returns whether a refresh
    /// started.
    pub fn manual_refresh(&self) -> bool {
        let triggered_at = Instant::now();
        let mut live_view_generation = 0;
        let started = self.shared.state.send_if_modified(|s| {
            if s.torn_down || s.refreshing || s.loading || s.live_view_enabled {
                return false;
            }
            s.refreshing = true;
            live_view_generation = s.live_view_generation;
            true
        });
        if !started {
            log::debug!("Manual refresh ignored in {:?} mode", self.mode());
            return false;
        }

        let handle = tokio::spawn(Arc::clone(&self.shared).run_refresh(triggered_at, live_view_generation));
        self.shared.install(Slot::Refresh, handle);
        true
    }

    /// Turns periodic polling on or off. Turning it off takes effect
    /// immediately: no tick fires afterwards and a tick still in flight is
    /// dropped when it completes.
    pub fn set_live_view(&self, enabled: bool) {
        let mut generation = None;
        let changed = self.shared.state.send_if_modified(|s| {
            if s.torn_down || s.live_view_enabled == enabled {
                return false;
            }
            s.live_view_enabled = enabled;
            s.live_view_generation += 1;
            if enabled {
                generation = Some(s.live_view_generation);
            }
            true
        });
        if !changed {
            return;
        }

        match generation {
            Some(generation) => {
                log::debug!("Live view on");
                let handle = tokio::spawn(Arc::clone(&self.shared).run_live_view(generation));
                self.shared.install(Slot::LiveView, handle);
            }
            None => {
                log::debug!("Live view off");
                self.shared.cancel(Slot::LiveView);
            }
        }
    }

    /// Cancels every pending timer and fetch. Later completions never touch
    /// the state again. Safe to call more than once.
    pub fn teardown(&self) {
        let mut first = false;
        self.shared.state.send_if_modified(|s| {
            first = !s.torn_down;
            s.torn_down = true;
            false
        });

        let mut tasks = self.shared.tasks();
        tasks.closed = true;
        for slot in [Slot::Initial, Slot::Refresh, Slot::Hint, Slot::LiveView] {
            if let Some(handle) = tasks.slot(slot).take() {
                handle.abort();
            }
        }

        if first {
            log::debug!("Poller torn down");
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.teardown();
    }
}
