// ── Hive connection ──
//
// Owns the session and the cached `State` behind one lock. A background
// poll task refreshes on a timer and on forced requests from commands; a
// dispatch task hands each new snapshot to the registered change handler
// outside the lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hivekit_api::{Credentials, HiveClient, Session};

use crate::command::{Command, NodeTarget};
use crate::config::HiveConfig;
use crate::convert::reduce;
use crate::error::CoreError;
use crate::model::{HeatingMode, State};

/// Pending follow-up refreshes held at once. Requests beyond this are
/// dropped; the queued ones already cover them.
pub const REFRESH_CHANNEL_SIZE: usize = 8;

/// Callback invoked with every new `State` snapshot.
pub type ChangeHandler = Arc<dyn Fn(&State) + Send + Sync>;

// ── Refresh bookkeeping ──────────────────────────────────────────

/// What started a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    /// Interval timer. Subject to the debounce floor.
    Tick,
    /// Explicit request. Ignores the debounce floor, but is satisfied by
    /// any successful refresh that finished at or after `requested_at`.
    Forced { requested_at: Instant },
}

/// Result of a single refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Nodes were fetched and the cached state replaced.
    Refreshed,
    /// A recent enough refresh made this one unnecessary.
    Skipped,
    /// The fetch failed; the previous state is kept.
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct RefreshStamp {
    at: Instant,
    wall: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct RefreshRequest {
    requested_at: Instant,
}

fn should_skip(
    trigger: Trigger,
    last_success: Option<Instant>,
    now: Instant,
    debounce: Duration,
) -> bool {
    let Some(last) = last_success else {
        return false;
    };
    match trigger {
        Trigger::Tick => now.saturating_duration_since(last) < debounce,
        Trigger::Forced { requested_at } => last >= requested_at,
    }
}

// ── Hive ─────────────────────────────────────────────────────────

/// A live connection to one Hive account.
///
/// Cheaply cloneable. Built by [`Hive::connect`], which logs in, performs
/// the first poll and starts the background tasks. Call
/// [`shutdown`](Self::shutdown) to stop them.
#[derive(Clone)]
pub struct Hive {
    inner: Arc<HiveInner>,
}

struct HiveInner {
    config: HiveConfig,
    client: HiveClient,
    shared: RwLock<Shared>,
    refresh_tx: mpsc::Sender<RefreshRequest>,
    state_tx: watch::Sender<Arc<State>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Everything the refresh cycle mutates, under a single lock.
struct Shared {
    session: Session,
    state: Arc<State>,
    last_refresh: Option<RefreshStamp>,
    handler: Option<ChangeHandler>,
}

impl Hive {
    // ── Connection lifecycle ─────────────────────────────────────

    /// Log in, poll once, and start the background tasks.
    ///
    /// Only a failed login is fatal. If the first poll fails the returned
    /// `Hive` starts from a zero `State` and the timer retries.
    pub async fn connect(config: HiveConfig) -> Result<Self, CoreError> {
        let transport = config.transport();
        let credentials = Credentials {
            username: config.username.clone(),
            password: config.password.clone(),
        };

        let mut client = HiveClient::new(config.login_url.clone(), credentials, &transport)?;
        if let Some(base) = config.api_base.clone() {
            client = client.with_api_base(base);
        }

        let session = client.login().await?;
        info!(username = %config.username, base = %session.base_url(), "logged in");

        let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_CHANNEL_SIZE);
        let (state_tx, _) = watch::channel(Arc::new(State::default()));
        let interval = config.effective_poll_interval();

        let hive = Self {
            inner: Arc::new(HiveInner {
                config,
                client,
                shared: RwLock::new(Shared {
                    session,
                    state: Arc::new(State::default()),
                    last_refresh: None,
                    handler: None,
                }),
                refresh_tx,
                state_tx,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        };

        if hive.refresh_now().await == RefreshOutcome::Failed {
            warn!("initial poll failed, starting from an empty state");
        }

        let mut handles = hive.inner.task_handles.lock().await;
        let cancel = hive.inner.cancel.clone();
        handles.push(tokio::spawn(poll_task(
            hive.clone(),
            refresh_rx,
            interval,
            cancel.clone(),
        )));
        handles.push(tokio::spawn(notify_task(
            hive.clone(),
            hive.inner.state_tx.subscribe(),
            cancel,
        )));
        drop(handles);

        debug!(?interval, "background polling started");
        Ok(hive)
    }

    /// Stop the background tasks and wait for them to finish.
    ///
    /// Pending follow-up refreshes are abandoned. The cached state stays
    /// readable afterwards.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("background tasks stopped");
    }

    // ── State access ─────────────────────────────────────────────

    /// A copy of the last known state.
    pub async fn state(&self) -> State {
        State::clone(&self.inner.shared.read().await.state)
    }

    /// Wall-clock time of the last successful refresh, if any.
    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.inner
            .shared
            .read()
            .await
            .last_refresh
            .map(|stamp| stamp.wall)
    }

    /// Watch every published snapshot. Slow receivers only see the latest.
    pub fn subscribe(&self) -> watch::Receiver<Arc<State>> {
        self.inner.state_tx.subscribe()
    }

    /// Install the change handler, replacing any previous one.
    ///
    /// The handler runs on the blocking pool, never under the state lock, so
    /// it may block without delaying polling. It is called once with the
    /// current state right after registration, then after every successful
    /// refresh. Calls never overlap; a slow handler sees only the latest
    /// snapshot when it returns.
    pub async fn register_change_handler<F>(&self, handler: F)
    where
        F: Fn(&State) + Send + Sync + 'static,
    {
        let mut shared = self.inner.shared.write().await;
        shared.handler = Some(Arc::new(handler));
        self.inner.state_tx.send_modify(|_| {});
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Refresh now, ignoring the debounce floor.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.refresh(Trigger::Forced {
            requested_at: Instant::now(),
        })
        .await
    }

    /// One refresh cycle. Holds the write lock throughout, so cycles never
    /// overlap and readers never see a half-applied update.
    pub(crate) async fn refresh(&self, trigger: Trigger) -> RefreshOutcome {
        let mut guard = self.inner.shared.write().await;
        let shared = &mut *guard;

        let last = shared.last_refresh.map(|stamp| stamp.at);
        if should_skip(trigger, last, Instant::now(), self.inner.config.debounce) {
            debug!(?trigger, "refresh skipped");
            return RefreshOutcome::Skipped;
        }

        let nodes = match self.inner.client.list_nodes(&mut shared.session).await {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), ?trigger, "unable to get nodes");
                return RefreshOutcome::Failed;
            }
        };

        let state = Arc::new(reduce(&nodes));
        shared.state = Arc::clone(&state);
        shared.last_refresh = Some(RefreshStamp {
            at: Instant::now(),
            wall: Utc::now(),
        });
        // Published under the lock so snapshots reach subscribers in order.
        self.inner.state_tx.send_replace(state);

        debug!(nodes = nodes.len(), ?trigger, "state refreshed");
        RefreshOutcome::Refreshed
    }

    /// Queue a forced refresh once the command delay has passed.
    fn schedule_refresh(&self) {
        let request = RefreshRequest {
            requested_at: Instant::now(),
        };
        let delay = self.inner.config.command_refresh_delay;
        let tx = self.inner.refresh_tx.clone();
        let cancel = self.inner.cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if let Err(e) = tx.try_send(request) {
                        debug!(error = %e, "forced refresh dropped");
                    }
                }
            }
        });
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Send a command to the node it targets.
    ///
    /// The node id comes from the cached state and is not checked: before
    /// the first successful poll it is empty and the upstream rejects the
    /// request. On success a forced refresh follows after
    /// [`HiveConfig::command_refresh_delay`].
    pub async fn execute(&self, command: Command) -> Result<(), CoreError> {
        let (mut session, node_id) = {
            let shared = self.inner.shared.read().await;
            let node_id = match command.target() {
                NodeTarget::Heating => shared.state.heating_node_id.clone(),
                NodeTarget::HotWater => shared.state.hot_water_node_id.clone(),
            };
            (shared.session.clone(), node_id)
        };

        debug!(command = command.name(), node = %node_id, "sending command");
        let result = self
            .inner
            .client
            .update_node(&mut session, &node_id, &command.to_update())
            .await;
        self.store_session(session).await;

        if let Err(e) = result {
            warn!(command = command.name(), error = %e, "command failed");
            return Err(e.into());
        }

        self.schedule_refresh();
        Ok(())
    }

    pub async fn set_target_temperature(&self, celsius: f64) -> Result<(), CoreError> {
        self.execute(Command::SetTargetTemperature { celsius }).await
    }

    /// Boost hot water for `duration`, or put it back on its schedule.
    pub async fn toggle_hot_water(&self, on: bool, duration: Duration) -> Result<(), CoreError> {
        self.execute(Command::ToggleHotWater { on, duration }).await
    }

    /// Boost heating for `duration`, or put it back on its schedule.
    pub async fn toggle_heating_boost(
        &self,
        on: bool,
        duration: Duration,
    ) -> Result<(), CoreError> {
        self.execute(Command::ToggleHeatingBoost { on, duration }).await
    }

    pub async fn set_target_heating_mode(&self, mode: HeatingMode) -> Result<(), CoreError> {
        self.execute(Command::SetTargetHeatingMode { mode }).await
    }

    /// Keep a session renewed during a command, unless a later login
    /// already replaced the stored one.
    async fn store_session(&self, session: Session) {
        let mut shared = self.inner.shared.write().await;
        if session.is_newer_than(&shared.session) {
            shared.session = session;
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Refresh on every tick and on every forced request.
async fn poll_task(
    hive: Hive,
    mut refresh_rx: mpsc::Receiver<RefreshRequest>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // the first tick is immediate; connect already polled

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                hive.refresh(Trigger::Tick).await;
            }
            request = refresh_rx.recv() => {
                let Some(request) = request else { break };
                hive.refresh(Trigger::Forced { requested_at: request.requested_at }).await;
            }
        }
    }
}

/// Call the change handler with each new snapshot, outside the state lock.
///
/// The handler runs on the blocking pool so a slow one cannot hold up the
/// runtime. Snapshots published while it runs collapse into the latest.
async fn notify_task(
    hive: Hive,
    mut state_rx: watch::Receiver<Arc<State>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state_rx.borrow_and_update().clone();
                let handler = hive.inner.shared.read().await.handler.clone();
                let Some(handler) = handler else { continue };
                let call = tokio::task::spawn_blocking(move || handler(&snapshot));
                tokio::select! {
                    biased;
                    // A handler still running at shutdown is left to finish on its own.
                    () = cancel.cancelled() => break,
                    joined = call => {
                        if let Err(e) = joined {
                            warn!(error = %e, "change handler panicked");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_secs(10);

    #[test]
    fn nothing_is_skipped_before_the_first_success() {
        let now = Instant::now();
        assert!(!should_skip(Trigger::Tick, None, now, DEBOUNCE));
        assert!(!should_skip(
            Trigger::Forced { requested_at: now },
            None,
            now,
            DEBOUNCE
        ));
    }

    #[test]
    fn tick_within_debounce_is_skipped() {
        let last = Instant::now();
        let now = last + Duration::from_secs(9);
        assert!(should_skip(Trigger::Tick, Some(last), now, DEBOUNCE));
    }

    #[test]
    fn tick_after_debounce_runs() {
        let last = Instant::now();
        let now = last + DEBOUNCE;
        assert!(!should_skip(Trigger::Tick, Some(last), now, DEBOUNCE));
    }

    #[test]
    fn forced_ignores_debounce() {
        let last = Instant::now();
        let requested_at = last + Duration::from_secs(1);
        let now = requested_at + Duration::from_secs(1);
        assert!(!should_skip(
            Trigger::Forced { requested_at },
            Some(last),
            now,
            DEBOUNCE
        ));
    }

    #[test]
    fn forced_is_satisfied_by_a_later_refresh() {
        let requested_at = Instant::now();
        let last = requested_at + Duration::from_millis(5);
        let now = last + Duration::from_millis(5);
        assert!(should_skip(
            Trigger::Forced { requested_at },
            Some(last),
            now,
            DEBOUNCE
        ));
    }
}
