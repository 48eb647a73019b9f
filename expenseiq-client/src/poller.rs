//! Background alert poller.
//!
//! Follows the session channel: while someone is signed in it fetches the
//! dashboard immediately and then on a fixed interval, tracks the alert set,
//! and emits a notification the first time a HIGH severity alert shows up
//! active. Signing out stops the timer and clears everything; so does any new
//! login, even as the same user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use expenseiq_core::{AlertTracker, AlertView, ApplyOutcome, CanonicalAlert, CanonicalDashboard};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::error::Result;
use crate::session::SessionState;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Notifications queued for the receiver before new ones are dropped.
pub const NOTIFICATION_BUFFER: usize = 64;

/// Where the poller gets dashboards from. `Ok(None)` means the backend had no data.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn fetch_dashboard(&self) -> Result<Option<CanonicalDashboard>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertNotification {
    pub alert: CanonicalAlert,
    pub raised_at: DateTime<Utc>,
}

impl AlertNotification {
    fn new(alert: CanonicalAlert) -> Self {
        Self {
            alert,
            raised_at: Utc::now(),
        }
    }

    pub fn headline(&self) -> String {
        format!("Budget Alert: {}", self.alert.message.as_deref().unwrap_or("(no message)"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Nobody signed in; no timer running.
    Idle,
    Polling,
}

struct Shared {
    source: Arc<dyn DashboardSource>,
    sessions: watch::Receiver<SessionState>,
    tracker: Mutex<AlertTracker>,
    view: watch::Sender<AlertView>,
    state: watch::Sender<PollerState>,
    notifications: mpsc::Sender<AlertNotification>,
}

impl Shared {
    fn tracker(&self) -> MutexGuard<'_, AlertTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_view(&self) {
        let view = self.tracker().view();
        self.view.send_replace(view);
    }

    fn reset(&self) {
        self.tracker().reset();
        self.publish_view();
    }

    fn notify(&self, notification: AlertNotification) {
        match self.notifications.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                tracing::warn!(
                    message = dropped.alert.message.as_deref().unwrap_or("-"),
                    "notification queue full; dropping alert notification"
                );
            }
            // Nobody listening is fine; the view still updates.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    async fn fetch_alerts(&self) {
        // Checked on every call: the signed-in user may have changed since the last tick.
        let Some(session) = self.sessions.borrow().session.clone() else {
            return;
        };
        if session.user.is_admin() {
            tracing::debug!(email = %session.user.email, "skipping alert poll for administrator");
            return;
        }

        let ticket = self.tracker().begin();
        let dashboard = match self.source.fetch_dashboard().await {
            Ok(Some(dashboard)) => dashboard,
            Ok(None) => {
                tracing::debug!(seq = ticket.seq, "dashboard had no data; keeping previous alerts");
                return;
            }
            Err(e) => {
                tracing::warn!(seq = ticket.seq, error = %e, "failed to fetch alerts");
                return;
            }
        };

        let outcome = self.tracker().apply(ticket, dashboard.alerts);
        match outcome {
            ApplyOutcome::Stale => {
                tracing::debug!(seq = ticket.seq, "discarding out-of-date alert poll");
            }
            ApplyOutcome::Applied { notify } => {
                self.publish_view();
                for alert in notify {
                    tracing::info!(
                        category = alert.related_category.as_deref().unwrap_or("-"),
                        message = alert.message.as_deref().unwrap_or("-"),
                        "new high severity alert"
                    );
                    self.notify(AlertNotification::new(alert));
                }
            }
        }
    }
}

/// Handle to the running poller. Dropping it stops the timer.
pub struct AlertPoller {
    shared: Arc<Shared>,
    driver: JoinHandle<()>,
}

impl AlertPoller {
    /// Must be called from within a tokio runtime.
    ///
    /// The receiver holds up to [`NOTIFICATION_BUFFER`] undelivered
    /// notifications; past that, new ones are logged and dropped while the
    /// alert view keeps updating.
    pub fn spawn(
        source: Arc<dyn DashboardSource>,
        sessions: watch::Receiver<SessionState>,
        interval: Duration,
    ) -> (Self, mpsc::Receiver<AlertNotification>) {
        let interval = if interval.is_zero() { DEFAULT_POLL_INTERVAL } else { interval };
        let (notifications, rx) = mpsc::channel(NOTIFICATION_BUFFER);
        let (view, _) = watch::channel(AlertView::default());
        let (state, _) = watch::channel(PollerState::Idle);

        let shared = Arc::new(Shared {
            source,
            sessions: sessions.clone(),
            tracker: Mutex::new(AlertTracker::new()),
            view,
            state,
            notifications,
        });
        let driver = tokio::spawn(drive(shared.clone(), sessions, interval));

        (Self { shared, driver }, rx)
    }

    /// Poll right now, outside the timer (e.g. after the user changed a transaction).
    pub async fn fetch_alerts(&self) {
        self.shared.fetch_alerts().await;
    }

    pub fn subscribe(&self) -> watch::Receiver<AlertView> {
        self.shared.view.subscribe()
    }

    pub fn snapshot(&self) -> AlertView {
        self.shared.view.borrow().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.shared.view.borrow().unread_count
    }

    pub fn state(&self) -> PollerState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<PollerState> {
        self.shared.state.subscribe()
    }
}

impl Drop for AlertPoller {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(shared: Arc<Shared>, mut sessions: watch::Receiver<SessionState>, period: Duration) {
    loop {
        let (epoch, user) = {
            let current = sessions.borrow_and_update();
            (current.epoch, current.session.as_ref().map(|s| s.user.email.clone()))
        };

        let Some(user) = user else {
            shared.state.send_replace(PollerState::Idle);
            if sessions.changed().await.is_err() {
                return;
            }
            continue;
        };

        shared.state.send_replace(PollerState::Polling);
        tracing::info!(email = %user, interval_secs = period.as_secs(), "alert polling started");

        // The first tick completes immediately.
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Detached so a hanging request never holds up the next tick.
                    let shared = shared.clone();
                    tokio::spawn(async move { shared.fetch_alerts().await });
                }
                changed = sessions.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    // Any logout or login since this session began ends it,
                    // however many updates the channel folded together.
                    if sessions.borrow().epoch != epoch {
                        break;
                    }
                }
            }
        }

        shared.reset();
        tracing::info!(email = %user, "alert polling stopped");
    }
}
