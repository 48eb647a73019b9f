//! Alert tracking across polls.
//!
//! The backend does not assign stable alert ids, so an alert's identity is
//! the pair `(category, message)`. Each poll replaces the whole alert set;
//! the previous set is kept only to detect newly-appeared alerts.

use serde::Serialize;
use std::collections::HashSet;

use crate::model::CanonicalAlert;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub category: Option<String>,
    pub message: Option<String>,
}

impl AlertKey {
    pub fn of(alert: &CanonicalAlert) -> Self {
        Self {
            category: alert.related_category.clone(),
            message: alert.message.clone(),
        }
    }
}

/// Issued when a poll starts; presented again when its result is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket {
    pub generation: u64,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// A newer poll already landed, or the session ended since this poll began.
    Stale,
    Applied { notify: Vec<CanonicalAlert> },
}

/// Read-only view of the tracked alert set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertView {
    pub alerts: Vec<CanonicalAlert>,
    pub unread_count: usize,
}

pub fn unread_count(alerts: &[CanonicalAlert]) -> usize {
    alerts.iter().filter(|a| a.is_active()).count()
}

/// Alerts in `current` whose key is absent from `previous` and that warrant a notification.
pub fn newly_notifiable(previous: &[CanonicalAlert], current: &[CanonicalAlert]) -> Vec<CanonicalAlert> {
    let seen: HashSet<AlertKey> = previous.iter().map(AlertKey::of).collect();
    current
        .iter()
        .filter(|a| a.is_notifiable() && !seen.contains(&AlertKey::of(a)))
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
pub struct AlertTracker {
    /// Current alert set; doubles as the snapshot the next poll is diffed against.
    alerts: Vec<CanonicalAlert>,
    unread_count: usize,
    generation: u64,
    next_seq: u64,
    last_applied: Option<u64>,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> PollTicket {
        let ticket = PollTicket {
            generation: self.generation,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        ticket
    }

    pub fn apply(&mut self, ticket: PollTicket, alerts: Vec<CanonicalAlert>) -> ApplyOutcome {
        if ticket.generation != self.generation || self.last_applied.is_some_and(|last| ticket.seq <= last) {
            return ApplyOutcome::Stale;
        }

        let notify = newly_notifiable(&self.alerts, &alerts);
        self.unread_count = unread_count(&alerts);
        self.alerts = alerts;
        self.last_applied = Some(ticket.seq);

        ApplyOutcome::Applied { notify }
    }

    /// Drop all tracked state. Polls begun before the reset become stale.
    pub fn reset(&mut self) {
        self.alerts.clear();
        self.unread_count = 0;
        self.last_applied = None;
        self.generation += 1;
    }

    pub fn alerts(&self) -> &[CanonicalAlert] {
        &self.alerts
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn view(&self) -> AlertView {
        AlertView {
            alerts: self.alerts.clone(),
            unread_count: self.unread_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertStatus, Severity};

    fn alert(category: &str, message: &str, severity: Severity, status: AlertStatus) -> CanonicalAlert {
        CanonicalAlert {
            alert_type: Some("BUDGET".to_string()),
            severity,
            status,
            message: Some(message.to_string()),
            related_category: Some(category.to_string()),
            related_transaction_id: None,
        }
    }

    fn food() -> CanonicalAlert {
        alert("FOOD", "Over budget", Severity::High, AlertStatus::Active)
    }

    fn travel() -> CanonicalAlert {
        alert("TRAVEL", "EMI high", Severity::High, AlertStatus::Active)
    }

    fn notified(outcome: ApplyOutcome) -> Vec<CanonicalAlert> {
        match outcome {
            ApplyOutcome::Applied { notify } => notify,
            ApplyOutcome::Stale => panic!("expected poll to apply"),
        }
    }

    #[test]
    fn test_only_new_alert_notifies() {
        let mut tracker = AlertTracker::new();
        let t = tracker.begin();
        tracker.apply(t, vec![food()]);

        let t = tracker.begin();
        let notify = notified(tracker.apply(t, vec![food(), travel()]));

        assert_eq!(notify, vec![travel()]);
        assert_eq!(tracker.unread_count(), 2);
    }

    #[test]
    fn test_resolved_alert_does_not_notify() {
        let mut tracker = AlertTracker::new();
        let t = tracker.begin();
        tracker.apply(t, vec![food(), travel()]);

        let t = tracker.begin();
        let notify = notified(tracker.apply(t, vec![travel()]));

        assert!(notify.is_empty());
        assert_eq!(tracker.unread_count(), 1);
        assert_eq!(tracker.alerts(), &[travel()]);
    }

    #[test]
    fn test_still_active_alert_is_not_renotified() {
        let mut tracker = AlertTracker::new();
        let t = tracker.begin();
        assert_eq!(notified(tracker.apply(t, vec![food()])), vec![food()]);

        for _ in 0..3 {
            let t = tracker.begin();
            assert!(notified(tracker.apply(t, vec![food()])).is_empty());
        }
    }

    #[test]
    fn test_identity_ignores_type_and_severity_changes() {
        let mut tracker = AlertTracker::new();
        let t = tracker.begin();
        tracker.apply(t, vec![alert("FOOD", "Over budget", Severity::Low, AlertStatus::Active)]);

        // Same (category, message): not new even though it escalated.
        let t = tracker.begin();
        assert!(notified(tracker.apply(t, vec![food()])).is_empty());
    }

    #[test]
    fn test_low_or_inactive_alerts_never_notify() {
        let mut tracker = AlertTracker::new();
        let t = tracker.begin();
        let notify = notified(tracker.apply(
            t,
            vec![
                alert("BILLS", "Due soon", Severity::Medium, AlertStatus::Active),
                alert("LOANS", "EMI paid", Severity::High, AlertStatus::Resolved),
            ],
        ));
        assert!(notify.is_empty());
        assert_eq!(tracker.unread_count(), 1);
    }

    #[test]
    fn test_out_of_order_response_is_stale() {
        let mut tracker = AlertTracker::new();
        let slow = tracker.begin();
        let fast = tracker.begin();

        notified(tracker.apply(fast, vec![food(), travel()]));
        assert_eq!(tracker.apply(slow, vec![]), ApplyOutcome::Stale);
        assert_eq!(tracker.unread_count(), 2);
    }

    #[test]
    fn test_reset_clears_and_invalidates_in_flight_polls() {
        let mut tracker = AlertTracker::new();
        let t = tracker.begin();
        tracker.apply(t, vec![food()]);

        let in_flight = tracker.begin();
        tracker.reset();

        assert!(tracker.alerts().is_empty());
        assert_eq!(tracker.unread_count(), 0);
        assert_eq!(tracker.apply(in_flight, vec![travel()]), ApplyOutcome::Stale);

        // After a fresh login the old alert notifies again.
        let t = tracker.begin();
        assert_eq!(notified(tracker.apply(t, vec![food()])), vec![food()]);
    }
}
