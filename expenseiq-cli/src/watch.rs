use anyhow::Result;
use chrono::Local;
use expenseiq_client::{AlertNotification, AlertPoller, ApiClient, PollerState};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::require_session;

fn print_notification(n: &AlertNotification) {
    let category = n.alert.related_category.as_deref().unwrap_or("general");
    println!(
        "[{}] !! {} ({})",
        n.raised_at.with_timezone(&Local).format("%H:%M:%S"),
        n.headline(),
        category
    );
}

/// Poll alerts until Ctrl-C or until the session ends.
pub async fn run(client: Arc<ApiClient>, interval: Duration) -> Result<()> {
    let session = require_session(&client)?;
    if session.user.is_admin() {
        println!("Administrators do not receive personal budget alerts.");
        return Ok(());
    }

    let sessions = client.session().subscribe();
    let (poller, mut notifications) = AlertPoller::spawn(client.clone(), sessions, interval);
    let mut view = poller.subscribe();
    let mut state = poller.watch_state();

    println!(
        "Watching alerts for {} every {}s (Ctrl-C to stop)",
        session.user.email,
        interval.as_secs()
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_unread = None;

    loop {
        tokio::select! {
            Some(n) = notifications.recv() => print_notification(&n),
            Ok(()) = view.changed() => {
                let unread = view.borrow_and_update().unread_count;
                if last_unread != Some(unread) {
                    println!("Unread alerts: {unread}");
                    last_unread = Some(unread);
                }
            }
            Ok(()) = state.changed() => {
                if *state.borrow_and_update() == PollerState::Idle {
                    println!("Session ended. Sign in again with: expenseiq login");
                    break;
                }
            }
            _ = &mut ctrl_c => {
                tracing::debug!("interrupted");
                break;
            }
        }
    }

    Ok(())
}
