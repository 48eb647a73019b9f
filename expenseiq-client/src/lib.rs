//! expenseiq-client: backend HTTP client, session handling and the alert poller

pub mod api;
pub mod error;
pub mod poller;
pub mod session;

pub use api::{ApiClient, DEFAULT_BASE_URL};
pub use error::{ClientError, Result};
pub use poller::{
    AlertNotification, AlertPoller, DashboardSource, PollerState, DEFAULT_POLL_INTERVAL,
    NOTIFICATION_BUFFER,
};
pub use session::{Session, SessionHandle, SessionState, SessionStore, UserProfile};
