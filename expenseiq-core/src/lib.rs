//! expenseiq-core: canonical dashboard model, response normalization and alert tracking

pub mod alerts;
pub mod fields;
pub mod model;
pub mod normalize;

pub use alerts::{AlertKey, AlertTracker, AlertView, ApplyOutcome, PollTicket};
pub use model::{
    AlertStatus, AnalyticsSummary, Budget, BudgetStatus, CanonicalAlert, CanonicalDashboard,
    CanonicalRecurringItem, CanonicalSummary, CanonicalTransaction, CategoryCode, RecordId,
    RiskLevel, Severity, TransactionType,
};
pub use normalize::{
    normalize_alert, normalize_analytics_summary, normalize_budget, normalize_dashboard,
    normalize_list, normalize_recurring, normalize_transaction, unwrap_envelope,
};
