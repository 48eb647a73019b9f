//! Canonical client-side model for dashboard, transaction, budget and alert data

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Spending categories known to the dashboard
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryCode {
    Food,
    Transport,
    Shopping,
    Bills,
    Travel,
    Payments,
    Loans,
    Utilities,
    Entertainment,
    Health,
    Salary,
    Investment,
    Others,
}

impl CategoryCode {
    pub const ALL: [CategoryCode; 13] = [
        CategoryCode::Food,
        CategoryCode::Transport,
        CategoryCode::Shopping,
        CategoryCode::Bills,
        CategoryCode::Travel,
        CategoryCode::Payments,
        CategoryCode::Loans,
        CategoryCode::Utilities,
        CategoryCode::Entertainment,
        CategoryCode::Health,
        CategoryCode::Salary,
        CategoryCode::Investment,
        CategoryCode::Others,
    ];

    /// Backend code for this category
    pub fn code(&self) -> &'static str {
        match self {
            CategoryCode::Food => "FOOD",
            CategoryCode::Transport => "TRANSPORT",
            CategoryCode::Shopping => "SHOPPING",
            CategoryCode::Bills => "BILLS",
            CategoryCode::Travel => "TRAVEL",
            CategoryCode::Payments => "PAYMENTS",
            CategoryCode::Loans => "LOANS",
            CategoryCode::Utilities => "UTILITIES",
            CategoryCode::Entertainment => "ENTERTAINMENT",
            CategoryCode::Health => "HEALTH",
            CategoryCode::Salary => "SALARY",
            CategoryCode::Investment => "INVESTMENT",
            CategoryCode::Others => "OTHERS",
        }
    }

    /// Resolve a backend code. Unknown or empty codes fall back to `Others`.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
            .unwrap_or(CategoryCode::Others)
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    /// Unknown values are treated as debits.
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("CREDIT") {
            TransactionType::Credit
        } else {
            TransactionType::Debit
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Unknown or missing severities default to `Medium`. Codes are matched
    /// exactly: a lowercase `"high"` is not a HIGH alert and never notifies.
    pub fn from_code(code: &str) -> Self {
        match code {
            "LOW" => Severity::Low,
            "HIGH" => Severity::High,
            _ => Severity::Medium,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        })
    }
}

/// Backend alert lifecycle. Only `Active` alerts count as unread.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Unknown,
}

impl AlertStatus {
    /// Exact match, like `Severity::from_code`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ACTIVE" => AlertStatus::Active,
            "ACKNOWLEDGED" | "READ" => AlertStatus::Acknowledged,
            "RESOLVED" | "DISMISSED" => AlertStatus::Resolved,
            _ => AlertStatus::Unknown,
        }
    }
}

/// Identifier as the backend sent it (numeric database ids or opaque strings)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{n}"),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTransaction {
    pub id: Option<RecordId>,
    pub date: Option<NaiveDate>,
    pub merchant: String,
    /// Magnitude as reported by the backend; direction comes from `transaction_type`
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub category: CategoryCode,
    pub recurring: bool,
    /// Categorisation confidence (0.0 - 1.0)
    pub confidence: f64,
}

impl CanonicalTransaction {
    pub fn is_credit(&self) -> bool {
        self.transaction_type == TransactionType::Credit
    }

    /// Amount with the sign implied by the transaction type (credits positive)
    pub fn signed_amount(&self) -> f64 {
        if self.is_credit() {
            self.amount.abs()
        } else {
            -self.amount.abs()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSummary {
    pub total_income: f64,
    pub total_expense: f64,
    pub net_balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecurringItem {
    pub merchant: Option<String>,
    pub average_amount: f64,
    pub interval_days: Option<i64>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalAlert {
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub severity: Severity,
    pub status: AlertStatus,
    pub message: Option<String>,
    pub related_category: Option<String>,
    pub related_transaction_id: Option<RecordId>,
}

impl CanonicalAlert {
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    /// HIGH severity alerts that are still active warrant a user-facing notification.
    pub fn is_notifiable(&self) -> bool {
        self.severity == Severity::High && self.is_active()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalDashboard {
    pub summary: CanonicalSummary,
    pub transactions: Vec<CanonicalTransaction>,
    /// Category code -> total, passed through from the backend
    pub category_breakdown: BTreeMap<String, f64>,
    pub recurring: Vec<CanonicalRecurringItem>,
    pub alerts: Vec<CanonicalAlert>,
}

impl CanonicalDashboard {
    /// Total monthly burden of detected recurring payments
    pub fn recurring_burden(&self) -> f64 {
        self.recurring.iter().map(|r| r.average_amount).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetStatus {
    OnTrack,
    Warning,
    Exceeded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: Option<RecordId>,
    pub category: CategoryCode,
    pub limit_amount: f64,
    pub current_spent: f64,
}

impl Budget {
    /// Spent as a percentage of the limit; 0 when no positive limit is set
    pub fn utilization_percent(&self) -> f64 {
        if self.limit_amount <= 0.0 {
            return 0.0;
        }
        self.current_spent / self.limit_amount * 100.0
    }

    pub fn status(&self) -> BudgetStatus {
        let percent = self.utilization_percent();
        if percent > 100.0 {
            BudgetStatus::Exceeded
        } else if percent > 80.0 {
            BudgetStatus::Warning
        } else {
            BudgetStatus::OnTrack
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.limit_amount - self.current_spent).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Healthy,
    Moderate,
    AtRisk,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Healthy => "Healthy",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::AtRisk => "At Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub savings: f64,
    pub savings_ratio: f64,
    pub expense_ratio: f64,
    /// Financial health score (0 - 100, higher is healthier)
    pub risk_score: f64,
}

impl AnalyticsSummary {
    pub fn risk_level(&self) -> RiskLevel {
        if self.risk_score >= 80.0 {
            RiskLevel::Healthy
        } else if self.risk_score >= 60.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::AtRisk
        }
    }
}
