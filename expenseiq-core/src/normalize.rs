//! Response normalizer: reshapes raw backend payloads into the canonical model.
//!
//! None of these functions fail. Missing, renamed or mistyped fields fall back
//! to defaults so that partial data still renders.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::fields::{self, coerce_bool, coerce_date, coerce_f64, coerce_opt_f64, coerce_text, first_present};
use crate::model::{
    AlertStatus, AnalyticsSummary, Budget, CanonicalAlert, CanonicalDashboard,
    CanonicalRecurringItem, CanonicalSummary, CanonicalTransaction, CategoryCode, RecordId,
    Severity, TransactionType,
};

pub const UNKNOWN_MERCHANT: &str = "Unknown";

/// Strip a `{ success, data }` envelope when present.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("data").is_some_and(|d| !d.is_null()) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn record_id(value: Option<&Value>) -> Option<RecordId> {
    match value? {
        Value::Number(n) => n.as_i64().map(RecordId::Number).or_else(|| Some(RecordId::Text(n.to_string()))),
        Value::String(s) => Some(RecordId::Text(s.clone())),
        _ => None,
    }
}

fn unit_interval(n: f64) -> f64 {
    n.clamp(0.0, 1.0)
}

pub fn normalize_transaction(raw: &Value) -> CanonicalTransaction {
    CanonicalTransaction {
        id: record_id(first_present(raw, fields::TXN_ID)),
        date: coerce_date(first_present(raw, fields::TXN_DATE)),
        merchant: coerce_text(first_present(raw, fields::TXN_MERCHANT))
            .unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
        amount: coerce_f64(first_present(raw, fields::TXN_AMOUNT)),
        transaction_type: coerce_text(first_present(raw, fields::TXN_TYPE))
            .map(|t| TransactionType::from_code(&t))
            .unwrap_or(TransactionType::Debit),
        category: coerce_text(first_present(raw, fields::TXN_CATEGORY))
            .map(|c| CategoryCode::from_code(&c))
            .unwrap_or(CategoryCode::Others),
        recurring: coerce_bool(first_present(raw, fields::TXN_RECURRING)),
        confidence: unit_interval(coerce_f64(first_present(raw, fields::TXN_CONFIDENCE))),
    }
}

pub fn normalize_recurring(raw: &Value) -> CanonicalRecurringItem {
    CanonicalRecurringItem {
        merchant: coerce_text(first_present(raw, fields::RECURRING_MERCHANT)),
        average_amount: coerce_f64(first_present(raw, fields::RECURRING_AVERAGE)).abs(),
        interval_days: coerce_opt_f64(first_present(raw, fields::RECURRING_INTERVAL))
            .map(|d| d.round() as i64),
        confidence: unit_interval(coerce_f64(first_present(raw, fields::RECURRING_CONFIDENCE))),
    }
}

pub fn normalize_alert(raw: &Value) -> CanonicalAlert {
    CanonicalAlert {
        alert_type: coerce_text(first_present(raw, fields::ALERT_TYPE)),
        severity: coerce_text(first_present(raw, fields::ALERT_SEVERITY))
            .map(|s| Severity::from_code(&s))
            .unwrap_or(Severity::Medium),
        status: coerce_text(first_present(raw, fields::ALERT_STATUS))
            .map(|s| AlertStatus::from_code(&s))
            .unwrap_or(AlertStatus::Unknown),
        message: coerce_text(first_present(raw, fields::ALERT_MESSAGE)),
        related_category: coerce_text(first_present(raw, fields::ALERT_CATEGORY)),
        related_transaction_id: record_id(first_present(raw, fields::ALERT_TRANSACTION)),
    }
}

fn normalize_summary(raw: &Value) -> CanonicalSummary {
    let total_income = coerce_f64(first_present(raw, fields::DASH_TOTAL_INCOME));
    let total_expense = coerce_f64(first_present(raw, fields::DASH_TOTAL_EXPENSE));
    // An explicit backend value is trusted as-is.
    let net_balance = coerce_opt_f64(first_present(raw, fields::DASH_NET_BALANCE))
        .unwrap_or(total_income - total_expense);

    CanonicalSummary {
        total_income,
        total_expense,
        net_balance,
    }
}

fn category_breakdown(raw: &Value) -> BTreeMap<String, f64> {
    match first_present(raw, fields::DASH_CATEGORY_BREAKDOWN) {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(code, total)| (code.clone(), coerce_f64(Some(total))))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Normalize a dashboard payload. `None` (or JSON `null`) means "no data".
pub fn normalize_dashboard(raw: Option<&Value>) -> Option<CanonicalDashboard> {
    let raw = raw.filter(|v| !v.is_null())?;

    Some(CanonicalDashboard {
        summary: normalize_summary(raw),
        transactions: fields::array_at(raw, fields::DASH_TRANSACTIONS)
            .iter()
            .map(normalize_transaction)
            .collect(),
        category_breakdown: category_breakdown(raw),
        recurring: fields::array_at(raw, fields::DASH_RECURRING)
            .iter()
            .map(normalize_recurring)
            .collect(),
        alerts: fields::array_at(raw, fields::DASH_ALERTS)
            .iter()
            .map(normalize_alert)
            .collect(),
    })
}

pub fn normalize_budget(raw: &Value) -> Budget {
    Budget {
        id: record_id(first_present(raw, fields::BUDGET_ID)),
        category: coerce_text(first_present(raw, fields::BUDGET_CATEGORY))
            .map(|c| CategoryCode::from_code(&c))
            .unwrap_or(CategoryCode::Others),
        limit_amount: coerce_f64(first_present(raw, fields::BUDGET_LIMIT)),
        current_spent: coerce_f64(first_present(raw, fields::BUDGET_SPENT)),
    }
}

pub fn normalize_analytics_summary(raw: Option<&Value>) -> Option<AnalyticsSummary> {
    let raw = raw.filter(|v| v.is_object())?;

    Some(AnalyticsSummary {
        total_income: coerce_f64(first_present(raw, fields::ANALYTICS_INCOME)),
        total_expenses: coerce_f64(first_present(raw, fields::ANALYTICS_EXPENSES)),
        savings: coerce_f64(first_present(raw, fields::ANALYTICS_SAVINGS)),
        savings_ratio: coerce_f64(first_present(raw, fields::ANALYTICS_SAVINGS_RATIO)),
        expense_ratio: coerce_f64(first_present(raw, fields::ANALYTICS_EXPENSE_RATIO)),
        risk_score: coerce_f64(first_present(raw, fields::ANALYTICS_RISK_SCORE)),
    })
}

/// Map a list response. Accepts a bare array; anything else is an empty list.
pub fn normalize_list<T>(raw: &Value, f: impl Fn(&Value) -> T) -> Vec<T> {
    match raw {
        Value::Array(items) => items.iter().map(f).collect(),
        _ => Vec::new(),
    }
}
