//! Field resolution for loosely-typed backend payloads.
//!
//! Each canonical field is declared as an ordered list of raw paths. The
//! backend has renamed fields across versions, so supporting a new name is a
//! one-line change to the relevant list. Paths may be dotted to reach into
//! nested objects (`summary.totalIncome`).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

pub const TXN_ID: &[&str] = &["id", "transactionId"];
pub const TXN_DATE: &[&str] = &["date", "transactionDate"];
pub const TXN_MERCHANT: &[&str] = &["merchant", "normalizedMerchant", "rawDescription"];
pub const TXN_AMOUNT: &[&str] = &["amount"];
pub const TXN_TYPE: &[&str] = &["type", "transactionType"];
pub const TXN_CATEGORY: &[&str] = &["category", "systemCategory"];
pub const TXN_RECURRING: &[&str] = &["recurringFlag"];
pub const TXN_CONFIDENCE: &[&str] = &["confidence"];

pub const DASH_TRANSACTIONS: &[&str] = &["recentTransactions", "transactions"];
pub const DASH_TOTAL_INCOME: &[&str] = &["totalIncome", "summary.totalIncome"];
pub const DASH_TOTAL_EXPENSE: &[&str] = &[
    "totalExpense",
    "totalExpenses",
    "summary.totalExpense",
    "summary.totalExpenses",
];
pub const DASH_NET_BALANCE: &[&str] = &["netBalance", "summary.netBalance"];
pub const DASH_CATEGORY_BREAKDOWN: &[&str] = &["categoryBreakdown"];
pub const DASH_RECURRING: &[&str] = &["recurringPayments"];
pub const DASH_ALERTS: &[&str] = &["alerts"];

pub const RECURRING_MERCHANT: &[&str] = &["merchant"];
pub const RECURRING_AVERAGE: &[&str] = &["averageAmount"];
pub const RECURRING_INTERVAL: &[&str] = &["intervalDays"];
pub const RECURRING_CONFIDENCE: &[&str] = &["confidence"];

pub const ALERT_TYPE: &[&str] = &["type"];
pub const ALERT_SEVERITY: &[&str] = &["severity"];
pub const ALERT_STATUS: &[&str] = &["status"];
pub const ALERT_MESSAGE: &[&str] = &["message"];
pub const ALERT_CATEGORY: &[&str] = &["relatedCategory", "category"];
pub const ALERT_TRANSACTION: &[&str] = &["relatedTransactionId"];

pub const BUDGET_ID: &[&str] = &["id"];
pub const BUDGET_CATEGORY: &[&str] = &["category"];
pub const BUDGET_LIMIT: &[&str] = &["limitAmount", "limit"];
pub const BUDGET_SPENT: &[&str] = &["currentSpent", "spent"];

pub const ANALYTICS_INCOME: &[&str] = &["totalIncome"];
pub const ANALYTICS_EXPENSES: &[&str] = &["totalExpenses", "totalExpense"];
pub const ANALYTICS_SAVINGS: &[&str] = &["savings"];
pub const ANALYTICS_SAVINGS_RATIO: &[&str] = &["savingsRatio"];
pub const ANALYTICS_EXPENSE_RATIO: &[&str] = &["expenseRatio"];
pub const ANALYTICS_RISK_SCORE: &[&str] = &["riskScore"];

fn lookup<'a>(raw: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(raw, |node, key| node.get(key))
}

/// First value along `paths` that is neither `null` nor an empty string.
pub fn first_present<'a>(raw: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths.iter().find_map(|path| match lookup(raw, path) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v),
    })
}

/// Numeric coercion. Anything that does not read as a finite number is 0.
pub fn coerce_f64(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() { 0.0 } else { s.parse().unwrap_or(0.0) }
        }
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

/// Like [`coerce_f64`] but distinguishes "nothing usable" from zero.
pub fn coerce_opt_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

pub fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

pub fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD`, RFC 3339, naive ISO timestamps and `[y, m, d, ..]` arrays.
pub fn coerce_date(value: Option<&Value>) -> Option<NaiveDate> {
    match value? {
        Value::String(s) => parse_date(s.trim()),
        Value::Array(parts) => {
            let y = parts.first()?.as_i64()?;
            let m = parts.get(1)?.as_u64()?;
            let d = parts.get(2)?.as_u64()?;
            NaiveDate::from_ymd_opt(i32::try_from(y).ok()?, u32::try_from(m).ok()?, u32::try_from(d).ok()?)
        }
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Elements of the first array found along `paths`; non-arrays yield nothing.
pub fn array_at<'a>(raw: &'a Value, paths: &[&str]) -> &'a [Value] {
    match first_present(raw, paths) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}
