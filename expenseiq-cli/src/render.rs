//! Terminal output for dashboard views, plus CSV export of transactions.

use anyhow::{Context, Result};
use expenseiq_core::{
    AlertView, AnalyticsSummary, Budget, BudgetStatus, CanonicalDashboard, CanonicalRecurringItem,
    CanonicalTransaction, CategoryCode, TransactionType,
};
use serde::Serialize;
use std::path::Path;

pub fn money(v: f64) -> String {
    let s = format!("{:.2}", v.abs());
    let (int, frac) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    let mut grouped = String::new();
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

/// Filters applied client-side, mirroring the transaction list view.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub search: Option<String>,
    pub category: Option<CategoryCode>,
    pub transaction_type: Option<TransactionType>,
}

impl TransactionFilter {
    pub fn matches(&self, txn: &CanonicalTransaction) -> bool {
        if let Some(q) = &self.search {
            if !txn.merchant.to_lowercase().contains(&q.to_lowercase()) {
                return false;
            }
        }
        self.category.is_none_or(|c| txn.category == c)
            && self.transaction_type.is_none_or(|t| txn.transaction_type == t)
    }
}

pub fn print_dashboard(dash: &CanonicalDashboard, analytics: Option<&AnalyticsSummary>) {
    println!("# Dashboard\n");
    println!("Income:      {:>14}", money(dash.summary.total_income));
    println!("Expenses:    {:>14}", money(dash.summary.total_expense));
    println!("Net balance: {:>14}", money(dash.summary.net_balance));

    if let Some(a) = analytics {
        println!(
            "Health:      {:>10}/100 ({})",
            a.risk_score.round(),
            a.risk_level().label()
        );
        println!("Savings:     {:>13.1}%", a.savings_ratio);
    }

    if !dash.category_breakdown.is_empty() {
        println!("\n## Spending by category\n");
        let mut rows: Vec<_> = dash.category_breakdown.iter().collect();
        rows.sort_by(|a, b| b.1.total_cmp(a.1));
        for (code, total) in rows {
            println!("- {:<14} {:>12}", code, money(*total));
        }
    }

    if !dash.transactions.is_empty() {
        println!("\n## Recent transactions\n");
        print_transactions(dash.transactions.iter().take(5));
    }

    let active = dash.alerts.iter().filter(|a| a.is_active()).count();
    if active > 0 {
        println!("\n{} active alert(s). Run: expenseiq alerts", active);
    }
}

pub fn print_transactions<'a>(txns: impl IntoIterator<Item = &'a CanonicalTransaction>) {
    for t in txns {
        let date = t
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        let marker = if t.recurring { " (recurring)" } else { "" };
        println!(
            "{} {:<6} {:>12} | {:<13} | {}{}",
            date,
            t.transaction_type.code(),
            money(t.signed_amount()),
            t.category.code(),
            t.merchant,
            marker
        );
    }
}

pub fn print_recurring(items: &[CanonicalRecurringItem]) {
    if items.is_empty() {
        println!("No recurring payments detected.");
        return;
    }
    let burden: f64 = items.iter().map(|r| r.average_amount).sum();
    println!("Monthly burden: {}\n", money(burden));
    for r in items {
        let every = r
            .interval_days
            .map(|d| format!("every {d} days"))
            .unwrap_or_else(|| "irregular".to_string());
        println!(
            "- {:<24} {:>12} | {:<16} | confidence {:.0}%",
            r.merchant.as_deref().unwrap_or("Unknown"),
            money(r.average_amount),
            every,
            r.confidence * 100.0
        );
    }
}

pub fn print_budgets(budgets: &[Budget]) {
    if budgets.is_empty() {
        println!("No budgets yet. Create one with: expenseiq budgets create <CATEGORY> <LIMIT>");
        return;
    }
    for b in budgets {
        let flag = match b.status() {
            BudgetStatus::OnTrack => "",
            BudgetStatus::Warning => "  [near limit]",
            BudgetStatus::Exceeded => "  [EXCEEDED]",
        };
        let id = b.id.as_ref().map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "#{:<5} {:<14} {:>12} / {:<12} {:>4.0}%{}",
            id,
            b.category.code(),
            money(b.current_spent),
            money(b.limit_amount),
            b.utilization_percent(),
            flag
        );
    }
}

pub fn print_alerts(view: &AlertView) {
    if view.alerts.is_empty() {
        println!("No alerts.");
        return;
    }
    println!("{} unread\n", view.unread_count);
    for a in &view.alerts {
        println!(
            "- [{}] {:?} {} ({})",
            a.severity,
            a.status,
            a.message.as_deref().unwrap_or("(no message)"),
            a.related_category.as_deref().unwrap_or("general")
        );
    }
}

#[derive(Debug, Serialize)]
struct TransactionRow<'a> {
    id: String,
    date: String,
    merchant: &'a str,
    amount: f64,
    #[serde(rename = "type")]
    transaction_type: &'static str,
    category: &'static str,
    recurring: bool,
    confidence: f64,
}

impl<'a> From<&'a CanonicalTransaction> for TransactionRow<'a> {
    fn from(t: &'a CanonicalTransaction) -> Self {
        Self {
            id: t.id.as_ref().map(|id| id.to_string()).unwrap_or_default(),
            date: t.date.map(|d| d.to_string()).unwrap_or_default(),
            merchant: &t.merchant,
            amount: t.amount,
            transaction_type: t.transaction_type.code(),
            category: t.category.code(),
            recurring: t.recurring,
            confidence: t.confidence,
        }
    }
}

pub fn export_csv<'a>(path: &Path, txns: impl IntoIterator<Item = &'a CanonicalTransaction>) -> Result<usize> {
    let mut w = csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    let mut n = 0;
    for t in txns {
        w.serialize(TransactionRow::from(t))
            .with_context(|| format!("write {}", path.display()))?;
        n += 1;
    }
    w.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use expenseiq_core::RecordId;

    fn txn(merchant: &str, category: CategoryCode, t: TransactionType) -> CanonicalTransaction {
        CanonicalTransaction {
            id: Some(RecordId::Number(42)),
            date: NaiveDate::from_ymd_opt(2025, 4, 2),
            merchant: merchant.to_string(),
            amount: 1250.5,
            transaction_type: t,
            category,
            recurring: false,
            confidence: 0.75,
        }
    }

    #[test]
    fn test_money_groups_thousands() {
        assert_eq!(money(0.0), "0.00");
        assert_eq!(money(999.5), "999.50");
        assert_eq!(money(1234567.891), "1,234,567.89");
        assert_eq!(money(-4500.0), "-4,500.00");
    }

    #[test]
    fn test_filter_by_search_category_and_type() {
        let swiggy = txn("Swiggy Instamart", CategoryCode::Food, TransactionType::Debit);
        let salary = txn("ACME Payroll", CategoryCode::Salary, TransactionType::Credit);

        let f = TransactionFilter {
            search: Some("swiggy".to_string()),
            ..Default::default()
        };
        assert!(f.matches(&swiggy));
        assert!(!f.matches(&salary));

        let f = TransactionFilter {
            category: Some(CategoryCode::Salary),
            transaction_type: Some(TransactionType::Credit),
            ..Default::default()
        };
        assert!(f.matches(&salary));
        assert!(!f.matches(&swiggy));

        assert!(TransactionFilter::default().matches(&swiggy));
    }

    #[test]
    fn test_export_csv_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("txns.csv");
        let txns = vec![txn("Uber", CategoryCode::Travel, TransactionType::Debit)];

        assert_eq!(export_csv(&path, &txns).unwrap(), 1);

        let out = std::fs::read_to_string(&path).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("id,date,merchant,amount,type,category,recurring,confidence"));
        assert_eq!(lines.next(), Some("42,2025-04-02,Uber,1250.5,DEBIT,TRAVEL,false,0.75"));
    }
}
