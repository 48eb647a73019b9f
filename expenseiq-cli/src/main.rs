use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use expenseiq_client::ApiClient;
use expenseiq_core::alerts::unread_count;
use expenseiq_core::{AlertView, CategoryCode, RecordId, TransactionType};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod render;
mod state;
mod watch;

use render::TransactionFilter;

#[derive(Parser, Debug)]
#[command(name = "expenseiq", version, about = "ExpenseIQ dashboard client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session in ~/.expenseiq/session.json
    Login {
        #[arg(long)]
        email: Option<String>,
    },

    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show who is signed in
    Whoami,

    /// Income, expenses, net balance and category breakdown
    Dashboard,

    /// List transactions
    Transactions {
        /// Month to list (YYYY-MM); defaults to all transactions
        #[arg(long)]
        month: Option<String>,

        /// Case-insensitive merchant search
        #[arg(long)]
        search: Option<String>,

        #[arg(long, value_parser = parse_category)]
        category: Option<CategoryCode>,

        /// CREDIT or DEBIT
        #[arg(long = "type", value_parser = parse_transaction_type)]
        transaction_type: Option<TransactionType>,

        /// Limit number of rows printed (default: 15)
        #[arg(long, default_value_t = 15)]
        limit: usize,

        /// Write the filtered list to a CSV file instead of printing it
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Recurring payments detected from statements
    Recurring,

    /// Per-category budgets
    Budgets {
        #[command(subcommand)]
        command: Option<BudgetCommand>,
    },

    /// Fetch alerts once and show the unread count
    Alerts,

    /// Poll alerts in the background and print new high severity alerts
    Watch {
        /// Seconds between polls (default: from config, 30)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Manage ~/.expenseiq/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    List,

    Create {
        #[arg(value_parser = parse_category)]
        category: CategoryCode,
        limit: f64,
    },

    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    Show,
}

fn parse_category(s: &str) -> std::result::Result<CategoryCode, String> {
    let code = CategoryCode::from_code(s);
    if code == CategoryCode::Others && !s.trim().eq_ignore_ascii_case("OTHERS") {
        let known: Vec<&str> = CategoryCode::ALL.iter().map(|c| c.code()).collect();
        return Err(format!("unknown category '{s}' (expected one of {})", known.join(", ")));
    }
    Ok(code)
}

fn parse_transaction_type(s: &str) -> std::result::Result<TransactionType, String> {
    match s.trim().to_ascii_uppercase().as_str() {
        "CREDIT" => Ok(TransactionType::Credit),
        "DEBIT" => Ok(TransactionType::Debit),
        _ => Err(format!("unknown transaction type '{s}' (expected CREDIT or DEBIT)")),
    }
}

fn init_tracing(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config()?;
    init_tracing(&cfg.log.filter);

    if let Command::Config { command } = &cli.command {
        return match command {
            ConfigCommand::Init => config::init_config(),
            ConfigCommand::Show => {
                println!("# {}", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
                Ok(())
            }
        };
    }

    let sessions = state::open_sessions()?;
    let base_url = cfg.base_url();
    let client = Arc::new(
        ApiClient::new(&base_url, sessions).with_context(|| format!("connect to {base_url}"))?,
    );
    tracing::debug!(base_url = %base_url, "using backend");

    match cli.command {
        Command::Login { email } => auth::login(&client, email).await?,
        Command::Register { name, email } => auth::register(&client, name, email).await?,
        Command::Logout => auth::logout(&client)?,
        Command::Whoami => auth::whoami(&client)?,

        Command::Dashboard => {
            auth::require_session(&client)?;
            let Some(dash) = client.dashboard().await.context("fetch dashboard")? else {
                println!("No dashboard data yet. Upload a statement to get started.");
                return Ok(());
            };
            // The dashboard still renders without analytics.
            let analytics = match client.analytics_summary().await {
                Ok(a) => a,
                Err(e) => {
                    tracing::warn!(error = %e, "analytics summary unavailable");
                    None
                }
            };
            render::print_dashboard(&dash, analytics.as_ref());
        }

        Command::Transactions {
            month,
            search,
            category,
            transaction_type,
            limit,
            export,
        } => {
            auth::require_session(&client)?;
            let txns = match &month {
                Some(m) => client.monthly_transactions(m).await,
                None => client.transactions().await,
            }
            .context("fetch transactions")?;

            let filter = TransactionFilter {
                search,
                category,
                transaction_type,
            };
            let matching: Vec<_> = txns.iter().filter(|t| filter.matches(t)).collect();

            match export {
                Some(path) => {
                    let n = render::export_csv(&path, matching.iter().copied())?;
                    println!("Wrote {} transactions to {}", n, path.display());
                }
                None => {
                    println!("{} of {} transactions\n", matching.len().min(limit), matching.len());
                    render::print_transactions(matching.iter().copied().take(limit));
                }
            }
        }

        Command::Recurring => {
            auth::require_session(&client)?;
            let dash = client.dashboard().await.context("fetch dashboard")?;
            render::print_recurring(dash.as_ref().map(|d| d.recurring.as_slice()).unwrap_or(&[]));
        }

        Command::Budgets { command } => {
            auth::require_session(&client)?;
            match command.unwrap_or(BudgetCommand::List) {
                BudgetCommand::List => {
                    let budgets = client.budgets().await.context("fetch budgets")?;
                    render::print_budgets(&budgets);
                }
                BudgetCommand::Create { category, limit } => {
                    if limit.is_nan() || limit <= 0.0 {
                        bail!("limit must be a positive amount");
                    }
                    client
                        .create_budget(category, limit)
                        .await
                        .context("create budget")?;
                    println!("Budget created: {} {}", category, render::money(limit));
                }
                BudgetCommand::Delete { id } => {
                    let id = match id.parse::<i64>() {
                        Ok(n) => RecordId::Number(n),
                        Err(_) => RecordId::Text(id),
                    };
                    client.delete_budget(&id).await.context("delete budget")?;
                    println!("Budget {} deleted", id);
                }
            }
        }

        Command::Alerts => {
            let session = auth::require_session(&client)?;
            if session.user.is_admin() {
                println!("Administrators do not receive personal budget alerts.");
                return Ok(());
            }
            let alerts = client
                .dashboard()
                .await
                .context("fetch dashboard")?
                .map(|d| d.alerts)
                .unwrap_or_default();
            let view = AlertView {
                unread_count: unread_count(&alerts),
                alerts,
            };
            render::print_alerts(&view);
        }

        Command::Watch { interval } => {
            let interval = match interval {
                Some(0) => bail!("--interval must be at least 1 second"),
                Some(secs) => std::time::Duration::from_secs(secs),
                None => cfg.poll_interval(),
            };
            watch::run(client, interval).await?;
        }

        // Handled before connecting.
        Command::Config { .. } => {}
    }

    Ok(())
}
