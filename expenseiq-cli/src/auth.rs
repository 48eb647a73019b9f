use anyhow::{bail, Context, Result};
use expenseiq_client::{ApiClient, ClientError, Session};
use std::io::{self, Write};

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s).context("read stdin")?;
    Ok(s.trim().to_string())
}

// Plain stdin; the password is echoed. EXPENSEIQ_PASSWORD skips the prompt.
fn prompt_secret(label: &str) -> Result<String> {
    if let Ok(p) = std::env::var("EXPENSEIQ_PASSWORD") {
        return Ok(p);
    }
    prompt(label)
}

fn value_or_prompt(value: Option<String>, label: &str) -> Result<String> {
    let v = match value {
        Some(v) => v,
        None => prompt(label)?,
    };
    if v.is_empty() {
        bail!("{} is required", label.to_lowercase());
    }
    Ok(v)
}

fn describe(session: &Session) -> String {
    match &session.user.role {
        Some(role) => format!("{} <{}> ({})", session.user.name, session.user.email, role),
        None => format!("{} <{}>", session.user.name, session.user.email),
    }
}

fn explain(e: ClientError) -> anyhow::Error {
    match e {
        ClientError::Rejected(msg) => anyhow::anyhow!("{msg}"),
        other => anyhow::Error::new(other),
    }
}

pub async fn login(client: &ApiClient, email: Option<String>) -> Result<()> {
    let email = value_or_prompt(email, "Email")?;
    let password = prompt_secret("Password")?;

    let session = client.login(&email, &password).await.map_err(explain)?;
    println!("Signed in as {}", describe(&session));
    Ok(())
}

pub async fn register(client: &ApiClient, name: Option<String>, email: Option<String>) -> Result<()> {
    let name = value_or_prompt(name, "Name")?;
    let email = value_or_prompt(email, "Email")?;
    let password = prompt_secret("Password")?;
    if password.len() < 6 {
        bail!("password must be at least 6 characters");
    }

    let session = client.register(&name, &email, &password).await.map_err(explain)?;
    println!("Registered and signed in as {}", describe(&session));
    Ok(())
}

pub fn logout(client: &ApiClient) -> Result<()> {
    if !client.session().is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }
    client.logout().context("clear session")?;
    println!("Signed out.");
    Ok(())
}

pub fn whoami(client: &ApiClient) -> Result<()> {
    match client.session().current() {
        Some(session) => println!("{}", describe(&session)),
        None => println!("Not signed in. Run: expenseiq login"),
    }
    Ok(())
}

/// Fail early with a hint rather than letting the backend answer 401.
pub fn require_session(client: &ApiClient) -> Result<Session> {
    client
        .session()
        .current()
        .context("Not signed in. Run: expenseiq login")
}
