//! HTTP client for the ExpenseIQ backend.
//!
//! Every request carries the current bearer token. A 401 clears the local
//! session if the rejected token is still the one in use; everything else is
//! reported as a [`ClientError`].

use async_trait::async_trait;
use expenseiq_core::{
    normalize_analytics_summary, normalize_budget, normalize_dashboard, normalize_list,
    normalize_transaction, unwrap_envelope, AnalyticsSummary, Budget, CanonicalDashboard,
    CanonicalTransaction, CategoryCode, RecordId,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{ClientError, Result};
use crate::poller::DashboardSource;
use crate::session::{Session, SessionHandle, UserProfile};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BudgetRequest {
    category: CategoryCode,
    limit_amount: f64,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<AuthData>,
}

#[derive(Debug, Deserialize)]
struct AuthData {
    token: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: SessionHandle,
}

impl ApiClient {
    pub fn new(base_url: &str, session: SessionHandle) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::BaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        // No request timeout: a slow dashboard call only delays its own poll.
        let http = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        // Appended rather than joined so a base URL with a path prefix keeps it.
        let url = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        let req = self.http.request(method, url);
        match self.session.token() {
            Some(token) => req.header(AUTHORIZATION, bearer(&token)),
            None => req,
        }
    }

    /// A late 401 for a token that has since been replaced must not sign out
    /// whoever logged in after it.
    fn is_current_credential(&self, sent: Option<&HeaderValue>) -> bool {
        match (sent, self.session.token()) {
            (Some(sent), Some(token)) => sent.as_bytes() == bearer(&token).as_bytes(),
            _ => false,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value> {
        let (http, req) = req.build_split();
        let req = req?;
        let sent_auth = req.headers().get(AUTHORIZATION).cloned();
        let resp = http.execute(req).await?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            if self.is_current_credential(sent_auth.as_ref()) {
                self.session.invalidate();
            } else {
                tracing::debug!(path = resp.url().path(), "ignoring 401 for a superseded credential");
            }
            return Err(ClientError::Unauthorized);
        }

        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                message: error_message(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let req = self.request(Method::GET, path);
        self.send(req).await
    }

    async fn authenticate(&self, path: &str, body: &impl Serialize) -> Result<Session> {
        let req = self.request(Method::POST, path).json(body);
        let resp: AuthResponse = serde_json::from_value(self.send(req).await?)?;

        let data = match resp.data {
            Some(data) if resp.success => data,
            _ => {
                return Err(ClientError::Rejected(
                    resp.message.unwrap_or_else(|| "authentication failed".to_string()),
                ));
            }
        };

        let session = Session {
            token: data.token,
            user: UserProfile {
                name: data.name,
                email: data.email,
                role: data.role,
            },
        };
        self.session.sign_in(session.clone())?;
        Ok(session)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        self.authenticate("/api/auth/login", &LoginRequest { email, password })
            .await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Session> {
        self.authenticate(
            "/api/auth/register",
            &RegisterRequest {
                name,
                email,
                password,
            },
        )
        .await
    }

    pub fn logout(&self) -> Result<()> {
        self.session.sign_out()
    }

    /// `Ok(None)` when the backend returned no dashboard payload at all.
    pub async fn dashboard(&self) -> Result<Option<CanonicalDashboard>> {
        let raw = unwrap_envelope(self.get("/api/dashboard").await?);
        Ok(normalize_dashboard(Some(&raw)))
    }

    pub async fn transactions(&self) -> Result<Vec<CanonicalTransaction>> {
        let raw = unwrap_envelope(self.get("/api/transactions").await?);
        Ok(normalize_list(&raw, normalize_transaction))
    }

    /// `month` is `YYYY-MM`.
    pub async fn monthly_transactions(&self, month: &str) -> Result<Vec<CanonicalTransaction>> {
        let req = self
            .request(Method::GET, "/api/transactions/monthly")
            .query(&[("month", month)]);
        let raw = unwrap_envelope(self.send(req).await?);
        Ok(normalize_list(&raw, normalize_transaction))
    }

    /// Spend per category code as reported by the backend.
    pub async fn category_totals(&self) -> Result<BTreeMap<String, f64>> {
        let raw = unwrap_envelope(self.get("/api/transactions/category").await?);
        Ok(match raw {
            Value::Object(map) => map
                .iter()
                .map(|(code, total)| (code.clone(), expenseiq_core::fields::coerce_f64(Some(total))))
                .collect(),
            _ => BTreeMap::new(),
        })
    }

    pub async fn analytics_summary(&self) -> Result<Option<AnalyticsSummary>> {
        let raw = unwrap_envelope(self.get("/api/analytics/summary").await?);
        Ok(normalize_analytics_summary(Some(&raw)))
    }

    pub async fn budgets(&self) -> Result<Vec<Budget>> {
        let raw = unwrap_envelope(self.get("/api/budgets").await?);
        Ok(normalize_list(&raw, normalize_budget))
    }

    pub async fn create_budget(&self, category: CategoryCode, limit_amount: f64) -> Result<()> {
        let req = self
            .request(Method::POST, "/api/budgets")
            .json(&BudgetRequest {
                category,
                limit_amount,
            });
        self.send(req).await?;
        Ok(())
    }

    pub async fn delete_budget(&self, id: &RecordId) -> Result<()> {
        let req = self.request(Method::DELETE, &format!("/api/budgets/{id}"));
        self.send(req).await?;
        Ok(())
    }
}

#[async_trait]
impl DashboardSource for ApiClient {
    async fn fetch_dashboard(&self) -> Result<Option<CanonicalDashboard>> {
        self.dashboard().await
    }
}

/// Prefer the backend's `message` field; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_message_field() {
        assert_eq!(error_message(r#"{"success":false,"message":"Email already registered"}"#), "Email already registered");
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let err = ApiClient::new("not a url", SessionHandle::new(None)).unwrap_err();
        assert!(matches!(err, ClientError::BaseUrl { .. }));
    }

    #[test]
    fn test_request_attaches_bearer_token() {
        let session = SessionHandle::new(Some(Session {
            token: "jwt-123".to_string(),
            user: UserProfile {
                name: "Ravi".to_string(),
                email: "ravi@example.com".to_string(),
                role: None,
            },
        }));
        let client = ApiClient::new(DEFAULT_BASE_URL, session).unwrap();
        let req = client.request(Method::GET, "/api/dashboard").build().unwrap();

        assert_eq!(req.url().as_str(), "http://localhost:8080/api/dashboard");
        assert_eq!(req.headers().get(AUTHORIZATION).unwrap(), "Bearer jwt-123");
    }

    #[test]
    fn test_request_without_session_has_no_auth_header() {
        let client = ApiClient::new(DEFAULT_BASE_URL, SessionHandle::new(None)).unwrap();
        let req = client.request(Method::GET, "/api/budgets/7").build().unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_only_the_current_token_counts_as_rejected() {
        let user = |token: &str, email: &str| Session {
            token: token.to_string(),
            user: UserProfile {
                name: "Ravi".to_string(),
                email: email.to_string(),
                role: None,
            },
        };
        let sessions = SessionHandle::new(Some(user("old", "ravi@example.com")));
        let client = ApiClient::new(DEFAULT_BASE_URL, sessions.clone()).unwrap();
        let req = client.request(Method::GET, "/api/dashboard").build().unwrap();
        let sent = req.headers().get(AUTHORIZATION);

        assert!(client.is_current_credential(sent));

        sessions.sign_in(user("new", "meera@example.com")).unwrap();
        assert!(!client.is_current_credential(sent));
        assert!(!client.is_current_credential(None));
    }

    #[test]
    fn test_auth_response_parsing() {
        let raw = serde_json::json!({
            "success": true,
            "data": { "token": "t", "name": "Ravi", "email": "ravi@example.com", "role": "ROLE_USER" }
        });
        let resp: AuthResponse = serde_json::from_value(raw).unwrap();
        assert!(resp.success);
        assert_eq!(resp.data.unwrap().role.as_deref(), Some("ROLE_USER"));
    }
}
