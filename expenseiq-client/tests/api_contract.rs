//! Exercises `ApiClient` against a local canned-response HTTP server.

use expenseiq_client::{
    AlertPoller, ApiClient, ClientError, Session, SessionHandle, SessionStore, UserProfile,
    DEFAULT_POLL_INTERVAL,
};
use expenseiq_core::{CategoryCode, Severity, TransactionType};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Raw text of every request the server received, in order.
type Seen = Arc<Mutex<Vec<String>>>;

async fn read_request(sock: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = sock.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Serve one canned response per connection, then stop accepting.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut sock, _) = listener.accept().await.unwrap();
            let req = read_request(&mut sock).await;
            log.lock().unwrap().push(req);
            respond(&mut sock, status, body).await;
        }
    });

    (format!("http://{addr}"), seen)
}

async fn respond(sock: &mut TcpStream, status: u16, body: &str) {
    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        _ => "Error",
    };
    let resp = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    sock.write_all(resp.as_bytes()).await.unwrap();
    let _ = sock.shutdown().await;
}

fn signed_in(role: &str) -> Session {
    Session {
        token: "jwt-xyz".to_string(),
        user: UserProfile {
            name: "Meera".to_string(),
            email: "meera@example.com".to_string(),
            role: Some(role.to_string()),
        },
    }
}

const DASHBOARD: &str = r#"{
    "success": true,
    "data": {
        "totalIncome": 1000,
        "totalExpense": 400,
        "recentTransactions": [
            { "id": 9, "normalizedMerchant": "IRCTC", "amount": "1200", "transactionType": "DEBIT", "systemCategory": "TRAVEL" }
        ],
        "alerts": [
            { "category": "TRAVEL", "message": "EMI high", "severity": "HIGH", "status": "ACTIVE" }
        ]
    }
}"#;

#[tokio::test]
async fn test_dashboard_is_unwrapped_and_normalized() {
    let (base, seen) = serve(vec![(200, DASHBOARD)]).await;
    let client = ApiClient::new(&base, SessionHandle::new(Some(signed_in("ROLE_USER")))).unwrap();

    let dash = client.dashboard().await.unwrap().unwrap();
    assert_eq!(dash.summary.net_balance, 600.0);
    assert_eq!(dash.transactions[0].merchant, "IRCTC");
    assert_eq!(dash.transactions[0].amount, 1200.0);
    assert_eq!(dash.transactions[0].transaction_type, TransactionType::Debit);
    assert_eq!(dash.transactions[0].category, CategoryCode::Travel);
    assert_eq!(dash.alerts[0].severity, Severity::High);

    let requests = seen.lock().unwrap();
    assert!(requests[0].starts_with("GET /api/dashboard "));
    assert!(requests[0].to_ascii_lowercase().contains("authorization: bearer jwt-xyz"));
}

#[tokio::test]
async fn test_unauthorized_clears_persisted_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));
    store.save(&signed_in("ROLE_USER")).unwrap();

    let sessions = SessionHandle::with_store(store.clone()).unwrap();
    assert!(sessions.is_authenticated());

    let (base, _seen) = serve(vec![(401, r#"{"message":"Token expired"}"#)]).await;
    let client = ApiClient::new(&base, sessions.clone()).unwrap();

    let err = client.budgets().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
    assert!(!sessions.is_authenticated());
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn test_late_unauthorized_keeps_newer_login() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (received_tx, received_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel::<()>();

    // Holds the 401 back until the test has signed someone else in.
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let req = read_request(&mut sock).await;
        let _ = received_tx.send(req);
        let _ = release_rx.await;
        respond(&mut sock, 401, r#"{"message":"Token expired"}"#).await;
    });

    let sessions = SessionHandle::new(Some(signed_in("ROLE_USER")));
    let client = ApiClient::new(&base, sessions.clone()).unwrap();
    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.budgets().await }
    });

    let req = received_rx.await.unwrap();
    assert!(req.to_ascii_lowercase().contains("authorization: bearer jwt-xyz"));

    let newer = Session {
        token: "jwt-next".to_string(),
        user: UserProfile {
            name: "Ravi".to_string(),
            email: "ravi@example.com".to_string(),
            role: Some("ROLE_USER".to_string()),
        },
    };
    sessions.sign_in(newer).unwrap();
    release_tx.send(()).unwrap();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized));
    assert_eq!(sessions.token().as_deref(), Some("jwt-next"));
}

#[tokio::test]
async fn test_login_signs_in_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));
    let sessions = SessionHandle::with_store(store.clone()).unwrap();

    let (base, seen) = serve(vec![(
        200,
        r#"{"success":true,"data":{"token":"fresh","name":"Meera","email":"meera@example.com","role":"ROLE_USER"}}"#,
    )])
    .await;
    let client = ApiClient::new(&base, sessions.clone()).unwrap();

    let session = client.login("meera@example.com", "hunter2").await.unwrap();
    assert_eq!(session.token, "fresh");
    assert_eq!(sessions.token().as_deref(), Some("fresh"));
    assert_eq!(store.load().unwrap().map(|s| s.user.email), Some("meera@example.com".to_string()));

    let requests = seen.lock().unwrap();
    assert!(requests[0].starts_with("POST /api/auth/login "));
    assert!(requests[0].contains(r#""email":"meera@example.com""#));
}

#[tokio::test]
async fn test_rejected_login_keeps_signed_out() {
    let (base, _seen) = serve(vec![(200, r#"{"success":false,"message":"Invalid credentials"}"#)]).await;
    let sessions = SessionHandle::new(None);
    let client = ApiClient::new(&base, sessions.clone()).unwrap();

    match client.login("meera@example.com", "wrong").await {
        Err(ClientError::Rejected(message)) => assert_eq!(message, "Invalid credentials"),
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(!sessions.is_authenticated());
}

#[tokio::test]
async fn test_server_error_carries_backend_message() {
    let (base, _seen) = serve(vec![(500, r#"{"message":"Budget already exists for FOOD"}"#)]).await;
    let client = ApiClient::new(&base, SessionHandle::new(Some(signed_in("ROLE_USER")))).unwrap();

    let err = client.create_budget(CategoryCode::Food, 5000.0).await.unwrap_err();
    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "Budget already exists for FOOD");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_poller_notifies_from_live_backend() {
    let (base, _seen) = serve(vec![(200, DASHBOARD)]).await;
    let sessions = SessionHandle::new(Some(signed_in("ROLE_USER")));
    let client = Arc::new(ApiClient::new(&base, sessions.clone()).unwrap());

    let (poller, mut rx) = AlertPoller::spawn(client, sessions.subscribe(), DEFAULT_POLL_INTERVAL);
    let notification = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(notification.headline(), "Budget Alert: EMI high");
    assert_eq!(poller.unread_count(), 1);
}
