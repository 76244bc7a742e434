//! End-to-end integration tests for the UserRPC client.
//!
//! These tests drive complete flows against a scripted transport:
//! - connect → login → user operations → logout
//! - session identifier rotation and continuity
//! - fault isolation and state legality
//! - serialized access through the shared handle

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use client::testing::ScriptedTransport;
use client::{ClientConfig, ConnectionConfig, Session, SessionManager, SharedClient, UserId};
use protocol::{
    sign, CallContext, ClientError, ErrorKind, RpcValue, SessionState, TransportErrorKind,
    SIGNED_PREFIX_LEN,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const SECRET: &str = "0123456789abcdef";
const APP_ID: &str = "users.example.com";

fn test_config() -> ConnectionConfig {
    ConnectionConfig::new("users.example.com", "services/xmlrpc")
        .unwrap()
        .with_credentials(SECRET, APP_ID)
}

fn connect_reply(sessid: &str) -> RpcValue {
    RpcValue::structure([("sessid", RpcValue::from(sessid))])
}

fn login_reply(sessid: &str, uid: i64) -> RpcValue {
    RpcValue::structure([
        ("sessid", RpcValue::from(sessid)),
        (
            "user",
            RpcValue::structure([
                ("uid", RpcValue::Int(uid)),
                ("name", RpcValue::from("bob")),
            ]),
        ),
    ])
}

fn assert_valid_signature(params: &[RpcValue], method: &str) {
    let prefix: Vec<&str> = params[..SIGNED_PREFIX_LEN]
        .iter()
        .map(|value| value.as_str().unwrap())
        .collect();
    assert_eq!(prefix[1], APP_ID);
    assert_eq!(
        prefix[0],
        sign(SECRET, APP_ID, method, prefix[2], prefix[3]).unwrap()
    );
}

// =============================================================================
// Full Lifecycle
// =============================================================================

#[tokio::test]
async fn test_connect_login_delete_logout_scenario() {
    let manager = SessionManager::new(test_config(), ScriptedTransport::new());
    let transport = manager.transport();
    transport.push_success(connect_reply("S1"));
    transport.push_success(login_reply("S2", 42));
    transport.push_success(RpcValue::Bool(true));
    transport.push_success(RpcValue::Bool(true));
    let ctx = CallContext::new();

    let session = manager.connect(&ctx).await.unwrap();
    assert_eq!(session.session_id(), Some("S1"));

    let session = manager.login(&session, "bob", "pw", &ctx).await.unwrap();
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.session_id(), Some("S2"));
    assert_eq!(session.user_id(), Some(UserId(42)));

    manager
        .users()
        .delete(&session, UserId(42), &ctx)
        .await
        .unwrap();
    let delete_call = transport.last_sent().unwrap();
    assert_eq!(delete_call.method(), "user.delete");
    assert_eq!(delete_call.session_id(), Some("S2"));
    assert_valid_signature(delete_call.params(), "user.delete");

    let session = manager.logout(&session, &ctx).await.unwrap();
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(session.user_id(), None);
    assert_eq!(transport.remaining(), 0);
}

#[tokio::test]
async fn test_signed_calls_after_login_use_rotated_session() {
    let manager = SessionManager::new(test_config(), ScriptedTransport::new());
    let transport = manager.transport();
    transport.push_success(connect_reply("S1"));
    transport.push_success(login_reply("S2", 42));
    transport.push_success(RpcValue::Int(43));
    transport.push_success(RpcValue::Bool(true));
    transport.push_success(RpcValue::structure([
        ("uid", RpcValue::Int(43)),
        ("name", RpcValue::from("carol")),
        ("mail", RpcValue::from("carol@example.com")),
    ]));
    let ctx = CallContext::new();

    let session = manager.connect(&ctx).await.unwrap();
    let session = manager.login(&session, "bob", "pw", &ctx).await.unwrap();
    let users = manager.users();

    let uid = users
        .create(&session, "carol", "pw", "carol@example.com", &ctx)
        .await
        .unwrap();
    users
        .update(&session, uid, "carol", "pw2", "carol@example.com", &ctx)
        .await
        .unwrap();
    let record = users.get(&session, uid, &ctx).await.unwrap();
    assert_eq!(record.name, "carol");

    let sent = transport.sent();
    assert_eq!(sent.len(), 5);
    for call in &sent[2..] {
        assert_eq!(call.session_id(), Some("S2"));
        assert_valid_signature(call.params(), call.method());
    }
}

#[tokio::test]
async fn test_user_operations_allowed_without_login() {
    let manager = SessionManager::new(test_config(), ScriptedTransport::new());
    let transport = manager.transport();
    transport.push_success(connect_reply("S1"));
    transport.push_success(RpcValue::Int(7));
    let ctx = CallContext::new();

    let session = manager.connect(&ctx).await.unwrap();
    let uid = manager
        .users()
        .create(&session, "anon", "pw", "anon@example.com", &ctx)
        .await
        .unwrap();

    assert_eq!(uid, UserId(7));
    assert_eq!(transport.last_sent().unwrap().session_id(), Some("S1"));
}

// =============================================================================
// Fault Isolation And State Legality
// =============================================================================

#[tokio::test]
async fn test_login_fault_keeps_previous_session() {
    let client = SharedClient::new(test_config(), ScriptedTransport::new());
    let transport = client.manager().transport();
    transport.push_success(connect_reply("S1"));
    transport.push_fault(401, "Wrong username or password.");
    let ctx = CallContext::new();

    client.connect(&ctx).await.unwrap();
    let before = client.session().await;

    let err = client.login("bob", "wrong", &ctx).await.unwrap_err();
    match err {
        ClientError::RemoteFault { method, message, .. } => {
            assert_eq!(method, "user.login");
            assert_eq!(message, "Wrong username or password.");
        }
        other => panic!("expected remote fault, got {other:?}"),
    }

    assert_eq!(client.session().await, before);
    assert_eq!(client.state().await, SessionState::Connected);
}

#[tokio::test]
async fn test_operations_before_connect_fail_locally() {
    let client = SharedClient::new(test_config(), ScriptedTransport::new());
    let ctx = CallContext::new();

    let err = client.login("bob", "pw", &ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    let err = client.get_user(UserId(1), &ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    let err = client.logout(&ctx).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    assert!(client.manager().transport().sent().is_empty());
}

#[tokio::test]
async fn test_connection_loss_is_surfaced_then_marked() {
    let client = SharedClient::new(test_config(), ScriptedTransport::new());
    let transport = client.manager().transport();
    transport.push_success(connect_reply("S1"));
    transport.push_error(TransportErrorKind::ConnectionLost, "broken pipe");
    let ctx = CallContext::new();

    client.connect(&ctx).await.unwrap();
    let err = client.delete_user(UserId(3), &ctx).await.unwrap_err();

    match &err {
        ClientError::Transport(inner) => assert!(inner.is_connection_loss()),
        other => panic!("expected transport error, got {other:?}"),
    }
    // Not recovered automatically.
    assert_eq!(client.state().await, SessionState::Connected);

    client.mark_disconnected().await;
    assert_eq!(client.session().await, Session::Disconnected);
}

#[tokio::test]
async fn test_unsigned_configuration_rejects_signed_calls() {
    let config = ConnectionConfig::new("users.example.com", "services/xmlrpc").unwrap();
    let client = SharedClient::new(config, ScriptedTransport::new());
    client
        .manager()
        .transport()
        .push_success(connect_reply("S1"));
    let ctx = CallContext::new();

    client.connect(&ctx).await.unwrap();
    let err = client
        .create_user("a", "b", "c", &ctx)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(client.manager().transport().sent().len(), 1);
}

// =============================================================================
// Cancellation And Deadlines
// =============================================================================

#[tokio::test]
async fn test_cancellation_token_reaches_transport() {
    let manager = SessionManager::new(test_config(), ScriptedTransport::new());
    manager.transport().push_success(connect_reply("S1"));

    let token = CancellationToken::new();
    token.cancel();
    let ctx = CallContext::new()
        .with_deadline(tokio::time::Instant::now() + Duration::from_secs(1))
        .with_cancellation(token);

    let err = manager.connect(&ctx).await.unwrap_err();
    match err {
        ClientError::Transport(inner) => assert_eq!(inner.kind, TransportErrorKind::Cancelled),
        other => panic!("expected cancellation, got {other:?}"),
    }
    // The scripted reply was never consumed.
    assert_eq!(manager.transport().remaining(), 1);
}

// =============================================================================
// Shared Handle
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_client_serializes_concurrent_calls() {
    let client = Arc::new(SharedClient::new(test_config(), ScriptedTransport::new()));
    let transport = client.manager().transport();
    transport.push_success(connect_reply("S1"));
    transport.push_success(login_reply("S2", 42));
    for _ in 0..8 {
        transport.push_success(RpcValue::Bool(true));
    }

    client.connect(&CallContext::new()).await.unwrap();
    client.login("bob", "pw", &CallContext::new()).await.unwrap();

    let mut handles = Vec::new();
    for uid in 0..8 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client.delete_user(UserId(uid), &CallContext::new()).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let sent = client.manager().transport().sent();
    assert_eq!(sent.len(), 10);
    let nonces: std::collections::HashSet<_> = sent[2..]
        .iter()
        .map(|call| call.params()[3].as_str().map(str::to_string))
        .collect();
    assert_eq!(nonces.len(), 8);
    assert!(sent[2..].iter().all(|call| call.session_id() == Some("S2")));
}

// =============================================================================
// Configuration File
// =============================================================================

#[tokio::test]
async fn test_client_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        format!(
            "[server]\nhost = \"users.example.com\"\nport = 8080\npath = \"services/xmlrpc\"\n\n[auth]\napp_id = \"{APP_ID}\"\nsecret = \"{SECRET}\"\n"
        ),
    )
    .unwrap();

    let config = ClientConfig::load(&path).unwrap();
    let connection = config.to_connection_config().unwrap();
    assert_eq!(
        connection.endpoint(),
        "http://users.example.com:8080/services/xmlrpc"
    );

    let manager = SessionManager::new(connection, ScriptedTransport::new());
    manager.transport().push_success(connect_reply("S1"));
    manager.transport().push_success(login_reply("S2", 42));
    let ctx = CallContext::new();
    let session = manager.connect(&ctx).await.unwrap();
    manager.login(&session, "bob", "pw", &ctx).await.unwrap();

    assert_valid_signature(
        manager.transport().last_sent().unwrap().params(),
        "user.login",
    );
}

// =============================================================================
// Logging
// =============================================================================

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_logs_never_contain_secret_or_password() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let manager = SessionManager::new(test_config(), ScriptedTransport::new());
    manager.transport().push_success(connect_reply("S1"));
    manager.transport().push_success(login_reply("S2", 42));
    let ctx = CallContext::new();
    let session = manager.connect(&ctx).await.unwrap();
    manager
        .login(&session, "bob", "hunter2", &ctx)
        .await
        .unwrap();

    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("Logged in"));
    assert!(!output.contains(SECRET));
    assert!(!output.contains("hunter2"));
}
