/// HTTP client tests against a local stub backend.
///
/// Each test starts a one-shot `tiny_http` server on an ephemeral port,
/// points the client at it, and asserts on both the parsed result and the
/// captured request. Transport-failure tests use a port that was bound and
/// released, so connections are refused immediately.
use std::io::Read;
use std::net::TcpListener;
use std::thread;

use tiny_http::{Header, Response, Server};

use parley::api::{ApiClient, EnergyMode, SafetyStatus};
use parley::session::{ChatSession, Sender};

/// What the stub server saw.
struct CapturedRequest {
    method: String,
    url: String,
    body: String,
}

/// Serve exactly one request with a canned response; returns the base URL
/// and a handle yielding the captured request.
fn serve_one(status: u16, body: &str) -> (String, thread::JoinHandle<CapturedRequest>) {
    let server = Server::http("127.0.0.1:0").expect("bind stub server");
    let port = server
        .server_addr()
        .to_ip()
        .expect("tcp listen address")
        .port();
    let base = format!("http://127.0.0.1:{port}");

    let body = body.to_string();
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("one request");

        let mut req_body = String::new();
        let _ = request.as_reader().read_to_string(&mut req_body);
        let captured = CapturedRequest {
            method: request.method().to_string(),
            url: request.url().to_string(),
            body: req_body,
        };

        let response = Response::from_string(body)
            .with_status_code(status)
            .with_header(
                Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .expect("content-type header"),
            );
        let _ = request.respond(response);
        captured
    });

    (base, handle)
}

/// A base URL nothing is listening on.
fn unreachable_base() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

// ---------------------------------------------------------------------------
// POST /api/chat
// ---------------------------------------------------------------------------

#[test]
fn send_message_returns_the_backend_reply() {
    let (base, handle) = serve_one(200, r#"{"answer":"All clear.","status":"SAFE"}"#);
    let client = ApiClient::new(&base, 2000);

    let outcome = client.send_message("hello", "en");

    assert!(!outcome.is_fallback());
    let reply = outcome.reply();
    assert_eq!(reply.answer, "All clear.");
    assert_eq!(reply.status, SafetyStatus::Safe);

    let captured = handle.join().expect("stub thread");
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.url, "/api/chat");
}

#[test]
fn send_message_posts_message_and_lang_verbatim() {
    let (base, handle) = serve_one(200, r#"{"answer":"Wi.","status":"SAFE"}"#);
    let client = ApiClient::new(&base, 2000);

    client.send_message("Bonjou, kijan ou ye?", "ht");

    let captured = handle.join().expect("stub thread");
    let sent: serde_json::Value = serde_json::from_str(&captured.body).expect("request body");
    assert_eq!(sent["message"], "Bonjou, kijan ou ye?");
    assert_eq!(sent["lang"], "ht");
}

#[test]
fn reply_carried_in_an_http_error_still_reaches_the_caller() {
    // the backend labels refusals DENIED but may ship them on error statuses
    let (base, handle) = serve_one(
        403,
        r#"{"answer":"I can't share that.","status":"DENIED","audit_id":"aud-3"}"#,
    );
    let client = ApiClient::new(&base, 2000);

    let outcome = client.send_message("restricted question", "en");

    assert!(!outcome.is_fallback());
    let reply = outcome.reply();
    assert_eq!(reply.status, SafetyStatus::Denied);
    assert_eq!(reply.audit_id.as_deref(), Some("aud-3"));
    handle.join().expect("stub thread");
}

#[test]
fn send_message_never_fails_when_the_backend_is_unreachable() {
    let client = ApiClient::new(&unreachable_base(), 500);

    let outcome = client.send_message("anyone home?", "en");

    assert!(outcome.is_fallback());
    let reply = outcome.reply();
    assert_eq!(reply.status, SafetyStatus::Safe);
    assert!(!reply.answer.is_empty());
    assert!(reply.audit_id.is_none());
}

#[test]
fn send_message_falls_back_on_a_malformed_body() {
    let (base, handle) = serve_one(200, "<html>proxy error</html>");
    let client = ApiClient::new(&base, 2000);

    let outcome = client.send_message("hello", "en");

    assert!(outcome.is_fallback());
    assert_eq!(outcome.reply().status, SafetyStatus::Safe);
    handle.join().expect("stub thread");
}

#[test]
fn flagged_replies_end_up_attributed_to_the_guardian() {
    let (base, handle) = serve_one(
        200,
        r#"{"answer":"Let's slow down here.","status":"FLAGGED","audit_id":"aud-9"}"#,
    );
    let client = ApiClient::new(&base, 2000);
    let mut session = ChatSession::new("en");

    let text = session.begin_submit("something borderline").expect("accepted");
    let outcome = client.send_message(&text, session.lang());
    let msg = session.record_reply(&outcome);

    assert_eq!(msg.sender, Sender::Guardian);
    assert_eq!(msg.status, SafetyStatus::Flagged);
    assert_eq!(session.messages().len(), 2);
    handle.join().expect("stub thread");
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

#[test]
fn health_parses_the_snapshot_with_service_statuses() {
    let (base, handle) = serve_one(
        200,
        r#"{
            "ok": true,
            "status": "running",
            "mode": "peak",
            "timestamp": "2026-08-05T12:00:00Z",
            "services": {
                "assistant": "operational",
                "guardian": "operational",
                "retrieval": "degraded"
            }
        }"#,
    );
    let client = ApiClient::new(&base, 2000);

    let health = client.health().expect("health parses");

    assert!(health.ok);
    assert!(!health.is_shutdown());
    assert_eq!(health.mode, "peak");
    assert_eq!(health.services.len(), 3);
    assert_eq!(
        health.services.get("retrieval").map(String::as_str),
        Some("degraded")
    );

    let captured = handle.join().expect("stub thread");
    assert_eq!(captured.method, "GET");
    assert_eq!(captured.url, "/api/health");
}

#[test]
fn health_propagates_transport_errors() {
    let client = ApiClient::new(&unreachable_base(), 500);
    assert!(client.health().is_err());
}

// ---------------------------------------------------------------------------
// POST /api/mode
// ---------------------------------------------------------------------------

#[test]
fn set_mode_posts_the_requested_mode() {
    let (base, handle) = serve_one(
        200,
        r#"{"ok":true,"mode":"peak","message":"Energy mode changed from normal to peak"}"#,
    );
    let client = ApiClient::new(&base, 2000);

    let ack = client.set_mode(EnergyMode::Peak).expect("mode ack");

    assert!(ack.ok);
    assert_eq!(ack.mode, "peak");
    assert!(ack.message.is_some());

    let captured = handle.join().expect("stub thread");
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.url, "/api/mode");
    let sent: serde_json::Value = serde_json::from_str(&captured.body).expect("request body");
    assert_eq!(sent["mode"], "peak");
}

#[test]
fn mode_refusal_is_reported_in_the_ack() {
    let (base, handle) = serve_one(
        200,
        r#"{"ok":false,"mode":"normal","message":"Invalid mode. Valid modes: ['normal', 'peak']"}"#,
    );
    let client = ApiClient::new(&base, 2000);

    let ack = client.set_mode(EnergyMode::Peak).expect("ack parses");

    assert!(!ack.ok);
    assert_eq!(ack.mode, "normal");
    handle.join().expect("stub thread");
}

#[test]
fn set_mode_propagates_transport_errors() {
    let client = ApiClient::new(&unreachable_base(), 500);
    assert!(client.set_mode(EnergyMode::Normal).is_err());
}

// ---------------------------------------------------------------------------
// POST /api/shutdown
// ---------------------------------------------------------------------------

#[test]
fn shutdown_returns_the_audit_ack() {
    let (base, handle) = serve_one(
        200,
        r#"{"ok":true,"message":"System shutdown complete. All requests logged for audit compliance.","audit_id":"aud-123"}"#,
    );
    let client = ApiClient::new(&base, 2000);

    let ack = client.shutdown().expect("shutdown ack");

    assert!(ack.ok);
    assert_eq!(ack.audit_id, "aud-123");
    assert!(ack.message.contains("shutdown complete"));

    let captured = handle.join().expect("stub thread");
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.url, "/api/shutdown");
}

#[test]
fn shutdown_propagates_transport_errors() {
    let client = ApiClient::new(&unreachable_base(), 500);
    assert!(client.shutdown().is_err());
}
