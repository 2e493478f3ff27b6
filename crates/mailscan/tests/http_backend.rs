//! HTTP backend tests against a loopback server
//!
//! Each test starts a tiny HTTP/1.1 responder on 127.0.0.1 that records the
//! requests it receives and answers from a routing closure.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mailscan::backend::api::{ClassificationRequest, EmailPayload};
use mailscan::{
    Classifier, CredentialBundle, FanOut, HttpBackend, MessageId, MessageRecord, MessageSource,
    RetrievalError, RetrievalParams, ScanError, ScanMode, ScanOptions, ScanSession, SessionId,
    StaticGateway,
};
use serde_json::{Value, json};

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    body: Value,
}

type Route = dyn Fn(&str, &str, &Value) -> (u16, String) + Send + Sync;

struct TestServer {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl TestServer {
    fn start(route: impl Fn(&str, &str, &Value) -> (u16, String) + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let route: Arc<Route> = Arc::new(route);
        let seen = requests.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let route = route.clone();
                let seen = seen.clone();
                std::thread::spawn(move || handle(stream, route.as_ref(), &seen));
            }
        });

        Self { base_url, requests }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn backend(&self) -> HttpBackend {
        HttpBackend::new(&self.base_url, Duration::from_secs(5)).unwrap()
    }
}

fn handle(stream: TcpStream, route: &Route, seen: &Mutex<Vec<Recorded>>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut chunked = false;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            } else if name == "transfer-encoding" && value.eq_ignore_ascii_case("chunked") {
                chunked = true;
            }
        }
    }

    let raw = if chunked {
        read_chunked(&mut reader)
    } else {
        let mut buf = vec![0u8; content_length];
        reader.read_exact(&mut buf).unwrap();
        buf
    };
    let body: Value = serde_json::from_slice(&raw).unwrap_or(Value::Null);

    let (status, response_body) = route(&method, &path, &body);
    seen.lock().unwrap().push(Recorded { method, path, body });

    let response = format!(
        "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        response_body.len(),
        response_body
    );
    let mut stream = stream;
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn read_chunked(reader: &mut BufReader<TcpStream>) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line).unwrap();
        let size = usize::from_str_radix(size_line.trim(), 16).unwrap_or(0);
        let mut chunk = vec![0u8; size + 2];
        reader.read_exact(&mut chunk).unwrap();
        if size == 0 {
            return out;
        }
        out.extend_from_slice(&chunk[..size]);
    }
}

/// A listener that accepts connections and never answers them
fn silent_backend(timeout: Duration) -> HttpBackend {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    HttpBackend::new(&base_url, timeout).unwrap()
}

fn bundle() -> CredentialBundle {
    CredentialBundle::bearer("ya29.token", "cid.apps.example", "shh", "user_42")
}

fn inbox_json() -> String {
    json!({
        "messages": [
            {"id": "m1", "sender_name": "PayPal Support", "sender_email": "support@paypa1.example",
             "subject": "Your account is limited", "body": "Verify now at http://paypa1.example/login",
             "urls": ["http://paypa1.example/login"]},
            {"id": "m2", "sender_email": "mom@example.com", "subject": "Dinner",
             "body": "Sunday at 6?", "urls": []}
        ]
    })
    .to_string()
}

#[test]
fn test_fetch_messages_sends_token_envelope() {
    let server = TestServer::start(|_, _, _| (200, inbox_json()));
    let payload = server
        .backend()
        .fetch_messages(&bundle(), &RetrievalParams::default())
        .unwrap();

    assert_eq!(payload["messages"].as_array().unwrap().len(), 2);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/get-messages/");
    assert_eq!(
        requests[0].body,
        json!({
            "token": {
                "token": {
                    "access_token": "ya29.token",
                    "client_id": "cid.apps.example",
                    "client_secret": "shh",
                    "userId": "user_42",
                    "token_type": "Bearer"
                },
                "maxResults": 10,
                "labelIds": ["INBOX"],
                "includeSpamTrash": false
            }
        })
    );
}

#[test]
fn test_fetch_messages_reports_error_body() {
    let server = TestServer::start(|_, _, _| (400, json!({"error": "Token is required"}).to_string()));
    let err = server
        .backend()
        .fetch_messages(&bundle(), &RetrievalParams::default())
        .unwrap_err();

    assert_eq!(
        err,
        RetrievalError::Status {
            status: 400,
            reason: "Token is required".to_string()
        }
    );
}

#[test]
fn test_fetch_messages_without_error_body_uses_status() {
    let server = TestServer::start(|_, _, _| (502, "<html>bad gateway</html>".to_string()));
    let err = server
        .backend()
        .fetch_messages(&bundle(), &RetrievalParams::default())
        .unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert!(err.to_string().contains("HTTP 502"));
}

#[test]
fn test_unreachable_backend_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let backend =
        HttpBackend::new(&format!("http://127.0.0.1:{}", port), Duration::from_secs(2)).unwrap();

    let err = backend
        .fetch_messages(&bundle(), &RetrievalParams::default())
        .unwrap_err();
    assert!(matches!(err, RetrievalError::Transport(_)));
}

#[test]
fn test_timed_out_requests_are_transport_errors() {
    let backend = silent_backend(Duration::from_millis(500));
    let record = MessageRecord::builder(MessageId::new("m1")).build();

    let started = Instant::now();
    let err = backend
        .fetch_messages(&bundle(), &RetrievalParams::default())
        .unwrap_err();
    assert!(matches!(err, RetrievalError::Transport(_)), "{:?}", err);

    let err = backend
        .classify_batch(&ClassificationRequest::from_records([&record]))
        .unwrap_err();
    assert!(matches!(err, ScanError::Transport(_)), "{:?}", err);

    let err = backend
        .classify_one(&EmailPayload::from(&record))
        .unwrap_err();
    assert!(matches!(err, ScanError::Transport(_)), "{:?}", err);

    // Three requests, each cut off by the timeout rather than hanging
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_classify_batch_round_trip() {
    let server = TestServer::start(|_, _, body| {
        let verdicts: Vec<Value> = body["emails"]
            .as_array()
            .map(|emails| {
                emails
                    .iter()
                    .map(|e| json!({"id": e["id"], "phishingScore": 85.4, "isPhishing": true}))
                    .collect()
            })
            .unwrap_or_default();
        (200, Value::Array(verdicts).to_string())
    });

    let record = MessageRecord::builder(MessageId::new("m1"))
        .sender_name("Bank")
        .subject("Locked")
        .body("Verify")
        .urls(vec!["http://a.example".into(), "http://b.example".into()])
        .build();
    let verdicts = server
        .backend()
        .classify_batch(&ClassificationRequest::from_records([&record]))
        .unwrap();

    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts[0].id, MessageId::new("m1"));
    assert_eq!(verdicts[0].risk_score, 85);
    assert!(verdicts[0].is_flagged);

    let requests = server.requests();
    assert_eq!(requests[0].path, "/check-phishing");
    assert_eq!(
        requests[0].body["emails"][0]["urls"],
        json!("http://a.example,http://b.example")
    );
    assert_eq!(requests[0].body["emails"][0]["sender"], json!("Bank"));
}

#[test]
fn test_classify_batch_accepts_numeric_ids() {
    let server = TestServer::start(|_, _, _| {
        (200, json!([{"id": 42, "phishingScore": 77.0, "isPhishing": true}]).to_string())
    });
    let record = MessageRecord::builder(MessageId::new("42")).build();

    let verdicts = server
        .backend()
        .classify_batch(&ClassificationRequest::from_records([&record]))
        .unwrap();
    assert_eq!(verdicts[0].id, MessageId::new("42"));
    assert_eq!(verdicts[0].risk_score, 77);
}

#[test]
fn test_classify_rejection_and_garbage() {
    let rejecting = TestServer::start(|_, _, _| (500, "{}".to_string()));
    let record = MessageRecord::builder(MessageId::new("m1")).build();
    let request = ClassificationRequest::from_records([&record]);
    assert_eq!(
        rejecting.backend().classify_batch(&request).unwrap_err(),
        ScanError::Rejected { status: 500 }
    );

    let garbled = TestServer::start(|_, _, _| (200, "not json".to_string()));
    assert!(matches!(
        garbled.backend().classify_batch(&request).unwrap_err(),
        ScanError::Decode(_)
    ));
}

#[test]
fn test_classify_one_posts_bare_fields() {
    let server = TestServer::start(|_, _, _| {
        (200, json!({"phishingScore": 41.0, "isPhishing": false}).to_string())
    });
    let record = MessageRecord::builder(MessageId::new("m7"))
        .sender_address("ops@example.com")
        .subject("Report")
        .body("Numbers attached")
        .build();

    let verdict = server
        .backend()
        .classify_one(&EmailPayload::from(&record))
        .unwrap();
    assert_eq!(verdict.id, MessageId::new("m7"));
    assert_eq!(verdict.risk_score, 41);
    assert!(!verdict.is_flagged);

    let body = &server.requests()[0].body;
    assert_eq!(
        body,
        &json!({"body": "Numbers attached", "subject": "Report", "urls": "", "sender": "ops@example.com"})
    );
}

#[test]
fn test_health() {
    let server = TestServer::start(|method, path, _| match (method, path) {
        ("GET", "/health") => (
            200,
            json!({"status": "healthy", "service": "phishing-detector"}).to_string(),
        ),
        _ => (404, "{}".to_string()),
    });

    let health = server.backend().health().unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.service, "phishing-detector");
}

#[test]
fn test_session_over_http_resets_on_failed_scan() {
    let fail_scans = Arc::new(Mutex::new(false));
    let flag = fail_scans.clone();
    let server = TestServer::start(move |_, path, body| match path {
        "/get-messages/" => (200, inbox_json()),
        "/check-phishing" if *flag.lock().unwrap() => (500, "{}".to_string()),
        "/check-phishing" => {
            let verdicts: Vec<Value> = body["emails"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|e| {
                    let flagged = e["id"] == "m1";
                    let score = if flagged { 85 } else { 10 };
                    json!({"id": e["id"], "phishingScore": score, "isPhishing": flagged})
                })
                .collect();
            (200, Value::Array(verdicts).to_string())
        }
        _ => (404, "{}".to_string()),
    });

    let backend = Arc::new(server.backend());
    let session = ScanSession::new(
        Arc::new(StaticGateway::new(bundle())),
        backend.clone(),
        backend,
    );

    session.load(&SessionId::new("user_42")).unwrap();
    let report = session.scan().unwrap();
    assert_eq!(report.summary.phishing, 1);
    assert_eq!(session.phishing()[0].sender_display_name, "PayPal Support");

    *fail_scans.lock().unwrap() = true;
    let report = session.scan().unwrap();
    assert!(report.fallback_fired());
    assert_eq!(report.summary.phishing, 0);
    assert!(session.records().iter().all(|r| r.risk_score() == 0));
}

#[test]
fn test_session_per_message_fan_out_over_http() {
    let server = TestServer::start(|_, path, body| match path {
        "/get-messages/" => (200, inbox_json()),
        "/check-phishing" if body["subject"] == "Dinner" => (503, "{}".to_string()),
        "/check-phishing" => (
            200,
            json!({"phishingScore": 92.0, "isPhishing": true}).to_string(),
        ),
        _ => (404, "{}".to_string()),
    });

    let backend = Arc::new(server.backend());
    let session = ScanSession::new(
        Arc::new(StaticGateway::new(bundle())),
        backend.clone(),
        backend,
    )
    .with_options(ScanOptions {
        fan_out: FanOut::PerMessage,
        ..ScanOptions::default()
    });
    session.load(&SessionId::new("user_42")).unwrap();
    session.set_mode(ScanMode::All);

    let report = session.scan().unwrap();
    assert_eq!(report.outcome.requests_sent, 2);
    assert_eq!(report.outcome.failed_requests, 1);

    let m1 = session.record(&MessageId::new("m1")).unwrap();
    assert_eq!(m1.risk_score(), 92);
    assert!(m1.is_flagged());
    let m2 = session.record(&MessageId::new("m2")).unwrap();
    assert_eq!(m2.risk_score(), 0);
}

#[test]
fn test_session_resets_when_classifier_times_out() {
    let stall = Arc::new(Mutex::new(false));
    let flag = stall.clone();
    let server = TestServer::start(move |_, path, body| match path {
        "/get-messages/" => (200, inbox_json()),
        "/check-phishing" => {
            if *flag.lock().unwrap() {
                std::thread::sleep(Duration::from_secs(2));
            }
            let verdicts: Vec<Value> = body["emails"]
                .as_array()
                .into_iter()
                .flatten()
                .map(|e| {
                    let flagged = e["id"] == "m1";
                    json!({"id": e["id"], "phishingScore": if flagged { 90 } else { 5 }, "isPhishing": flagged})
                })
                .collect();
            (200, Value::Array(verdicts).to_string())
        }
        _ => (404, "{}".to_string()),
    });

    let backend = Arc::new(HttpBackend::new(&server.base_url, Duration::from_millis(500)).unwrap());
    let session = ScanSession::new(
        Arc::new(StaticGateway::new(bundle())),
        backend.clone(),
        backend,
    );

    session.load(&SessionId::new("user_42")).unwrap();
    let report = session.scan().unwrap();
    assert_eq!(report.summary.phishing, 1);
    assert_eq!(session.record(&MessageId::new("m1")).unwrap().risk_score(), 90);

    *stall.lock().unwrap() = true;
    let report = session.scan().unwrap();
    assert!(report.fallback_fired());
    assert!(report.outcome.error.is_some());
    assert_eq!(report.summary.phishing, 0);
    assert!(session.records().iter().all(|r| r.risk_score() == 0 && !r.is_flagged()));
}
