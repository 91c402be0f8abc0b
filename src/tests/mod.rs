use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::classifier::Indicators;
use crate::runner::{AttackEvent, AttackSession, AttackSpec, Outcome};

struct StubRequest {
    method: String,
    path: String,
    body: String,
}

struct StubResponse {
    status: u16,
    location: Option<String>,
    body: String,
}

fn ok(body: &str) -> StubResponse {
    StubResponse {
        status: 200,
        location: None,
        body: body.to_string(),
    }
}

fn redirect(location: &str) -> StubResponse {
    StubResponse {
        status: 302,
        location: Some(location.to_string()),
        body: String::new(),
    }
}

// minimal HTTP/1.1 responder on a random local port; the returned counter
// tracks POST requests only, i.e. actual login attempts
async fn spawn_stub<F>(respond: F) -> (String, Arc<AtomicUsize>)
where
    F: Fn(&StubRequest) -> StubResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let posts = Arc::new(AtomicUsize::new(0));
    let respond = Arc::new(respond);

    let posts_task = Arc::clone(&posts);
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let respond = Arc::clone(&respond);
            let posts = Arc::clone(&posts_task);
            tokio::spawn(async move {
                if let Some(request) = read_request(&mut socket).await {
                    if request.method == "POST" {
                        posts.fetch_add(1, Ordering::SeqCst);
                    }
                    let response = respond(&request);
                    let payload = render_response(&response);
                    let _ = socket.write_all(payload.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });
        }
    });

    (format!("http://{addr}"), posts)
}

async fn read_request(socket: &mut TcpStream) -> Option<StubRequest> {
    let mut buf: Vec<u8> = Vec::new();
    let mut tmp = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > 65536 {
            return None;
        }
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut first = head.lines().next()?.split_whitespace();
    let method = first.next()?.to_string();
    let path = first.next()?.to_string();

    let content_length = head
        .lines()
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some(StubRequest { method, path, body })
}

fn render_response(response: &StubResponse) -> String {
    let reason = match response.status {
        200 => "OK",
        302 => "Found",
        _ => "OK",
    };
    let mut out = format!("HTTP/1.1 {} {}\r\n", response.status, reason);
    if let Some(location) = response.location.as_deref() {
        out.push_str(&format!("Location: {location}\r\n"));
    }
    out.push_str(&format!(
        "Content-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.body.len(),
        response.body
    ));
    out
}

fn collect_events() -> (mpsc::Sender<AttackEvent>, JoinHandle<Vec<AttackEvent>>) {
    let (tx, mut rx) = mpsc::channel::<AttackEvent>(1024);
    let handle = tokio::spawn(async move {
        let mut out = Vec::new();
        while let Some(event) = rx.recv().await {
            out.push(event);
        }
        out
    });
    (tx, handle)
}

fn spec_for(url: String) -> AttackSpec {
    AttackSpec {
        url,
        username: "admin".to_string(),
        indicators: Indicators {
            success_literal: Some("welcome".to_string()),
            failure_literal: Some("invalid password".to_string()),
            ..Default::default()
        },
        concurrency: 1,
        ..Default::default()
    }
}

fn passwords(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn sequential_run_finds_the_password_and_stops_dispatch() {
    let (base, posts) = spawn_stub(|req| {
        if req.body.contains("password=correct") {
            ok("<h1>Welcome back, admin</h1>")
        } else {
            ok("Login failed: invalid password")
        }
    })
    .await;

    let session = AttackSession::new(spec_for(format!("{base}/login"))).unwrap();
    let (tx, events) = collect_events();
    let summary = session
        .run(passwords(&["wrong1", "wrong2", "correct", "wrong3"]), tx)
        .await
        .unwrap();

    assert_eq!(summary.found.as_deref(), Some("correct"));
    assert_eq!(summary.total, 4);
    // the trailing candidate is never dispatched to the network
    assert_eq!(posts.load(Ordering::SeqCst), 3);

    let events = events.await.unwrap();
    let successes: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            AttackEvent::Attempt(Outcome::Success { password }) => Some(password.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(successes, vec!["correct"]);
    assert!(events
        .iter()
        .any(|e| matches!(e, AttackEvent::Terminal { found: Some(p) } if p == "correct")));
}

#[tokio::test]
async fn captcha_detection_halts_the_run_after_one_attempt() {
    let (base, posts) = spawn_stub(|_| ok("Please verify you are human")).await;

    let session = AttackSession::new(spec_for(format!("{base}/login"))).unwrap();
    let (tx, events) = collect_events();
    let summary = session.run(passwords(&["a", "b", "c"]), tx).await.unwrap();

    assert_eq!(summary.found, None);
    assert_eq!(posts.load(Ordering::SeqCst), 1);

    let events = events.await.unwrap();
    let captchas = events
        .iter()
        .filter(|e| matches!(e, AttackEvent::Attempt(Outcome::CaptchaDetected { .. })))
        .count();
    assert_eq!(captchas, 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, AttackEvent::Terminal { found: None })));
}

#[tokio::test]
async fn followed_redirect_counts_as_success_despite_failure_text() {
    let (base, posts) = spawn_stub(|req| {
        if req.method == "POST" && req.path == "/login" {
            redirect("/dashboard")
        } else {
            ok("invalid password (stale session)")
        }
    })
    .await;

    let session = AttackSession::new(spec_for(format!("{base}/login"))).unwrap();
    let (tx, _events) = collect_events();
    let summary = session.run(passwords(&["letmein"]), tx).await.unwrap();

    assert_eq!(summary.found.as_deref(), Some("letmein"));
    assert_eq!(posts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exhausted_list_reports_not_found_with_progress_at_intervals() {
    let (base, _posts) = spawn_stub(|_| ok("nope: invalid password")).await;

    let mut spec = spec_for(format!("{base}/login"));
    spec.concurrency = 2;
    spec.progress_interval = 2;
    let session = AttackSession::new(spec).unwrap();
    let (tx, events) = collect_events();
    let summary = session
        .run(passwords(&["p1", "p2", "p3", "p4", "p5"]), tx)
        .await
        .unwrap();

    assert_eq!(summary.found, None);
    assert_eq!(summary.attempted, 5);

    let events = events.await.unwrap();
    let mut progress: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            AttackEvent::Progress { tried, total } => {
                assert_eq!(*total, 5);
                Some(*tried)
            }
            _ => None,
        })
        .collect();
    progress.sort_unstable();
    // interval multiples plus exactly one event for the final count
    assert_eq!(progress, vec![2, 4, 5]);

    let failures = events
        .iter()
        .filter(|e| matches!(e, AttackEvent::Attempt(Outcome::ExplicitFailure { .. })))
        .count();
    assert_eq!(failures, 5);
}

#[tokio::test]
async fn unmatched_body_is_reported_as_ambiguous() {
    let (base, _posts) = spawn_stub(|_| ok("<html>nothing of note</html>")).await;

    let session = AttackSession::new(spec_for(format!("{base}/login"))).unwrap();
    let (tx, events) = collect_events();
    let summary = session.run(passwords(&["only"]), tx).await.unwrap();

    assert_eq!(summary.found, None);
    let events = events.await.unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        AttackEvent::Attempt(Outcome::AmbiguousFailure { password }) if password == "only"
    )));
}

#[tokio::test]
async fn transport_errors_do_not_abort_the_run() {
    // bind then drop so the port refuses connections
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = AttackSession::new(spec_for(format!("http://{addr}/login"))).unwrap();
    let (tx, events) = collect_events();
    let summary = session.run(passwords(&["a", "b"]), tx).await.unwrap();

    assert_eq!(summary.found, None);
    assert_eq!(summary.attempted, 2);

    let events = events.await.unwrap();
    let errors = events
        .iter()
        .filter(|e| matches!(e, AttackEvent::Attempt(Outcome::TransportError { .. })))
        .count();
    assert_eq!(errors, 2);
}

#[tokio::test]
async fn external_cancellation_stops_new_dispatch() {
    let (base, posts) = spawn_stub(|_| ok("nope: invalid password")).await;

    let session = AttackSession::new(spec_for(format!("{base}/login"))).unwrap();
    let handle = session.cancel_handle();
    handle.cancel();

    let (tx, _events) = collect_events();
    let summary = session
        .run(passwords(&["p1", "p2", "p3"]), tx)
        .await
        .unwrap();

    // cancelled before the pool spun up: nothing reaches the network
    assert_eq!(summary.found, None);
    assert_eq!(posts.load(Ordering::SeqCst), 0);
}
