use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use sentinel_dash::backend::Backend;
use sentinel_dash::config::schema::FeedConfig;
use sentinel_dash::dashboard::{Change, FETCH_ERROR_TEXT, SIMULATION_ERROR_TEXT};
use sentinel_dash::feed::{self, AlertFeed, FeedEvent, FeedState, ReconnectPolicy};
use sentinel_dash::journal::Journal;
use sentinel_dash::protocol::pretty_json;
use sentinel_dash::session::{Session, SessionEvent, SessionOptions};
/// Session lifecycle tests.
///
/// Runs real sessions against an in-process backend and, for the push
/// path, a local WebSocket server.
use serde_json::{Value, json};
use tungstenite::Message;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeBackend {
    fetches: AtomicUsize,
    fail: bool,
}

impl FakeBackend {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl Backend for FakeBackend {
    fn fetch_system_data(&self) -> Result<Value> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            bail!("connection refused");
        }
        Ok(json!({"status": "normal", "tick": n}))
    }

    fn simulate_attack(&self) -> Result<String> {
        if self.fail {
            bail!("connection refused");
        }
        Ok("Ransomware simulation triggered.".to_string())
    }
}

fn options(poll_interval: Option<Duration>) -> SessionOptions {
    SessionOptions {
        poll_interval,
        feed: None,
        log_tail: 10,
    }
}

/// Collect events until one matches `done`, or panic after `timeout`.
fn wait_for(
    events: &Receiver<SessionEvent>,
    timeout: Duration,
    done: impl Fn(&SessionEvent) -> bool,
) -> Vec<SessionEvent> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    loop {
        let left = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or_else(|| panic!("timed out waiting; saw {seen:?}"));
        let event = events
            .recv_timeout(left)
            .unwrap_or_else(|_| panic!("timed out waiting; saw {seen:?}"));
        let matched = done(&event);
        seen.push(event);
        if matched {
            return seen;
        }
    }
}

fn changed(change: Change) -> impl Fn(&SessionEvent) -> bool {
    move |event| *event == SessionEvent::Changed(change)
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[test]
fn start_fetches_immediately() {
    let backend = Arc::new(FakeBackend::default());
    let mut session = Session::start(options(None), backend.clone(), Journal::disabled()).unwrap();
    let events = session.take_events().unwrap();

    wait_for(&events, Duration::from_secs(5), changed(Change::Snapshot));
    let dash = session.dashboard();
    assert_eq!(
        dash.snapshot_text(),
        pretty_json(&json!({"status": "normal", "tick": 1}))
    );
    assert_eq!(backend.fetches(), 1);

    session.stop();
    assert!(session.is_stopped());
}

#[test]
fn poll_keeps_fetching_until_stopped() {
    let backend = Arc::new(FakeBackend::default());
    let mut session = Session::start(
        options(Some(Duration::from_millis(50))),
        backend.clone(),
        Journal::disabled(),
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while backend.fetches() < 4 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(backend.fetches() >= 4, "only {} fetches", backend.fetches());

    session.stop();
    // Let any fetch already in flight land before sampling.
    thread::sleep(Duration::from_millis(100));
    let after_stop = backend.fetches();
    thread::sleep(Duration::from_millis(250));
    assert_eq!(backend.fetches(), after_stop);
}

#[test]
fn failed_fetch_shows_fixed_error_text() {
    let backend = Arc::new(FakeBackend::failing());
    let mut session = Session::start(options(None), backend, Journal::disabled()).unwrap();
    let events = session.take_events().unwrap();

    wait_for(&events, Duration::from_secs(5), changed(Change::Snapshot));
    assert_eq!(session.dashboard().snapshot_text(), FETCH_ERROR_TEXT);
}

#[test]
fn manual_refresh_fetches_again() {
    let backend = Arc::new(FakeBackend::default());
    let mut session = Session::start(options(None), backend.clone(), Journal::disabled()).unwrap();
    let events = session.take_events().unwrap();
    wait_for(&events, Duration::from_secs(5), changed(Change::Snapshot));

    session.refresh();
    wait_for(&events, Duration::from_secs(5), changed(Change::Snapshot));
    assert_eq!(backend.fetches(), 2);
    assert!(session.dashboard().snapshot_text().contains("\"tick\": 2"));
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[test]
fn simulate_shows_backend_message() {
    let backend = Arc::new(FakeBackend::default());
    let mut session = Session::start(options(None), backend, Journal::disabled()).unwrap();
    let events = session.take_events().unwrap();

    session.handle().simulate_attack();
    wait_for(&events, Duration::from_secs(5), changed(Change::Acknowledgment));
    assert_eq!(
        session.dashboard().acknowledgment(),
        Some("Ransomware simulation triggered.")
    );

    session.handle().dismiss_acknowledgment();
    wait_for(&events, Duration::from_secs(5), changed(Change::Acknowledgment));
    assert_eq!(session.dashboard().acknowledgment(), None);
}

#[test]
fn failed_simulate_shows_fixed_error_text() {
    let backend = Arc::new(FakeBackend::failing());
    let mut session = Session::start(options(None), backend, Journal::disabled()).unwrap();
    let events = session.take_events().unwrap();

    session.simulate_attack();
    wait_for(&events, Duration::from_secs(5), changed(Change::Acknowledgment));
    assert_eq!(
        session.dashboard().acknowledgment(),
        Some(SIMULATION_ERROR_TEXT)
    );
}

#[test]
fn request_quit_reaches_event_loop() {
    let backend = Arc::new(FakeBackend::default());
    let mut session = Session::start(options(None), backend, Journal::disabled()).unwrap();
    let events = session.take_events().unwrap();
    assert!(session.take_events().is_none());

    session.handle().request_quit();
    wait_for(&events, Duration::from_secs(5), |e| {
        *e == SessionEvent::QuitRequested
    });
}

// ---------------------------------------------------------------------------
// Alerts socket
// ---------------------------------------------------------------------------

#[test]
fn pushed_frames_update_regions_and_junk_is_ignored() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (go_tx, go_rx) = mpsc::channel::<()>();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        go_rx.recv().unwrap();

        for frame in [
            r#"{"type":"live_tracking","data":{"cpu_usage":5}}"#,
            "{not json",
            r#"{"type":"ping","message":"keepalive"}"#,
            r#"{"type":"alert","alert":"Potential ransomware detected!","data":{"file":"a.locked"}}"#,
            r#"{"type":"system_data","data":{"status":"ransomware detected"}}"#,
        ] {
            socket.send(Message::text(frame)).unwrap();
        }

        // Hold the connection until the client goes away.
        while socket.read().is_ok() {}
    });

    let backend = Arc::new(FakeBackend::default());
    let feed = AlertFeed::new(
        format!("ws://127.0.0.1:{port}/ws/alerts?token=t"),
        Duration::from_millis(50),
        ReconnectPolicy::never(),
    );
    let mut session = Session::start(
        SessionOptions {
            poll_interval: None,
            feed: Some(feed),
            log_tail: 10,
        },
        backend,
        Journal::disabled(),
    )
    .unwrap();
    let events = session.take_events().unwrap();

    // Wait for both the initial fetch and the socket to be up.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let dash = session.dashboard();
        if dash.feed_state() == FeedState::Connected && dash.summary().is_some() {
            break;
        }
        assert!(Instant::now() < deadline, "session never settled");
        thread::sleep(Duration::from_millis(10));
    }
    while events.try_recv().is_ok() {}

    go_tx.send(()).unwrap();
    let seen = wait_for(&events, Duration::from_secs(5), changed(Change::Snapshot));
    assert_eq!(
        seen,
        vec![
            SessionEvent::Changed(Change::Alert),
            SessionEvent::Changed(Change::Snapshot),
        ]
    );

    let dash = session.dashboard();
    assert!(dash.alert().visible);
    assert_eq!(
        dash.alert().text,
        "ALERT: Potential ransomware detected!\n{\n  \"file\": \"a.locked\"\n}"
    );
    assert_eq!(
        dash.snapshot_text(),
        pretty_json(&json!({"status": "ransomware detected"}))
    );

    session.stop();
    assert_eq!(session.dashboard().feed_state(), FeedState::Disconnected);
    server.join().unwrap();
}

#[test]
fn stop_does_not_wait_on_a_silent_handshake() {
    // Accepts TCP but never answers the upgrade request.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let holder = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_secs(3));
        drop(stream);
    });

    let feed = AlertFeed::new(
        format!("ws://127.0.0.1:{port}/ws/alerts?token=t"),
        Duration::from_millis(50),
        ReconnectPolicy::never(),
    )
    .with_connect_timeout(Duration::from_secs(60));
    let mut session = Session::start(
        SessionOptions {
            poll_interval: None,
            feed: Some(feed),
            log_tail: 10,
        },
        Arc::new(FakeBackend::default()),
        Journal::disabled(),
    )
    .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while session.dashboard().feed_state() != FeedState::Connecting {
        assert!(Instant::now() < deadline, "feed never started connecting");
        thread::sleep(Duration::from_millis(10));
    }
    thread::sleep(Duration::from_millis(100));

    let (done_tx, done_rx) = mpsc::channel();
    let stopper = thread::spawn(move || {
        session.stop();
        let _ = done_tx.send(session.dashboard().feed_state());
    });

    let state = done_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("stop() did not return while the handshake was pending");
    assert_eq!(state, FeedState::Disconnected);
    stopper.join().unwrap();
    holder.join().unwrap();
}

#[test]
fn dropped_socket_reconnects_with_backoff() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = thread::spawn(move || {
        // First connection: one frame, then a clean close from the server.
        let (stream, _) = listener.accept().unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        socket
            .send(Message::text(r#"{"type":"alert","alert":"first","data":1}"#))
            .unwrap();
        socket.close(None).unwrap();
        while socket.read().is_ok() {}

        // Second connection: one frame, then hold until the client leaves.
        let (stream, _) = listener.accept().unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        socket
            .send(Message::text(r#"{"type":"alert","alert":"second","data":2}"#))
            .unwrap();
        while socket.read().is_ok() {}
    });

    let policy = ReconnectPolicy::from_config(&FeedConfig {
        reconnect: true,
        initial_backoff_ms: 50,
        max_backoff_ms: 100,
        ..FeedConfig::default()
    });
    let feed = AlertFeed::new(
        format!("ws://127.0.0.1:{port}/ws/alerts?token=t"),
        Duration::from_millis(50),
        policy,
    );

    let stop = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let reader = feed::spawn(feed, Arc::clone(&stop), move |event| {
        let _ = tx.send(event);
    })
    .unwrap();

    let mut seen = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !seen.contains(&FeedEvent::Frame(
        r#"{"type":"alert","alert":"second","data":2}"#.to_string(),
    )) {
        let left = deadline
            .checked_duration_since(Instant::now())
            .unwrap_or_else(|| panic!("no reconnect; saw {seen:?}"));
        seen.push(
            rx.recv_timeout(left)
                .unwrap_or_else(|_| panic!("no reconnect; saw {seen:?}")),
        );
    }

    stop.store(true, Ordering::SeqCst);
    reader.join().unwrap();
    server.join().unwrap();
    seen.extend(rx.try_iter());

    assert_eq!(
        seen,
        vec![
            FeedEvent::State(FeedState::Connecting),
            FeedEvent::State(FeedState::Connected),
            FeedEvent::Frame(r#"{"type":"alert","alert":"first","data":1}"#.to_string()),
            FeedEvent::State(FeedState::Retrying {
                attempt: 1,
                delay: Duration::from_millis(50),
            }),
            FeedEvent::State(FeedState::Connecting),
            FeedEvent::State(FeedState::Connected),
            FeedEvent::Frame(r#"{"type":"alert","alert":"second","data":2}"#.to_string()),
            FeedEvent::State(FeedState::Disconnected),
        ]
    );
}
