//! Alerts socket subscription.
//!
//! Opens `ws://…/ws/alerts?token=…` with the synchronous `tungstenite`
//! client and hands every text frame to a callback. The reader runs on its
//! own thread; a short socket read timeout lets it notice the stop flag
//! without waiting for the next frame.

pub mod backoff;

use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tungstenite::client::IntoClientRequest;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{HandshakeError, Message, WebSocket};

pub use backoff::{FeedState, ReconnectPolicy};

use crate::config::{self, SentinelConfig};

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Granularity of interruptible sleeps between reconnect attempts.
const STOP_POLL: Duration = Duration::from_millis(50);

/// Connect and handshake timeout when none is configured.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// What the feed reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    State(FeedState),
    Frame(String),
}

/// Why a connected socket stopped delivering frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ended {
    Stopped,
    Closed,
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// Alerts socket client with its reconnect policy.
#[derive(Debug, Clone)]
pub struct AlertFeed {
    url: String,
    read_timeout: Duration,
    connect_timeout: Duration,
    policy: ReconnectPolicy,
}

impl AlertFeed {
    pub fn new(url: impl Into<String>, read_timeout: Duration, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            read_timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            policy,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Build a feed from the resolved config.
    pub fn from_config(config: &SentinelConfig) -> Result<Self> {
        let url = config::alerts_url(&config.backend)?;
        Ok(Self::new(
            url,
            Duration::from_millis(config.feed.read_timeout_ms.max(10)),
            ReconnectPolicy::from_config(&config.feed),
        )
        .with_connect_timeout(Duration::from_millis(config.feed.connect_timeout_ms.max(10))))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run the feed until `stop` is set or the policy gives up.
    ///
    /// Always finishes by reporting [`FeedState::Disconnected`].
    pub fn run(&mut self, stop: &AtomicBool, mut on_event: impl FnMut(FeedEvent)) {
        while !stop.load(Ordering::SeqCst) {
            on_event(FeedEvent::State(FeedState::Connecting));

            match connect_until(&self.url, self.read_timeout, self.connect_timeout, stop) {
                Ok(mut socket) => {
                    self.policy.on_connected();
                    tracing::info!(url = %self.url, "alert feed connected");
                    on_event(FeedEvent::State(FeedState::Connected));

                    match pump(&mut socket, stop, &mut on_event) {
                        Ok(Ended::Stopped) => {
                            let _ = socket.close(None);
                            let _ = socket.flush();
                            break;
                        }
                        Ok(Ended::Closed) => tracing::warn!("alert feed closed by server"),
                        Err(e) => tracing::warn!("alert feed error: {e:#}"),
                    }
                }
                Err(e) => tracing::warn!("alert feed connection failed: {e:#}"),
            }

            let Some(delay) = self.policy.next_delay() else {
                break;
            };
            on_event(FeedEvent::State(FeedState::Retrying {
                attempt: self.policy.attempt(),
                delay,
            }));
            sleep_unless_stopped(delay, stop);
        }

        on_event(FeedEvent::State(FeedState::Disconnected));
    }
}

/// Open the socket with bounded connect, handshake and read waits.
pub fn connect(url: &str, read_timeout: Duration, connect_timeout: Duration) -> Result<Socket> {
    connect_until(url, read_timeout, connect_timeout, &AtomicBool::new(false))
}

/// Like [`connect`], but gives up as soon as `stop` is set.
///
/// The read timeout is applied before the upgrade request goes out, so a
/// server that accepts TCP and never answers cannot pin the caller.
fn connect_until(
    url: &str,
    read_timeout: Duration,
    connect_timeout: Duration,
    stop: &AtomicBool,
) -> Result<Socket> {
    let request = url
        .into_client_request()
        .with_context(|| format!("invalid alerts url {url}"))?;
    let uri = request.uri();
    let host = uri
        .host()
        .with_context(|| format!("alerts url {url} has no host"))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = uri
        .port_u16()
        .unwrap_or(if uri.scheme_str() == Some("wss") { 443 } else { 80 });

    let stream = open_tcp(&host, port, connect_timeout)
        .with_context(|| format!("failed to connect to {url}"))?;
    stream
        .set_read_timeout(Some(read_timeout))
        .and_then(|()| stream.set_write_timeout(Some(connect_timeout)))
        .context("failed to set socket timeouts")?;

    let deadline = Instant::now().checked_add(connect_timeout);
    let mut attempt = tungstenite::client_tls(request, stream);
    loop {
        match attempt {
            Ok((socket, _response)) => return Ok(socket),
            Err(HandshakeError::Failure(e)) => {
                return Err(e).with_context(|| format!("handshake with {url} failed"));
            }
            Err(HandshakeError::Interrupted(mid)) => {
                if stop.load(Ordering::SeqCst) {
                    anyhow::bail!("stopped during handshake with {url}");
                }
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    anyhow::bail!("handshake with {url} timed out after {connect_timeout:?}");
                }
                attempt = mid.handshake();
            }
        }
    }
}

/// Try each resolved address in turn with a connect timeout.
fn open_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let mut last_err = None;
    for addr in (host, port)
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve {host}"))?
    {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    match last_err {
        Some(e) => Err(e.into()),
        None => anyhow::bail!("{host} resolved to no addresses"),
    }
}

/// Read frames until the server goes away or `stop` is set.
fn pump(
    socket: &mut Socket,
    stop: &AtomicBool,
    on_event: &mut impl FnMut(FeedEvent),
) -> Result<Ended> {
    loop {
        if stop.load(Ordering::SeqCst) {
            return Ok(Ended::Stopped);
        }

        match socket.read() {
            Ok(Message::Text(text)) => on_event(FeedEvent::Frame(text)),
            Ok(Message::Close(frame)) => {
                tracing::debug!(?frame, "alert feed received close frame");
            }
            // Binary and control frames carry nothing for the dashboard;
            // pings are answered by tungstenite itself.
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                continue;
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return Ok(Ended::Closed);
            }
            Err(e) => return Err(e).context("alert feed read failed"),
        }
    }
}

fn sleep_unless_stopped(delay: Duration, stop: &AtomicBool) {
    let started = Instant::now();
    while !stop.load(Ordering::SeqCst) {
        let elapsed = started.elapsed();
        if elapsed >= delay {
            return;
        }
        thread::sleep((delay - elapsed).min(STOP_POLL));
    }
}

/// Spawn [`AlertFeed::run`] on a named thread.
pub fn spawn(
    mut feed: AlertFeed,
    stop: std::sync::Arc<AtomicBool>,
    on_event: impl FnMut(FeedEvent) + Send + 'static,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("alert-feed".to_string())
        .spawn(move || feed.run(&stop, on_event))
        .context("failed to spawn alert feed thread")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
