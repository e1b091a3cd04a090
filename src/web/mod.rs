//! Embedded web dashboard.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves the
//! single-page dashboard. The page talks to the monitoring backend directly
//! from the browser; this server only hands it out, with the backend
//! endpoints from the config written into it.
//!
//! Launched via `sentinel-dash web` (default: `http://127.0.0.1:9750`).

mod frontend;

use std::io::Cursor;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::config::{self, SentinelConfig};

pub use frontend::render_page;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A bound dashboard server with its rendered page.
pub struct DashboardServer {
    server: Server,
    page: String,
}

impl DashboardServer {
    /// Bind `addr` and render the page for `config`.
    pub fn bind(addr: &str, config: &SentinelConfig) -> Result<Self> {
        let page = render_page(config)?;
        let server = Server::http(addr)
            .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;
        Ok(Self { server, page })
    }

    /// The address actually bound (useful with port `0`).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests until the process exits.
    ///
    /// Handles requests sequentially; every request is answered even when
    /// a handler fails.
    pub fn run(self) {
        for request in self.server.incoming_requests() {
            let method = request.method().clone();
            let url = request.url().to_string();

            let resp = dispatch(&method, &url, &self.page);
            let status = resp.status_code().0;
            if let Err(e) = request.respond(resp) {
                tracing::debug!("failed to answer {method} {url}: {e}");
            }

            tracing::info!(%method, %url, status, "request");
        }
    }
}

/// Start the web dashboard server on the given address.
///
/// Blocks the current thread.
pub fn serve(addr: &str, config: &SentinelConfig, open: bool) -> Result<()> {
    let server = DashboardServer::bind(addr, config)?;
    let shown = server
        .local_addr()
        .map_or_else(|| addr.to_string(), |a| a.to_string());

    println!("sentinel-dash dashboard running at http://{shown}");
    println!("Backend: {}", config.backend.url);
    println!("Alerts:  {}", config::alerts_url(&config.backend)?);
    println!("Press Ctrl+C to stop.\n");

    if open {
        if let Err(e) = open_browser(&format!("http://{shown}")) {
            tracing::debug!("could not open browser: {e:#}");
        }
    }

    server.run();
    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
fn dispatch(method: &Method, url: &str, page: &str) -> Response<Cursor<Vec<u8>>> {
    // Strip query string for path matching
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") | (&Method::Get, "/dashboard") => {
            html_response(page)
        }
        (&Method::Get, "/healthz") => json_response(200, r#"{"status":"ok"}"#),
        _ => json_response(404, r#"{"error":"not found"}"#),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn html_response(page: &str) -> Response<Cursor<Vec<u8>>> {
    let resp = Response::from_data(page.as_bytes().to_vec()).with_status_code(StatusCode(200));
    with_header(resp, "text/html; charset=utf-8")
}

fn json_response(status: u16, body: &str) -> Response<Cursor<Vec<u8>>> {
    let resp = Response::from_data(body.as_bytes().to_vec()).with_status_code(StatusCode(status));
    with_header(resp, "application/json; charset=utf-8")
}

fn with_header(resp: Response<Cursor<Vec<u8>>>, content_type: &str) -> Response<Cursor<Vec<u8>>> {
    match Header::from_bytes("Content-Type", content_type) {
        Ok(header) => resp.with_header(header),
        Err(()) => resp,
    }
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
