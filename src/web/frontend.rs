//! Embedded HTML/CSS/JS for the browser dashboard.
//!
//! The page is compiled into the binary as a string constant. Backend
//! endpoints are written in at serve time; there are no external assets.

use anyhow::{Context, Result};

use crate::config::{self, SentinelConfig};

const BACKEND_URL_SLOT: &str = "__SENTINEL_BACKEND_URL__";
const ALERTS_URL_SLOT: &str = "__SENTINEL_ALERTS_URL__";
const POLL_MS_SLOT: &str = "__SENTINEL_POLL_MS__";

/// Largest delay `setInterval` honours; browsers fire longer ones at once.
const MAX_TIMER_MS: u64 = 2_147_483_647;

/// Render the dashboard page with the configured endpoints.
pub fn render_page(config: &SentinelConfig) -> Result<String> {
    let backend = config.backend.url.trim_end_matches('/');
    let alerts = config::alerts_url(&config.backend)?;
    // A disabled poll still fetches once on load.
    let poll_ms = if config.poll.enabled {
        config
            .poll
            .interval_secs
            .max(1)
            .saturating_mul(1000)
            .min(MAX_TIMER_MS)
    } else {
        0
    };

    Ok(INDEX_HTML
        .replace(BACKEND_URL_SLOT, &script_string(backend)?)
        .replace(ALERTS_URL_SLOT, &script_string(&alerts)?)
        .replace(POLL_MS_SLOT, &poll_ms.to_string()))
}

/// Encode `s` as a JS string literal that is safe inside `<script>`.
fn script_string(s: &str) -> Result<String> {
    let encoded = serde_json::to_string(s).context("failed to encode page setting")?;
    Ok(encoded.replace("</", "<\\/"))
}

/// The complete single-page dashboard HTML.
const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Sentinel Dashboard</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --red: #f85149;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

nav {
  display: flex;
  gap: 16px;
  align-items: center;
  padding: 12px 24px;
  background: var(--surface);
  border-bottom: 1px solid var(--border);
}
nav .brand { font-weight: 600; font-size: 16px; margin-right: auto; }
nav a { color: var(--text-muted); text-decoration: none; }
nav a:hover, nav a.active { color: var(--accent); }

.app {
  max-width: 960px;
  margin: 0 auto;
  padding: 24px;
}

.actions { display: flex; gap: 12px; margin-bottom: 24px; }
button {
  background: var(--surface);
  color: var(--text);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 8px 16px;
  cursor: pointer;
  font-size: 14px;
}
button:hover { border-color: var(--accent); }
button.danger { border-color: var(--red); color: var(--red); }

.alert {
  display: none;
  white-space: pre-wrap;
  font-family: var(--mono);
  background: rgba(248, 81, 73, 0.1);
  border: 1px solid var(--red);
  border-radius: var(--radius);
  color: var(--red);
  padding: 16px;
  margin-bottom: 24px;
}

.panel {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 16px;
}
.panel h2 { font-size: 16px; margin-bottom: 12px; }
.panel pre {
  font-family: var(--mono);
  font-size: 13px;
  white-space: pre-wrap;
  word-break: break-word;
}
</style>
</head>
<body>
<nav>
  <span class="brand">Sentinel</span>
  <a href="/" class="active">Dashboard</a>
  <a href="/monitoring">Monitoring</a>
  <a href="/alerts">Alerts</a>
  <a href="/settings">Settings</a>
</nav>

<div class="app">
  <div class="actions">
    <button id="refresh-btn" type="button">Refresh Data</button>
    <button id="simulate-btn" type="button" class="danger">Simulate Ransomware Attack</button>
  </div>

  <div id="alert" class="alert"></div>

  <div class="panel">
    <h2>System Data</h2>
    <pre id="system-data">Loading...</pre>
  </div>
</div>

<script>
const BACKEND_URL = __SENTINEL_BACKEND_URL__;
const ALERTS_URL = __SENTINEL_ALERTS_URL__;
const POLL_MS = __SENTINEL_POLL_MS__;

// ---------------------------------------------------------------------------
// Alerts socket (no reconnect; reload the page to resubscribe)
// ---------------------------------------------------------------------------
const socket = new WebSocket(ALERTS_URL);

socket.onopen = () => console.log('Connected to alerts feed');
socket.onerror = (event) => console.error('Alerts feed error:', event);
socket.onclose = () => console.log('Alerts feed closed');

socket.onmessage = (event) => {
  const message = JSON.parse(event.data);
  if (message.type === 'alert') {
    const el = document.getElementById('alert');
    el.style.display = 'block';
    el.textContent = 'ALERT: ' + message.alert + '\n' + JSON.stringify(message.data, null, 2);
  } else if (message.type === 'system_data') {
    document.getElementById('system-data').textContent = JSON.stringify(message.data, null, 2);
  }
};

// ---------------------------------------------------------------------------
// Snapshot and simulation
// ---------------------------------------------------------------------------
async function fetchSystemData() {
  const el = document.getElementById('system-data');
  try {
    const res = await fetch(BACKEND_URL + '/system_data');
    const data = await res.json();
    el.textContent = JSON.stringify(data, null, 2);
  } catch (e) {
    console.error('Error fetching system data:', e);
    el.textContent = 'Error fetching system data.';
  }
}

async function simulateAttack() {
  try {
    const res = await fetch(BACKEND_URL + '/simulate_ransomware');
    const data = await res.json();
    if (data.message === undefined) {
      throw new Error('simulation response has no message');
    }
    alert(typeof data.message === 'string' ? data.message : JSON.stringify(data.message));
  } catch (e) {
    console.error('Error triggering simulation:', e);
    alert('Error triggering simulation.');
  }
}

document.getElementById('refresh-btn').addEventListener('click', fetchSystemData);
document.getElementById('simulate-btn').addEventListener('click', simulateAttack);

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------
fetchSystemData();
if (POLL_MS > 0) {
  setInterval(fetchSystemData, POLL_MS);
}
</script>
</body>
</html>"##;
