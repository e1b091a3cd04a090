use sentinel_dash::dashboard::{
    Change, Dashboard, FETCH_ERROR_TEXT, LOADING_TEXT, SIMULATION_ERROR_TEXT,
};
use sentinel_dash::protocol::pretty_json;
/// Dashboard region tests.
///
/// Drives the dashboard through raw feed frames and fetch/simulation
/// outcomes, and checks what each display region ends up showing.
use serde_json::json;

// ---------------------------------------------------------------------------
// Feed frames
// ---------------------------------------------------------------------------

#[test]
fn alert_frame_reveals_panel_with_pretty_payload() {
    let mut dash = Dashboard::default();
    assert!(!dash.alert().visible);

    let change = dash
        .on_message(r#"{"type":"alert","alert":"Potential ransomware detected!","data":{"cpu_usage":97.5,"files":["a.txt","b.txt"]}}"#)
        .unwrap();

    assert_eq!(change, Some(Change::Alert));
    assert!(dash.alert().visible);
    assert_eq!(
        dash.alert().text,
        "ALERT: Potential ransomware detected!\n{\n  \"cpu_usage\": 97.5,\n  \"files\": [\n    \"a.txt\",\n    \"b.txt\"\n  ]\n}"
    );
}

#[test]
fn newer_alert_replaces_older_one() {
    let mut dash = Dashboard::default();
    dash.on_message(r#"{"type":"alert","alert":"first","data":1}"#)
        .unwrap();
    dash.on_message(r#"{"type":"alert","alert":"second","data":2}"#)
        .unwrap();
    assert_eq!(dash.alert().text, "ALERT: second\n2");
}

#[test]
fn system_data_frame_sets_snapshot_text() {
    let mut dash = Dashboard::default();
    let data = json!({"status": "normal", "features": {"cpu_usage": 12.5}});
    let frame = json!({"type": "system_data", "data": data}).to_string();

    assert_eq!(dash.on_message(&frame).unwrap(), Some(Change::Snapshot));
    assert_eq!(dash.snapshot_text(), pretty_json(&data));
    assert_eq!(
        dash.summary().and_then(|s| s.status.as_deref()),
        Some("normal")
    );
}

#[test]
fn unknown_and_keepalive_frames_change_nothing() {
    let mut dash = Dashboard::default();
    for frame in [
        r#"{"type":"live_tracking","data":{"cpu_usage":3}}"#,
        r#"{"type":"ping","message":"keepalive"}"#,
        r#"{"no_type":true}"#,
        r#"[1,2,3]"#,
    ] {
        assert_eq!(dash.on_message(frame).unwrap(), None, "{frame}");
    }
    assert_eq!(dash.snapshot_text(), LOADING_TEXT);
    assert!(!dash.alert().visible);
    assert_eq!(dash.log_tail().count(), 0);
}

#[test]
fn malformed_frame_is_rejected_without_change() {
    let mut dash = Dashboard::default();
    dash.on_message(r#"{"type":"alert","alert":"kept","data":null}"#)
        .unwrap();

    assert!(dash.on_message("{not json").is_err());
    assert_eq!(dash.alert().text, "ALERT: kept\nnull");
    assert_eq!(dash.snapshot_text(), LOADING_TEXT);
}

#[test]
fn log_frames_fill_a_bounded_tail() {
    let mut dash = Dashboard::new(3);
    for i in 0..5 {
        let frame = json!({"type": "live_tracking_log", "log": format!("line {i}")}).to_string();
        assert_eq!(dash.on_message(&frame).unwrap(), Some(Change::Log));
    }
    let tail: Vec<&str> = dash.log_tail().collect();
    assert_eq!(tail, vec!["line 2", "line 3", "line 4"]);
}

// ---------------------------------------------------------------------------
// Fetch and simulation outcomes
// ---------------------------------------------------------------------------

#[test]
fn fetch_outcomes_overwrite_snapshot() {
    let mut dash = Dashboard::default();
    let body = json!({"status": "ransomware detected", "response_triggered": true});

    dash.apply_fetch(&Ok(body.clone()));
    assert_eq!(dash.snapshot_text(), pretty_json(&body));
    assert!(dash.summary().is_some_and(|s| s.is_threat()));

    dash.apply_fetch(&Err(anyhow::anyhow!("connection refused")));
    assert_eq!(dash.snapshot_text(), FETCH_ERROR_TEXT);
}

#[test]
fn repeated_identical_fetch_is_idempotent() {
    let mut dash = Dashboard::default();
    let body = json!({"status": "normal"});
    dash.apply_fetch(&Ok(body.clone()));
    let first = dash.snapshot_text().to_string();
    dash.apply_fetch(&Ok(body));
    assert_eq!(dash.snapshot_text(), first);
}

#[test]
fn pull_and_push_are_last_write_wins() {
    let mut dash = Dashboard::default();
    dash.on_message(r#"{"type":"system_data","data":{"from":"push"}}"#)
        .unwrap();
    dash.apply_fetch(&Ok(json!({"from": "pull"})));
    assert!(dash.snapshot_text().contains("pull"));

    dash.on_message(r#"{"type":"system_data","data":{"from":"push"}}"#)
        .unwrap();
    assert!(dash.snapshot_text().contains("push"));
}

#[test]
fn simulation_outcomes_set_acknowledgment() {
    let mut dash = Dashboard::default();

    dash.apply_simulation(&Ok("Ransomware simulation started.".to_string()));
    assert_eq!(dash.acknowledgment(), Some("Ransomware simulation started."));

    dash.apply_simulation(&Err(anyhow::anyhow!("timed out")));
    assert_eq!(dash.acknowledgment(), Some(SIMULATION_ERROR_TEXT));

    assert_eq!(
        dash.dismiss_acknowledgment().as_deref(),
        Some(SIMULATION_ERROR_TEXT)
    );
    assert_eq!(dash.acknowledgment(), None);
}
