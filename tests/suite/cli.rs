//! The `offload` binary, driven as a subprocess.

use serde_json::json;
use tempfile::tempdir;

use crate::common::{closed_form_sum, json_report, offload, write_config};

const QUIET_CONFIG: &str = r#"
[log]
filter = "warn"

[demo]
cycles = 1
heartbeat_ms = 5
"#;

#[test]
fn blocking_run_processes_no_heartbeats() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), QUIET_CONFIG);

    let output = offload(&config, &["blocking", "--cycles", "20", "--json"]);
    assert!(output.status.success(), "{output:?}");

    let report = json_report(&output);
    assert_eq!(report["mode"], "blocking");
    assert_eq!(report["heartbeats"], 0);
    assert_eq!(
        report["outcome"],
        json!({"status": "success", "value": closed_form_sum(20_000_000)})
    );
    assert!(report.get("dispatch_id").is_none());
}

#[test]
fn offloaded_run_completes_with_default_cycles() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), QUIET_CONFIG);

    let output = offload(&config, &["--json", "offload"]);
    assert!(output.status.success(), "{output:?}");

    let report = json_report(&output);
    assert_eq!(report["mode"], "offload");
    assert_eq!(report["cycles"], 1);
    assert_eq!(report["dispatch_id"], 1);
    assert_eq!(report["state"], "completed");
    assert_eq!(report["cancel_requested"], false);
    assert_eq!(
        report["outcome"],
        json!({"status": "success", "value": closed_form_sum(1_000_000)})
    );
}

#[test]
fn offloaded_run_can_be_cancelled() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), QUIET_CONFIG);

    let output = offload(
        &config,
        &["offload", "--cycles", "6000", "--cancel-after-ms", "20", "--json"],
    );
    assert_eq!(output.status.code(), Some(1), "{output:?}");

    let report = json_report(&output);
    assert_eq!(report["cancel_requested"], true);
    assert_eq!(report["state"], "cancelled");
    assert_eq!(
        report["outcome"],
        json!({"status": "failure", "value": {"failure": "cancelled"}})
    );
}

#[test]
fn overflowing_cycles_report_a_computation_failure() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), QUIET_CONFIG);

    let output = offload(&config, &["offload", "--cycles", "10000", "--json"]);
    assert_eq!(output.status.code(), Some(1), "{output:?}");

    let report = json_report(&output);
    assert_eq!(report["state"], "failed");
    assert_eq!(report["outcome"]["value"]["failure"], "computation");
    assert_eq!(report["outcome"]["value"]["kind"], "raised");
}

#[test]
fn text_report_is_the_default() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), QUIET_CONFIG);

    let output = offload(&config, &["offload", "--cycles", "1"]);
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mode:       offload"), "{stdout}");
    assert!(stdout.contains("outcome:    success (499999500000)"), "{stdout}");
    assert!(stdout.contains("(completed)"), "{stdout}");
}

#[test]
fn invalid_config_exits_with_usage_error() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "[demo]\nheartbeat_ms = 0\n");

    let output = offload(&config, &["blocking"]);
    assert_eq!(output.status.code(), Some(2), "{output:?}");
    assert!(output.stdout.is_empty());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("heartbeat_ms must be greater than 0"), "{stderr}");
    assert!(stderr.contains("config.toml"), "{stderr}");
}
