//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;

use offload_engine::{DispatchHandle, Outcome};

/// Generous upper bound for any single dispatch in these tests.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Await a handle, failing the test instead of hanging.
pub async fn settle<O>(handle: DispatchHandle<O>) -> Outcome<O> {
    tokio::time::timeout(SETTLE_TIMEOUT, handle)
        .await
        .expect("dispatch did not resolve in time")
}

/// Sum of `0..n`, the reference for the busy-sum work below.
pub fn closed_form_sum(n: u64) -> u64 {
    n * n.saturating_sub(1) / 2
}

/// Write `contents` to `config.toml` inside `dir`.
pub fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, contents).expect("write test config");
    path
}

/// Run the `offload` binary with `args`, isolated from the user's config.
pub fn offload(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_offload"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn offload binary")
}

/// Parse the binary's stdout as a JSON report.
pub fn json_report(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not a JSON report ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}
