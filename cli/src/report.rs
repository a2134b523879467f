use std::fmt::Write;

use serde::Serialize;

use offload_types::{DispatchId, DispatchState, Failure, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Blocking,
    Offload,
}

impl RunMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::Offload => "offload",
        }
    }
}

/// What the demo observed during one run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub cycles: u64,
    pub elapsed_ms: u64,
    /// Heartbeats the caller's thread processed while the work was in flight.
    pub heartbeats: u64,
    pub heartbeat_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch_id: Option<DispatchId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<DispatchState>,
    pub cancel_requested: bool,
    pub outcome: Outcome<u64>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "mode:       {}", self.mode.as_str());
        let _ = writeln!(out, "cycles:     {}", self.cycles);
        match &self.outcome {
            Outcome::Success(total) => {
                let _ = writeln!(out, "outcome:    success ({total})");
            }
            Outcome::Failure(Failure::Cancelled) => {
                let _ = writeln!(out, "outcome:    cancelled");
            }
            Outcome::Failure(failure) => {
                let _ = writeln!(out, "outcome:    {failure}");
            }
        }
        if let Some(id) = self.dispatch_id {
            let state = self.state.map_or("unknown", DispatchState::as_str);
            let _ = writeln!(out, "dispatch:   #{id} ({state})");
        }
        let _ = writeln!(out, "elapsed:    {} ms", self.elapsed_ms);
        let _ = write!(
            out,
            "heartbeats: {} (every {} ms)",
            self.heartbeats, self.heartbeat_ms
        );
        if self.cancel_requested {
            out.push_str("\ncancel:     requested");
        }
        out
    }
}
