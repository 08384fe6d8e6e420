// src/sandbox/mod.rs — Execution sandbox seam

pub mod process;

use std::time::Duration;

use async_trait::async_trait;

use crate::core::workspace::SharedWorkspace;
use crate::infra::errors::PipefixError;

/// What happened when the workspace ran.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Combined stdout/stderr of the pipeline run.
    pub output: String,
    pub exit_code: i32,
    pub duration: Duration,
    /// True when the run was cut off by the wall-clock budget.
    pub timed_out: bool,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Executes a workspace under a resource/time budget. Implementations must
/// record the elapsed duration on the workspace; result artifacts land in the
/// workspace (on disk under its root, or injected for in-memory fakes).
#[async_trait]
pub trait ExecutionSandbox: Send + Sync {
    async fn execute(&self, workspace: &SharedWorkspace) -> Result<RunOutcome, PipefixError>;
}
