// src/sandbox/process.rs — Process-backed sandbox (local or docker)

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use super::{ExecutionSandbox, RunOutcome};
use crate::core::workspace::{lock_workspace, SharedWorkspace};
use crate::infra::config::{EnvKind, ScenarioConfig};
use crate::infra::errors::PipefixError;

/// Cap on captured pipeline output. Anything longer is execution noise the
/// judge does not need in full.
const MAX_CAPTURED_OUTPUT: usize = 40_000;

/// Runs the workspace entrypoint as a child process, either directly or
/// inside a docker container, bounded by the scenario's wall-clock budget.
pub struct ProcessSandbox {
    scenario: ScenarioConfig,
}

impl ProcessSandbox {
    pub fn new(scenario: ScenarioConfig) -> Self {
        Self { scenario }
    }

    fn build_command(&self, root: &Path) -> (String, Vec<String>) {
        let entry: Vec<String> = self
            .scenario
            .entrypoint
            .split_whitespace()
            .map(str::to_string)
            .collect();

        match self.scenario.env_kind {
            EnvKind::Local => {
                let program = entry.first().cloned().unwrap_or_else(|| "python".into());
                (program, entry.into_iter().skip(1).collect())
            }
            EnvKind::Docker => {
                let mut args = vec![
                    "run".to_string(),
                    "--rm".to_string(),
                    "-v".to_string(),
                    format!("{}:/workspace", root.display()),
                    "-w".to_string(),
                    "/workspace".to_string(),
                    self.scenario.docker_image.clone(),
                ];
                args.extend(entry);
                ("docker".to_string(), args)
            }
        }
    }
}

#[async_trait]
impl ExecutionSandbox for ProcessSandbox {
    async fn execute(&self, workspace: &SharedWorkspace) -> Result<RunOutcome, PipefixError> {
        let root = {
            let ws = lock_workspace(workspace)?;
            ws.root()
                .map(Path::to_path_buf)
                .ok_or_else(|| PipefixError::Sandbox("workspace has no on-disk root".into()))?
        };

        let (program, args) = self.build_command(&root);
        tracing::info!(program, ?args, "executing workspace");

        let started = Instant::now();
        let budget = Duration::from_secs(self.scenario.max_seconds);
        let run = Command::new(&program)
            .args(&args)
            .current_dir(&root)
            .kill_on_drop(true)
            .output();

        let outcome = match tokio::time::timeout(budget, run).await {
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                truncate_in_place(&mut text, MAX_CAPTURED_OUTPUT);
                RunOutcome {
                    output: text,
                    exit_code: output.status.code().unwrap_or(-1),
                    duration: started.elapsed(),
                    timed_out: false,
                }
            }
            Ok(Err(e)) => {
                return Err(PipefixError::Sandbox(format!(
                    "failed to spawn '{program}': {e}"
                )))
            }
            Err(_) => RunOutcome {
                output: format!(
                    "[execution timed out after {} seconds]",
                    self.scenario.max_seconds
                ),
                exit_code: -1,
                duration: started.elapsed(),
                timed_out: true,
            },
        };

        lock_workspace(workspace)?.set_running_duration(outcome.duration);
        Ok(outcome)
    }
}

fn truncate_in_place(text: &mut String, max: usize) {
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("\n[output truncated]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workspace::Workspace;
    use pretty_assertions::assert_eq;

    fn scenario(env_kind: EnvKind, entrypoint: &str) -> ScenarioConfig {
        ScenarioConfig {
            env_kind,
            entrypoint: entrypoint.into(),
            max_seconds: 10,
            ..ScenarioConfig::default()
        }
    }

    #[test]
    fn test_build_command_local() {
        let sandbox = ProcessSandbox::new(scenario(EnvKind::Local, "python main.py"));
        let (program, args) = sandbox.build_command(Path::new("/tmp/ws"));
        assert_eq!(program, "python");
        assert_eq!(args, vec!["main.py"]);
    }

    #[test]
    fn test_build_command_docker_mounts_workspace() {
        let sandbox = ProcessSandbox::new(scenario(EnvKind::Docker, "python main.py"));
        let (program, args) = sandbox.build_command(Path::new("/tmp/ws"));
        assert_eq!(program, "docker");
        assert!(args.contains(&"/tmp/ws:/workspace".to_string()));
        assert!(args.contains(&"python:3.11-slim".to_string()));
        assert_eq!(args.last().unwrap(), "main.py");
    }

    #[tokio::test]
    async fn test_local_execution_captures_output_and_duration() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("noop.txt"), "x").unwrap();
        let workspace = Workspace::load(dir.path()).unwrap().into_shared();

        let sandbox = ProcessSandbox::new(scenario(EnvKind::Local, "echo hello"));
        let outcome = sandbox.execute(&workspace).await.unwrap();

        assert!(outcome.succeeded());
        assert!(outcome.output.contains("hello"));
        assert!(lock_workspace(&workspace)
            .unwrap()
            .running_duration()
            .is_some());
    }

    #[test]
    fn test_truncate_in_place() {
        let mut text = "abcdef".repeat(10);
        truncate_in_place(&mut text, 12);
        assert!(text.starts_with("abcdefabcdef"));
        assert!(text.ends_with("[output truncated]"));
    }
}
