// src/core/refine.rs — One refinement step
//
// Builds prompts from the latest feedback, invokes the oracle, extracts and
// filters the proposed edits. Computation only: the caller owns injection
// (see assign.rs), which keeps the step and the workspace mutation separately
// testable.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::retry::retry_n;
use crate::core::types::{EditBatch, Feedback, Task};
use crate::core::workspace::{lock_workspace, SharedWorkspace};
use crate::infra::errors::PipefixError;
use crate::oracle::Oracle;
use crate::prompts::PromptSelector;

pub struct RefineStep {
    oracle: Arc<dyn Oracle>,
    selector: PromptSelector,
    retry_attempts: usize,
}

impl RefineStep {
    pub fn new(oracle: Arc<dyn Oracle>, selector: PromptSelector, retry_attempts: usize) -> Self {
        Self {
            oracle,
            selector,
            retry_attempts,
        }
    }

    /// Produce the edit batch for one task and iteration.
    ///
    /// No feedback means this is the initialization pass: return an empty
    /// batch without touching the oracle, so the first evaluation can
    /// establish a baseline. Otherwise the whole build/call/extract sequence
    /// runs under the bounded retry; exhaustion propagates the last error.
    pub async fn implement(
        &self,
        task: &Task,
        feedback: Option<&Feedback>,
        workspace: &SharedWorkspace,
    ) -> Result<EditBatch, PipefixError> {
        let Some(feedback) = feedback else {
            tracing::debug!(task = task.name, "no feedback yet, skipping refinement");
            return Ok(EditBatch::new());
        };

        let (files, code) = {
            let ws = lock_workspace(workspace)?;
            (ws.files().clone(), ws.all_code())
        };
        let files = &files;
        let code = &code;

        retry_n(self.retry_attempts, "refinement step", || async move {
            let system_prompt = if feedback.hyperparameter_tuning_decision {
                // Tuning concerns numeric knobs, not logic: no task description.
                self.selector.system_prompt(None)?
            } else {
                self.selector.system_prompt(Some(&task.information()))?
            };
            let user_prompt = self.selector.user_prompt(code, feedback)?;

            let reply = self.oracle.complete(&system_prompt, &user_prompt).await?;
            let batch = self.selector.extract(&reply, files)?;
            Ok(filter_to_known_paths(batch, files))
        })
        .await
    }
}

/// Keep only edits whose path is already tracked by the workspace. Unknown
/// paths are an expected oracle failure mode, not an error.
fn filter_to_known_paths(batch: EditBatch, files: &BTreeMap<String, String>) -> EditBatch {
    let (known, unknown): (EditBatch, EditBatch) = batch
        .into_iter()
        .partition(|(path, _)| files.contains_key(path));
    for path in unknown.keys() {
        tracing::warn!(path, "dropping edit for untracked file");
    }
    known
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workspace::Workspace;
    use crate::prompts::EditMode;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedOracle {
        reply: Result<String, String>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        fn id(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _s: &str, _u: &str) -> Result<String, PipefixError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(r) => Ok(r.clone()),
                Err(m) => Err(PipefixError::Oracle {
                    oracle: "scripted".into(),
                    message: m.clone(),
                }),
            }
        }
    }

    fn ws() -> SharedWorkspace {
        let mut files = BTreeMap::new();
        files.insert("main.py".to_string(), "print('hi')\n".to_string());
        Workspace::from_files(files).into_shared()
    }

    fn step(oracle: Arc<ScriptedOracle>) -> RefineStep {
        RefineStep::new(oracle, PromptSelector::new(EditMode::FullRewrite), 5)
    }

    #[tokio::test]
    async fn test_no_feedback_returns_empty_batch_without_oracle_call() {
        let oracle = ScriptedOracle::ok("unused");
        let batch = step(oracle.clone())
            .implement(&Task::new("t", "d"), None, &ws())
            .await
            .unwrap();
        assert!(batch.is_empty());
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_paths_are_filtered() {
        let oracle =
            ScriptedOracle::ok("main.py\n```\nprint('fixed')\n```\nnew.py\n```\nx = 1\n```\n");
        let batch = step(oracle)
            .implement(&Task::new("t", "d"), Some(&Feedback::default()), &ws())
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch["main.py"], "print('fixed')\n");
    }

    #[tokio::test]
    async fn test_oracle_failure_propagates_after_five_attempts() {
        let oracle = ScriptedOracle::failing("connection reset");
        let result = step(oracle.clone())
            .implement(&Task::new("t", "d"), Some(&Feedback::default()), &ws())
            .await;
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 5);
        assert!(matches!(result, Err(PipefixError::Oracle { .. })));
    }

    #[tokio::test]
    async fn test_unparsable_reply_is_retried_then_fatal() {
        let oracle = ScriptedOracle::ok("I refuse to answer in the required format.");
        let result = step(oracle.clone())
            .implement(&Task::new("t", "d"), Some(&Feedback::default()), &ws())
            .await;
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 5);
        assert!(matches!(result, Err(PipefixError::Extract(_))));
    }

    #[tokio::test]
    async fn test_step_does_not_mutate_workspace() {
        let workspace = ws();
        let oracle = ScriptedOracle::ok("main.py\n```\nprint('fixed')\n```\n");
        step(oracle)
            .implement(&Task::new("t", "d"), Some(&Feedback::default()), &workspace)
            .await
            .unwrap();
        let ws = lock_workspace(&workspace).unwrap();
        assert_eq!(ws.files()["main.py"], "print('hi')\n");
    }
}
