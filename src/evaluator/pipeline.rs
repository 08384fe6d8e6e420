// src/evaluator/pipeline.rs — Functional pipeline evaluator
//
// Executes the workspace in the sandbox, then asks the oracle to judge the
// run: did the pipeline do its job, and if it did, are the hyperparameters
// worth tuning rather than the logic worth debugging.

use std::sync::Arc;

use async_trait::async_trait;

use super::{parser, Evaluator, EvaluatorVerdict};
use crate::core::retry::retry_n;
use crate::core::types::{CheckOutcome, Task};
use crate::core::workspace::{lock_workspace, SharedWorkspace};
use crate::infra::errors::PipefixError;
use crate::oracle::Oracle;
use crate::sandbox::ExecutionSandbox;

const JUDGE_SYSTEM_PROMPT: &str = "\
You are judging one run of a data-science pipeline. You get the source code
and the combined stdout/stderr of the run. Assess whether the pipeline ran
correctly and produced its metrics, and whether the next step should be
hyperparameter tuning (the logic is sound, only numeric knobs need changing)
or debugging.

Respond with a single JSON object:
{
  \"execution\": \"<what happened during the run>\",
  \"return_checking\": \"<assessment of produced artifacts/metrics>\",
  \"code\": \"<critique of the source code>\",
  \"final_decision\": <true if the run is acceptable>,
  \"hyperparameter_tuning_decision\": <true if only tuning is needed>,
  \"hyperparameter_tuning_suggestion\": \"<concrete suggestion or null>\"
}";

pub struct PipelineEvaluator {
    oracle: Arc<dyn Oracle>,
    sandbox: Arc<dyn ExecutionSandbox>,
    retry_attempts: usize,
}

impl PipelineEvaluator {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        sandbox: Arc<dyn ExecutionSandbox>,
        retry_attempts: usize,
    ) -> Self {
        Self {
            oracle,
            sandbox,
            retry_attempts,
        }
    }
}

#[async_trait]
impl Evaluator for PipelineEvaluator {
    fn name(&self) -> &str {
        "pipeline"
    }

    async fn evaluate(
        &self,
        task: &Task,
        workspace: &SharedWorkspace,
    ) -> Result<EvaluatorVerdict, PipefixError> {
        let outcome = self.sandbox.execute(workspace).await?;
        let code = lock_workspace(workspace)?.all_code();

        let user_prompt = format!(
            "## Task\n{}\n\n## Source code\n{}\n## Run output (exit code {})\n{}",
            task.information(),
            code,
            outcome.exit_code,
            outcome.output,
        );

        let user_prompt = &user_prompt;
        let verdict = retry_n(self.retry_attempts, "pipeline judge", || async move {
            let reply = self
                .oracle
                .complete(JUDGE_SYSTEM_PROMPT, user_prompt)
                .await?;
            parser::parse_judge_reply(&reply)
        })
        .await?;

        let passed = outcome.succeeded() && verdict.final_decision;
        tracing::info!(
            passed,
            exit_code = outcome.exit_code,
            timed_out = outcome.timed_out,
            tuning = verdict.hyperparameter_tuning_decision,
            "pipeline evaluation finished"
        );

        let execution = if verdict.execution.is_empty() {
            format!("exit code {}; {}", outcome.exit_code, outcome.output)
        } else {
            verdict.execution
        };
        let critique = [verdict.return_checking, verdict.code]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(EvaluatorVerdict {
            outcome: CheckOutcome {
                check: self.name().to_string(),
                passed,
                execution,
                critique,
            },
            // A tuning decision on a failed run would steer the next step away
            // from the actual breakage.
            hyperparameter_tuning_decision: passed && verdict.hyperparameter_tuning_decision,
            hyperparameter_tuning_suggestion: verdict.hyperparameter_tuning_suggestion,
        })
    }
}
