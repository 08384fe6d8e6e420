// src/core/runner.rs — Outer refinement loop and terminal artifact check
//
// State machine: INIT -> {REFINE -> EVALUATE}* -> FINALIZE. The declared
// subtasks are swapped for a single synthetic debugging task while the loop
// runs, and restored on every exit path so the synthetic task never leaks
// into the caller's experiment record.

use crate::core::assign::assign_batches;
use crate::core::refine::RefineStep;
use crate::core::types::{Experiment, Feedback, ScoreTable, Task};
use crate::core::workspace::lock_workspace;
use crate::evaluator::MultiEvaluator;
use crate::infra::errors::PipefixError;

/// Fixed relative path of the tabular results artifact. Its presence and
/// shape define run success.
pub const SCORES_FILE: &str = "scores.csv";

/// Fixed relative path of the submission-format check output, required only
/// when the scenario asks for format checking.
pub const FORMAT_CHECK_FILE: &str = "test/format_check.txt";

pub struct PipelineRunner {
    step: RefineStep,
    evaluator: MultiEvaluator,
    max_loop: usize,
    check_format: bool,
}

impl PipelineRunner {
    pub fn new(
        step: RefineStep,
        evaluator: MultiEvaluator,
        max_loop: usize,
        check_format: bool,
    ) -> Self {
        Self {
            step,
            evaluator,
            max_loop,
            check_format,
        }
    }

    /// Run the full refine-evaluate loop on the experiment's workspace, then
    /// validate and load the terminal artifacts into the experiment record.
    pub async fn develop(&self, experiment: &mut Experiment) -> Result<(), PipefixError> {
        let saved_tasks = std::mem::take(&mut experiment.sub_tasks);
        let saved_slots = std::mem::take(&mut experiment.sub_workspaces);

        let fingerprint = lock_workspace(&experiment.workspace)?.fingerprint();
        experiment.sub_tasks = vec![Task::new(
            "Debug running solution",
            format!(
                "You'll be provided with the source code and the running and testing \
                 stdout. Check the error messages and debug the source code if any \
                 errors occur.\nCurrent code repo sha256: {fingerprint}"
            ),
        )];
        experiment.sub_workspaces = vec![None];

        let outcome = self.run_loop(experiment).await;

        // Restore before propagating anything, errors included.
        experiment.sub_tasks = saved_tasks;
        experiment.sub_workspaces = saved_slots;
        outcome?;

        self.finalize(experiment)
    }

    async fn run_loop(&self, experiment: &mut Experiment) -> Result<(), PipefixError> {
        let mut feedback: Option<Feedback> = None;

        for iteration in 0..self.max_loop {
            tracing::info!(iteration, max_loop = self.max_loop, "refinement iteration");

            let mut batches = Vec::with_capacity(experiment.sub_tasks.len());
            for task in &experiment.sub_tasks {
                let batch = self
                    .step
                    .implement(task, feedback.as_ref(), &experiment.workspace)
                    .await?;
                batches.push(Some(batch));
            }
            assign_batches(&batches, experiment)?;

            let task = experiment.sub_tasks.first().ok_or_else(|| {
                PipefixError::Invariant("loop requires at least one subtask".into())
            })?;
            let merged = self.evaluator.evaluate(task, &experiment.workspace).await?;
            tracing::info!(
                iteration,
                passed = merged.passed(),
                tuning = merged.hyperparameter_tuning_decision,
                "evaluation finished"
            );
            feedback = Some(merged);
        }
        Ok(())
    }

    fn finalize(&self, experiment: &mut Experiment) -> Result<(), PipefixError> {
        let (scores_raw, format_raw, duration) = {
            let ws = lock_workspace(&experiment.workspace)?;
            (
                ws.read_artifact(SCORES_FILE),
                ws.read_artifact(FORMAT_CHECK_FILE),
                ws.running_duration(),
            )
        };

        let Some(raw) = scores_raw else {
            tracing::error!("metrics file ({SCORES_FILE}) is not generated");
            return Err(PipefixError::MissingResultsArtifact {
                path: SCORES_FILE.into(),
            });
        };
        experiment.result = Some(ScoreTable::parse_csv(&raw)?);
        experiment.running_duration = duration;

        if self.check_format {
            let Some(text) = format_raw else {
                return Err(PipefixError::MissingFormatCheck {
                    path: FORMAT_CHECK_FILE.into(),
                });
            };
            experiment.format_check = Some(text);
        }
        Ok(())
    }
}
