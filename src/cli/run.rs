// src/cli/run.rs — Wire components together and run one refinement

use std::path::Path;
use std::sync::Arc;

use crate::cli::scores::print_table;
use crate::core::refine::RefineStep;
use crate::core::runner::PipelineRunner;
use crate::core::types::Experiment;
use crate::core::workspace::Workspace;
use crate::evaluator::model_dump::ModelDumpEvaluator;
use crate::evaluator::pipeline::PipelineEvaluator;
use crate::evaluator::MultiEvaluator;
use crate::infra::config::RunnerConfig;
use crate::oracle::openai_compat::OpenAICompatOracle;
use crate::oracle::Oracle;
use crate::prompts::{EditMode, PromptSelector};
use crate::sandbox::process::ProcessSandbox;
use crate::sandbox::ExecutionSandbox;

pub async fn run_refinement(workspace_dir: &Path, config: RunnerConfig) -> anyhow::Result<()> {
    let oracle: Arc<dyn Oracle> = Arc::new(OpenAICompatOracle::from_config(&config.oracle)?);
    let sandbox: Arc<dyn ExecutionSandbox> =
        Arc::new(ProcessSandbox::new(config.scenario.clone()));

    let mut evaluator = MultiEvaluator::new(config.evaluator.parallel).with(Arc::new(
        PipelineEvaluator::new(
            oracle.clone(),
            sandbox.clone(),
            config.refine.retry_attempts,
        ),
    ));
    if config.scenario.enable_model_dump {
        evaluator.push(Arc::new(ModelDumpEvaluator::new()));
    }

    let selector = PromptSelector::new(EditMode::from_diff_flag(config.refine.diff_mode));
    let step = RefineStep::new(oracle, selector, config.refine.retry_attempts);
    let runner = PipelineRunner::new(
        step,
        evaluator,
        config.refine.max_loop,
        config.scenario.check_format,
    );

    let workspace = Workspace::load(workspace_dir)?;
    tracing::info!(
        files = workspace.files().len(),
        dir = %workspace_dir.display(),
        "loaded workspace"
    );

    let mut experiment = Experiment::new(workspace, Vec::new());
    runner.develop(&mut experiment).await?;

    if let Some(ref table) = experiment.result {
        println!("Run {} finished.", experiment.id);
        print_table(table);
    }
    if let Some(duration) = experiment.running_duration {
        println!("Pipeline execution took {:.1}s.", duration.as_secs_f64());
    }
    if let Some(ref check) = experiment.format_check {
        println!("Submission format check:\n{check}");
    }
    Ok(())
}
