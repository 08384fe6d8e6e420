// src/evaluator/model_dump.rs — Persisted model artifact checks
//
// Optional evaluator (config `enable_model_dump`): after a run, the pipeline
// is expected to have dumped its trained models under `models/`. Verifies the
// dump exists, is non-empty, and uses recognizable serialization formats.

use async_trait::async_trait;

use super::{Evaluator, EvaluatorVerdict};
use crate::core::types::{CheckOutcome, Task};
use crate::core::workspace::{lock_workspace, SharedWorkspace};
use crate::infra::errors::PipefixError;

const MODELS_DIR: &str = "models";

const KNOWN_EXTENSIONS: &[&str] = &[
    "pkl", "pt", "pth", "bin", "joblib", "cbm", "json", "txt", "h5", "onnx",
];

#[derive(Default)]
pub struct ModelDumpEvaluator;

impl ModelDumpEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn inspect(&self, workspace: &SharedWorkspace) -> Result<Vec<String>, PipefixError> {
        let ws = lock_workspace(workspace)?;
        let mut problems = Vec::new();

        let entries: Vec<(String, u64)> = if let Some(root) = ws.root() {
            let dir = root.join(MODELS_DIR);
            if !dir.is_dir() {
                return Ok(vec![format!("no {MODELS_DIR}/ directory was produced")]);
            }
            let mut found = Vec::new();
            for entry in std::fs::read_dir(&dir)? {
                let entry = entry?;
                if entry.path().is_file() {
                    let name = entry.file_name().to_string_lossy().to_string();
                    found.push((name, entry.metadata()?.len()));
                }
            }
            found
        } else {
            ws.files()
                .iter()
                .filter(|(path, _)| path.starts_with(&format!("{MODELS_DIR}/")))
                .map(|(path, content)| (path.clone(), content.len() as u64))
                .collect()
        };

        if entries.is_empty() {
            problems.push(format!("{MODELS_DIR}/ contains no model files"));
        }
        for (name, size) in &entries {
            if *size == 0 {
                problems.push(format!("{name} is empty"));
            }
            let ext = name.rsplit('.').next().unwrap_or("");
            if !KNOWN_EXTENSIONS.contains(&ext) {
                problems.push(format!("{name} has unrecognized format '.{ext}'"));
            }
        }
        Ok(problems)
    }
}

#[async_trait]
impl Evaluator for ModelDumpEvaluator {
    fn name(&self) -> &str {
        "model_dump"
    }

    async fn evaluate(
        &self,
        _task: &Task,
        workspace: &SharedWorkspace,
    ) -> Result<EvaluatorVerdict, PipefixError> {
        let problems = self.inspect(workspace)?;
        let passed = problems.is_empty();

        Ok(EvaluatorVerdict::check_only(CheckOutcome {
            check: self.name().to_string(),
            passed,
            execution: format!("inspected {MODELS_DIR}/ for persisted model artifacts"),
            critique: if passed {
                "model dump looks valid".into()
            } else {
                problems.join("; ")
            },
        }))
    }
}
