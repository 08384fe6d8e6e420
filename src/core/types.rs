// src/core/types.rs — Core domain types

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::workspace::{SharedWorkspace, Workspace};
use crate::infra::errors::PipefixError;

/// The oracle's proposed change for one iteration: path to full new content.
/// Produced, filtered, and discarded each iteration.
pub type EditBatch = BTreeMap<String, String>;

/// One unit of refinement work. Immutable once created for a loop iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub description: String,
}

impl Task {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Rendering used when the task is embedded in a prompt.
    pub fn information(&self) -> String {
        format!("{}\n{}", self.name, self.description)
    }
}

/// Outcome of one evaluator check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Evaluator name (e.g. "pipeline", "model_dump").
    pub check: String,
    pub passed: bool,
    /// What happened when the workspace ran.
    pub execution: String,
    /// Free-text critique steering the next refinement.
    pub critique: String,
}

/// Merged result of one evaluation round, consumed by the next refinement
/// step. Absent only on the very first iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feedback {
    /// Per-check outcomes in fixed evaluator order.
    pub checks: Vec<CheckOutcome>,
    pub hyperparameter_tuning_decision: bool,
    pub hyperparameter_tuning_suggestion: Option<String>,
}

impl Feedback {
    pub fn passed(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.passed)
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for check in &self.checks {
            writeln!(
                f,
                "### {} check: {}",
                check.check,
                if check.passed { "PASSED" } else { "FAILED" }
            )?;
            writeln!(f, "Execution: {}", check.execution)?;
            writeln!(f, "Critique: {}", check.critique)?;
        }
        writeln!(
            f,
            "Hyperparameter tuning decision: {}",
            self.hyperparameter_tuning_decision
        )
    }
}

/// Tabular score artifact: rows indexed by an identifier column, columns are
/// numeric metric values. Loaded as-is, no schema negotiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreTable {
    pub index_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<f64>)>,
}

impl ScoreTable {
    /// Parse a CSV whose first column is the row identifier and whose
    /// remaining columns are numeric metrics.
    pub fn parse_csv(raw: &str) -> Result<Self, PipefixError> {
        let mut lines = raw.lines().filter(|l| !l.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| PipefixError::BadScores("empty file".into()))?;
        let mut cells = header.split(',').map(str::trim);
        let index_name = cells.next().unwrap_or("").to_string();
        let columns: Vec<String> = cells.map(str::to_string).collect();
        if columns.is_empty() {
            return Err(PipefixError::BadScores(
                "header has no metric columns".into(),
            ));
        }

        let mut rows = Vec::new();
        for (n, line) in lines.enumerate() {
            let mut cells = line.split(',').map(str::trim);
            let id = cells
                .next()
                .ok_or_else(|| PipefixError::BadScores(format!("row {n} is empty")))?
                .to_string();
            let values = cells
                .map(|c| {
                    c.parse::<f64>()
                        .map_err(|_| PipefixError::BadScores(format!("row '{id}': '{c}' is not numeric")))
                })
                .collect::<Result<Vec<f64>, _>>()?;
            if values.len() != columns.len() {
                return Err(PipefixError::BadScores(format!(
                    "row '{id}' has {} values, expected {}",
                    values.len(),
                    columns.len()
                )));
            }
            rows.push((id, values));
        }
        Ok(Self {
            index_name,
            columns,
            rows,
        })
    }
}

/// One run of the refinement loop over a workspace, plus its terminal record.
#[derive(Debug)]
pub struct Experiment {
    pub id: String,
    pub started_at: DateTime<Utc>,
    /// Declared subtasks. Replaced by a single synthetic debug task for the
    /// duration of the loop, then restored.
    pub sub_tasks: Vec<Task>,
    /// Per-subtask workspaces, aligned positionally with `sub_tasks`. A `None`
    /// slot falls back to the shared experiment workspace at assignment time.
    pub sub_workspaces: Vec<Option<SharedWorkspace>>,
    pub workspace: SharedWorkspace,
    pub result: Option<ScoreTable>,
    pub format_check: Option<String>,
    pub running_duration: Option<Duration>,
}

impl Experiment {
    pub fn new(workspace: Workspace, sub_tasks: Vec<Task>) -> Self {
        let slots = sub_tasks.len();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            sub_tasks,
            sub_workspaces: vec![None; slots],
            workspace: workspace.into_shared(),
            result: None,
            format_check: None,
            running_duration: None,
        }
    }
}
