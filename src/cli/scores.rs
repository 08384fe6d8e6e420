// src/cli/scores.rs — Print the scores table of a workspace

use std::path::Path;

use crate::core::runner::SCORES_FILE;
use crate::core::types::ScoreTable;
use crate::core::workspace::Workspace;
use crate::infra::errors::PipefixError;

pub fn run_scores(workspace_dir: &Path) -> anyhow::Result<()> {
    let workspace = Workspace::load(workspace_dir)?;
    let raw = workspace
        .read_artifact(SCORES_FILE)
        .ok_or(PipefixError::MissingResultsArtifact {
            path: SCORES_FILE.into(),
        })?;
    let table = ScoreTable::parse_csv(&raw)?;
    print_table(&table);
    Ok(())
}

pub(crate) fn print_table(table: &ScoreTable) {
    println!("{}\t{}", table.index_name, table.columns.join("\t"));
    for (id, values) in &table.rows {
        let rendered: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
        println!("{id}\t{}", rendered.join("\t"));
    }
}
