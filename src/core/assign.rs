// src/core/assign.rs — Apply per-subtask edit batches to workspaces
//
// Batches align positionally with the experiment's subtasks. A `None` entry
// means "no usable edit this iteration" and is skipped. A subtask without a
// dedicated workspace falls back to the shared experiment workspace; the slot
// keeps an aliased handle, not a copy.

use crate::core::types::{EditBatch, Experiment};
use crate::core::workspace::lock_workspace;
use crate::infra::errors::PipefixError;

pub fn assign_batches(
    batches: &[Option<EditBatch>],
    experiment: &mut Experiment,
) -> Result<(), PipefixError> {
    if batches.len() != experiment.sub_tasks.len() {
        return Err(PipefixError::Invariant(format!(
            "batch list length {} does not match subtask count {}",
            batches.len(),
            experiment.sub_tasks.len()
        )));
    }

    for (index, batch) in batches.iter().enumerate() {
        let Some(batch) = batch else {
            continue;
        };
        let shared = experiment.workspace.clone();
        let slot = experiment.sub_workspaces[index].get_or_insert_with(|| shared);
        lock_workspace(slot)?.inject_files(batch)?;
        tracing::debug!(index, files = batch.len(), "assigned edit batch");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Task;
    use crate::core::workspace::Workspace;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn experiment() -> Experiment {
        let mut files = BTreeMap::new();
        files.insert("main.py".to_string(), "original\n".to_string());
        Experiment::new(
            Workspace::from_files(files),
            vec![Task::new("debug", "fix it")],
        )
    }

    fn batch(path: &str, content: &str) -> EditBatch {
        let mut b = EditBatch::new();
        b.insert(path.to_string(), content.to_string());
        b
    }

    #[test]
    fn test_none_entry_leaves_workspace_unchanged() {
        let mut exp = experiment();
        assign_batches(&[None], &mut exp).unwrap();
        assert!(exp.sub_workspaces[0].is_none());
        let ws = lock_workspace(&exp.workspace).unwrap();
        assert_eq!(ws.files()["main.py"], "original\n");
    }

    #[test]
    fn test_fallback_aliases_experiment_workspace() {
        let mut exp = experiment();
        assign_batches(&[Some(batch("main.py", "patched\n"))], &mut exp).unwrap();

        // The slot now aliases the shared workspace, so the edit is visible
        // through both handles.
        let slot = exp.sub_workspaces[0].as_ref().unwrap();
        assert!(Arc::ptr_eq(slot, &exp.workspace));
        let ws = lock_workspace(&exp.workspace).unwrap();
        assert_eq!(ws.files()["main.py"], "patched\n");
    }

    #[test]
    fn test_idempotent_for_identical_batch() {
        let mut exp = experiment();
        let batches = vec![Some(batch("main.py", "patched\n"))];
        assign_batches(&batches, &mut exp).unwrap();
        let first = lock_workspace(&exp.workspace).unwrap().fingerprint();
        assign_batches(&batches, &mut exp).unwrap();
        let second = lock_workspace(&exp.workspace).unwrap().fingerprint();
        assert_eq!(first, second);
    }

    #[test]
    fn test_length_mismatch_is_invariant_error() {
        let mut exp = experiment();
        let result = assign_batches(&[None, None], &mut exp);
        assert!(matches!(result, Err(PipefixError::Invariant(_))));
    }

    #[test]
    fn test_empty_batch_is_a_noop_but_claims_slot() {
        let mut exp = experiment();
        assign_batches(&[Some(EditBatch::new())], &mut exp).unwrap();
        assert!(exp.sub_workspaces[0].is_some());
        let ws = lock_workspace(&exp.workspace).unwrap();
        assert_eq!(ws.files()["main.py"], "original\n");
    }
}
