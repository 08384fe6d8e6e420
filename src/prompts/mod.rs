// src/prompts/mod.rs — Prompt selection and rendering

pub mod extract;

use std::collections::BTreeMap;

use minijinja::{context, Environment};

use crate::core::types::{EditBatch, Feedback};
use crate::infra::errors::PipefixError;

const SYSTEM_REFINE_TEMPLATE: &str = include_str!("templates/system_refine.md");
const USER_TEMPLATE: &str = include_str!("templates/user.md");

/// Output spec for full-file rewrites. File deletions are not allowed in this
/// mode, so the spec does not mention the delete marker.
const FULL_REWRITE_SPEC: &str = "\
For every file you change, output the file path on its own line, followed by a
fenced code block containing the file's COMPLETE new content. Example:

main.py
```python
<full content of main.py>
```

Only include files that need changes. Never delete files.";

/// Output spec for unified-diff patches.
const PATCH_SPEC: &str = "\
Output your changes as unified diffs, one per file, using standard headers:

--- a/path/to/file.py
+++ b/path/to/file.py
@@ -1,3 +1,3 @@

Context lines must match the current file content exactly. Only include files
that need changes.";

/// Which shape of edit the oracle is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    FullRewrite,
    Patch,
}

impl EditMode {
    pub fn from_diff_flag(diff_mode: bool) -> Self {
        if diff_mode {
            EditMode::Patch
        } else {
            EditMode::FullRewrite
        }
    }
}

/// Chooses and renders the instruction templates for one refinement step.
///
/// Both the debugging and the tuning branch render the same `system_refine`
/// template; the difference is the argument set (the tuning branch omits the
/// task description). That asymmetry is what tells the oracle which job it
/// has, so the two branches must not be collapsed.
pub struct PromptSelector {
    env: Environment<'static>,
    mode: EditMode,
}

impl PromptSelector {
    pub fn new(mode: EditMode) -> Self {
        let mut env = Environment::new();
        env.add_template("system_refine", SYSTEM_REFINE_TEMPLATE)
            .expect("system_refine template should be valid");
        env.add_template("user", USER_TEMPLATE)
            .expect("user template should be valid");
        Self { env, mode }
    }

    fn out_spec(&self) -> &'static str {
        match self.mode {
            EditMode::FullRewrite => FULL_REWRITE_SPEC,
            EditMode::Patch => PATCH_SPEC,
        }
    }

    /// Render the system prompt. `task_desc` present selects the debugging
    /// branch; absent selects the hyperparameter-tuning branch.
    pub fn system_prompt(&self, task_desc: Option<&str>) -> Result<String, PipefixError> {
        let template = self
            .env
            .get_template("system_refine")
            .map_err(anyhow::Error::new)?;
        let rendered = template
            .render(context! {
                task_desc => task_desc,
                out_spec => self.out_spec(),
            })
            .map_err(anyhow::Error::new)?;
        Ok(rendered)
    }

    /// Render the user prompt from the full workspace contents and the latest
    /// feedback. The tuning suggestion is included only when present.
    pub fn user_prompt(&self, code: &str, feedback: &Feedback) -> Result<String, PipefixError> {
        let template = self.env.get_template("user").map_err(anyhow::Error::new)?;
        let rendered = template
            .render(context! {
                code => code,
                feedback => feedback.to_string(),
                hyperparameter_tuning_suggestion => feedback
                    .hyperparameter_tuning_suggestion
                    .as_deref()
                    .filter(|s| !s.trim().is_empty()),
            })
            .map_err(anyhow::Error::new)?;
        Ok(rendered)
    }

    /// Run the extractor paired with the current output spec.
    pub fn extract(
        &self,
        reply: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<EditBatch, PipefixError> {
        match self.mode {
            EditMode::FullRewrite => extract::extract_full_rewrite(reply),
            EditMode::Patch => extract::extract_patch(reply, files),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CheckOutcome;

    fn feedback(tuning: bool) -> Feedback {
        Feedback {
            checks: vec![CheckOutcome {
                check: "pipeline".into(),
                passed: false,
                execution: "Traceback (most recent call last)".into(),
                critique: "KeyError on column 'target'".into(),
            }],
            hyperparameter_tuning_decision: tuning,
            hyperparameter_tuning_suggestion: tuning.then(|| "increase n_estimators".to_string()),
        }
    }

    #[test]
    fn test_debugging_branch_includes_task_description() {
        let selector = PromptSelector::new(EditMode::FullRewrite);
        let prompt = selector
            .system_prompt(Some("Debug running solution\nfix the crash"))
            .unwrap();
        assert!(prompt.contains("## Target task"));
        assert!(prompt.contains("fix the crash"));
        assert!(!prompt.contains("hyperparameter tuning only"));
    }

    #[test]
    fn test_tuning_branch_omits_task_description() {
        let selector = PromptSelector::new(EditMode::FullRewrite);
        let prompt = selector.system_prompt(None).unwrap();
        assert!(!prompt.contains("## Target task"));
        assert!(prompt.contains("hyperparameter tuning only"));
    }

    #[test]
    fn test_out_spec_follows_mode() {
        let full = PromptSelector::new(EditMode::FullRewrite);
        assert!(full.system_prompt(None).unwrap().contains("COMPLETE new content"));

        let patch = PromptSelector::new(EditMode::Patch);
        assert!(patch.system_prompt(None).unwrap().contains("unified diffs"));
    }

    #[test]
    fn test_user_prompt_includes_code_and_feedback() {
        let selector = PromptSelector::new(EditMode::FullRewrite);
        let prompt = selector
            .user_prompt("### main.py\n```\nprint(1)\n```", &feedback(false))
            .unwrap();
        assert!(prompt.contains("main.py"));
        assert!(prompt.contains("KeyError on column 'target'"));
        assert!(!prompt.contains("## Hyperparameter tuning suggestion"));
    }

    #[test]
    fn test_user_prompt_includes_suggestion_when_tuning() {
        let selector = PromptSelector::new(EditMode::FullRewrite);
        let prompt = selector.user_prompt("code", &feedback(true)).unwrap();
        assert!(prompt.contains("## Hyperparameter tuning suggestion"));
        assert!(prompt.contains("increase n_estimators"));
    }
}
