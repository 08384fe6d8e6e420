// src/evaluator/mod.rs — Evaluator framework

pub mod model_dump;
pub mod parser;
pub mod pipeline;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::core::types::{CheckOutcome, Feedback, Task};
use crate::core::workspace::SharedWorkspace;
use crate::infra::errors::PipefixError;

/// One evaluator's contribution to a round of feedback.
#[derive(Debug, Clone)]
pub struct EvaluatorVerdict {
    pub outcome: CheckOutcome,
    pub hyperparameter_tuning_decision: bool,
    pub hyperparameter_tuning_suggestion: Option<String>,
}

impl EvaluatorVerdict {
    /// A verdict that carries no tuning signal, only a check outcome.
    pub fn check_only(outcome: CheckOutcome) -> Self {
        Self {
            outcome,
            hyperparameter_tuning_decision: false,
            hyperparameter_tuning_suggestion: None,
        }
    }
}

/// Shared capability: evaluate the current workspace, return one verdict.
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(
        &self,
        task: &Task,
        workspace: &SharedWorkspace,
    ) -> Result<EvaluatorVerdict, PipefixError>;
}

/// Composes a fixed-order sequence of evaluators into one merged Feedback.
///
/// Whether the evaluators run sequentially or concurrently is a configuration
/// choice; the merge is deterministic either way because verdicts are combined
/// in registration order.
pub struct MultiEvaluator {
    evaluators: Vec<Arc<dyn Evaluator>>,
    parallel: bool,
}

impl MultiEvaluator {
    pub fn new(parallel: bool) -> Self {
        Self {
            evaluators: Vec::new(),
            parallel,
        }
    }

    pub fn push(&mut self, evaluator: Arc<dyn Evaluator>) {
        self.evaluators.push(evaluator);
    }

    pub fn with(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.push(evaluator);
        self
    }

    pub async fn evaluate(
        &self,
        task: &Task,
        workspace: &SharedWorkspace,
    ) -> Result<Feedback, PipefixError> {
        if self.evaluators.is_empty() {
            return Err(PipefixError::Invariant("no evaluators registered".into()));
        }

        let verdicts: Vec<EvaluatorVerdict> = if self.parallel {
            join_all(
                self.evaluators
                    .iter()
                    .map(|e| e.evaluate(task, workspace)),
            )
            .await
            .into_iter()
            .collect::<Result<_, _>>()?
        } else {
            let mut out = Vec::with_capacity(self.evaluators.len());
            for evaluator in &self.evaluators {
                out.push(evaluator.evaluate(task, workspace).await?);
            }
            out
        };

        Ok(merge_verdicts(verdicts))
    }
}

/// Deterministic merge: checks keep evaluator order, the tuning decision is
/// true when any verdict asserts it, and the first suggestion wins.
fn merge_verdicts(verdicts: Vec<EvaluatorVerdict>) -> Feedback {
    let mut feedback = Feedback::default();
    for verdict in verdicts {
        feedback.checks.push(verdict.outcome);
        feedback.hyperparameter_tuning_decision |= verdict.hyperparameter_tuning_decision;
        if feedback.hyperparameter_tuning_suggestion.is_none() {
            feedback.hyperparameter_tuning_suggestion = verdict.hyperparameter_tuning_suggestion;
        }
    }
    feedback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::workspace::Workspace;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    struct FixedEvaluator {
        name: String,
        verdict: EvaluatorVerdict,
    }

    #[async_trait]
    impl Evaluator for FixedEvaluator {
        fn name(&self) -> &str {
            &self.name
        }

        async fn evaluate(
            &self,
            _task: &Task,
            _workspace: &SharedWorkspace,
        ) -> Result<EvaluatorVerdict, PipefixError> {
            Ok(self.verdict.clone())
        }
    }

    fn fixed(name: &str, passed: bool, tuning: bool) -> Arc<dyn Evaluator> {
        Arc::new(FixedEvaluator {
            name: name.to_string(),
            verdict: EvaluatorVerdict {
                outcome: CheckOutcome {
                    check: name.to_string(),
                    passed,
                    execution: "ran".into(),
                    critique: format!("{name} critique"),
                },
                hyperparameter_tuning_decision: tuning,
                hyperparameter_tuning_suggestion: tuning.then(|| format!("{name} suggestion")),
            },
        })
    }

    fn ws() -> SharedWorkspace {
        Workspace::from_files(BTreeMap::new()).into_shared()
    }

    #[tokio::test]
    async fn test_merge_keeps_registration_order() {
        let agg = MultiEvaluator::new(false)
            .with(fixed("pipeline", true, false))
            .with(fixed("model_dump", false, false));
        let fb = agg.evaluate(&Task::new("t", "d"), &ws()).await.unwrap();
        assert_eq!(fb.checks.len(), 2);
        assert_eq!(fb.checks[0].check, "pipeline");
        assert_eq!(fb.checks[1].check, "model_dump");
        assert!(!fb.passed());
    }

    #[tokio::test]
    async fn test_merge_order_identical_when_parallel() {
        let fb = MultiEvaluator::new(true)
            .with(fixed("pipeline", true, false))
            .with(fixed("model_dump", true, false))
            .evaluate(&Task::new("t", "d"), &ws())
            .await
            .unwrap();
        assert_eq!(fb.checks[0].check, "pipeline");
        assert_eq!(fb.checks[1].check, "model_dump");
        assert!(fb.passed());
    }

    #[tokio::test]
    async fn test_tuning_decision_is_or_and_first_suggestion_wins() {
        let fb = MultiEvaluator::new(false)
            .with(fixed("a", true, true))
            .with(fixed("b", true, true))
            .evaluate(&Task::new("t", "d"), &ws())
            .await
            .unwrap();
        assert!(fb.hyperparameter_tuning_decision);
        assert_eq!(
            fb.hyperparameter_tuning_suggestion.as_deref(),
            Some("a suggestion")
        );
    }

    #[tokio::test]
    async fn test_empty_aggregator_is_invariant_error() {
        let result = MultiEvaluator::new(false)
            .evaluate(&Task::new("t", "d"), &ws())
            .await;
        assert!(matches!(result, Err(PipefixError::Invariant(_))));
    }
}
