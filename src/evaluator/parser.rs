// src/evaluator/parser.rs — Parse the judge's JSON verdict

use serde::Deserialize;

use crate::infra::errors::PipefixError;

/// The judge's structured assessment of one pipeline run.
#[derive(Debug, Clone, Deserialize)]
pub struct JudgeVerdict {
    #[serde(default)]
    pub execution: String,
    #[serde(default)]
    pub return_checking: String,
    #[serde(default)]
    pub code: String,
    pub final_decision: bool,
    #[serde(default)]
    pub hyperparameter_tuning_decision: bool,
    #[serde(default)]
    pub hyperparameter_tuning_suggestion: Option<String>,
}

/// Pull the first JSON object out of a raw model reply, tolerating fenced
/// blocks and surrounding prose.
pub fn parse_judge_reply(raw: &str) -> Result<JudgeVerdict, PipefixError> {
    let start = raw
        .find('{')
        .ok_or_else(|| PipefixError::Extract("judge reply has no JSON object".into()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| PipefixError::Extract("judge reply has no closing brace".into()))?;
    if end < start {
        return Err(PipefixError::Extract("judge reply braces unbalanced".into()));
    }
    serde_json::from_str(&raw[start..=end])
        .map_err(|e| PipefixError::Extract(format!("judge reply is not valid JSON: {e}")))
}
