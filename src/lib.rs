// src/lib.rs — Library root for pipefix

pub mod cli;
pub mod core;
pub mod evaluator;
pub mod infra;
pub mod oracle;
pub mod prompts;
pub mod sandbox;
