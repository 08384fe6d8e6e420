// src/core/mod.rs — The refinement loop core

pub mod assign;
pub mod refine;
pub mod retry;
pub mod runner;
pub mod types;
pub mod workspace;
