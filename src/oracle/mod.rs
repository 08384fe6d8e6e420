// src/oracle/mod.rs — Code-generation oracle seam

pub mod openai_compat;

use async_trait::async_trait;

use crate::infra::errors::PipefixError;

/// External service that, given instructions, returns proposed source-code
/// edits as text. Treated as unreliable; callers wrap invocations in the
/// bounded-retry combinator.
#[async_trait]
pub trait Oracle: Send + Sync {
    fn id(&self) -> &str;

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, PipefixError>;
}
