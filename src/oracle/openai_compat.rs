// src/oracle/openai_compat.rs — OpenAI-compatible chat-completions oracle
//
// Works against any endpoint speaking the OpenAI chat API (OpenAI, Groq,
// DeepSeek, local vLLM/ollama gateways).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::Oracle;
use crate::infra::config::OracleConfig;
use crate::infra::errors::PipefixError;

pub struct OpenAICompatOracle {
    id_str: String,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAICompatOracle {
    pub fn new(api_key: String, base_url: String, model: String, timeout: Duration) -> Self {
        Self {
            id_str: "openai-compat".into(),
            api_key,
            base_url,
            model,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Build an oracle from config, reading the API key from the configured
    /// environment variable.
    pub fn from_config(config: &OracleConfig) -> Result<Self, PipefixError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            PipefixError::Config(format!(
                "oracle API key not found in ${}",
                config.api_key_env
            ))
        })?;
        Ok(Self::new(
            api_key,
            config.base_url.clone(),
            config.model.clone(),
            Duration::from_secs(config.timeout_seconds),
        ))
    }

    fn error(&self, message: impl Into<String>) -> PipefixError {
        PipefixError::Oracle {
            oracle: self.id_str.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Oracle for OpenAICompatOracle {
    fn id(&self) -> &str {
        &self.id_str
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, PipefixError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt },
            ],
            "temperature": 0.2,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header(
                "User-Agent",
                format!("pipefix/{}", env!("CARGO_PKG_VERSION")),
            )
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.error(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.error(format!("HTTP {status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.error(format!("failed to parse response: {e}")))?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.error("response carried no message content"))
    }
}
