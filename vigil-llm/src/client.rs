use std::env;

use anyhow::Context as _;
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
    models::ModelOptions,
};

/// Client for the fragile generative-text dependency.
///
/// Every failure returned from this service must be reported into the
/// [`crate::CircuitBreaker`] by the caller.
#[derive(Clone, Debug)]
pub struct LlmService {
    client: Ollama,
    model: String,
}

impl LlmService {
    pub fn from_env_optional() -> anyhow::Result<Option<Self>> {
        let enabled = env::var("OLLAMA_ENABLED")
            .ok()
            .map(|value| {
                matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            })
            .unwrap_or(true);

        if !enabled {
            return Ok(None);
        }

        let host_raw = env::var("OLLAMA_HOST").ok();
        let port_raw = env::var("OLLAMA_PORT").ok();
        let model_raw = env::var("OLLAMA_MODEL").ok();

        let host = host_raw.as_deref().map(str::trim).unwrap_or_default();
        let port = port_raw.as_deref().map(str::trim).unwrap_or_default();
        let model = model_raw.as_deref().map(str::trim).unwrap_or_default();

        if host.is_empty() && port.is_empty() && model.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self::from_env()?))
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("OLLAMA_HOST")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "http://127.0.0.1".to_owned());
        let port = env::var("OLLAMA_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(11434);
        let model = env::var("OLLAMA_MODEL")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "gpt-oss:20b-cloud".to_owned());

        let client = Ollama::new(host, port);
        Ok(Self { client, model })
    }

    /// Generate a reply to `prompt` given recent channel context.
    ///
    /// `recent_context` is ordered oldest-first; only the last five entries
    /// are forwarded to keep the request small.
    pub async fn generate(&self, prompt: &str, recent_context: &[String]) -> anyhow::Result<String> {
        let context_tail = recent_context
            .iter()
            .rev()
            .take(5)
            .rev()
            .cloned()
            .collect::<Vec<_>>();

        let mut messages = Vec::with_capacity(context_tail.len() + 2);
        messages.push(ChatMessage::system(crate::prompt::system_prompt()));

        if !context_tail.is_empty() {
            let context_block = context_tail
                .iter()
                .map(|line| format!("Context: {line}"))
                .collect::<Vec<_>>()
                .join("\n");
            messages.push(ChatMessage::system(context_block));
        }

        messages.push(ChatMessage::user(prompt.to_owned()));

        let request = ChatMessageRequest::new(self.model.clone(), messages).options(
            ModelOptions::default()
                .temperature(0.75)
                .repeat_penalty(1.2),
        );
        let response = self
            .client
            .send_chat_messages(request)
            .await
            .context("failed to get ollama chat response")?;

        Ok(response.message.content.trim().to_owned())
    }

    /// Generate a conversation-revival question, steering the model away from
    /// recently posted outputs.
    pub async fn generate_revive_question(&self, avoid: &[String]) -> anyhow::Result<String> {
        let prompt = crate::prompt::revive_prompt(avoid);
        self.generate(&prompt, &[]).await
    }
}
