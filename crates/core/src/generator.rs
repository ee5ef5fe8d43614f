use async_trait::async_trait;
use tracing::debug;

use crate::{error::GenerateError, provider::Provider};

/// Produces post text for one platform from a transcript. The call is
/// an opaque external capability; quality of the output is not this
/// crate's concern, but empty output counts as a failure.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        transcript: &str,
        platform: &str,
        language: &str,
    ) -> Result<String, GenerateError>;
}

/// Generator backed by an OpenAI-compatible chat completions API.
pub struct ApiContentGenerator {
    provider: Provider,
    client: reqwest::Client,
}

impl ApiContentGenerator {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            client: reqwest::Client::new(),
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

fn system_prompt(platform: &str, language: &str) -> String {
    format!(
        "You are a social media copywriter. \
         Write a concise {platform} post based ONLY on the transcript provided by the user. \
         Write strictly in {language}. Do not switch languages or translate. \
         Prefer short sentences. Avoid fluff. Keep it skimmable. \
         Add at most 1-2 relevant hashtags when they clearly add value."
    )
}

#[async_trait]
impl ContentGenerator for ApiContentGenerator {
    async fn generate(
        &self,
        transcript: &str,
        platform: &str,
        language: &str,
    ) -> Result<String, GenerateError> {
        debug!(platform, provider = self.provider.name(), "generating post content");
        let config = self.provider.config();
        let api_key = self.provider.validate_api_key()?;

        let response = self
            .client
            .post(config.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&serde_json::json!({
                "model": config.model,
                "messages": [
                    {
                        "role": "system",
                        "content": system_prompt(platform, language),
                    },
                    {
                        "role": "user",
                        "content": format!("Transcript:\n{transcript}"),
                    },
                ],
                "temperature": 0.7,
                "max_tokens": 500,
            }))
            .send()
            .await?
            .json::<serde_json::Value>()
            .await?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| GenerateError::InvalidResponse {
                reason: format!("unexpected response shape: {response}"),
            })?
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(GenerateError::EmptyOutput {
                platform: platform.to_string(),
            });
        }

        Ok(content)
    }
}
