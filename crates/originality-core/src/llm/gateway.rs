//! OpenAI-compatible chat completions client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::json;

use super::{ModelError, ModelRequest, TextModel};
use crate::Config;

/// Chat completions gateway (`POST {base_url}/chat/completions`).
pub struct ChatGateway {
    api_key: Option<String>,
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for ChatGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatGateway")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ChatGateway {
    pub fn new(
        client: reqwest::Client,
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into(),
            model: model.into(),
            timeout,
            client,
        }
    }

    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        Self::new(
            client,
            config.model_api_key.clone(),
            config.model_base_url.clone(),
            config.model_name.clone(),
            config.model_timeout(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl TextModel for ChatGateway {
    fn generate<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        Box::pin(async move {
            let Some(key) = self.api_key.as_deref() else {
                return Err(ModelError::NotConfigured);
            };

            let body = json!({
                "model": &self.model,
                "messages": [
                    {"role": "system", "content": &request.system},
                    {"role": "user", "content": &request.user},
                ],
                "temperature": request.temperature,
            });

            let resp = self
                .client
                .post(self.endpoint())
                .bearer_auth(key)
                .timeout(self.timeout)
                .json(&body)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let message = resp.text().await.unwrap_or_default();
                return Err(ModelError::Status {
                    status: status.as_u16(),
                    message: message.chars().take(200).collect(),
                });
            }

            let data: serde_json::Value = resp.json().await?;
            parse_completion(&data)
        })
    }
}

fn parse_completion(data: &serde_json::Value) -> Result<String, ModelError> {
    let content = data["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("");
    if content.trim().is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(content.to_string())
}
