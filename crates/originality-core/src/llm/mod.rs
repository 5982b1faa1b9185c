//! Text-understanding capability: trait, gateway client, JSON extraction.

pub mod gateway;
pub mod json;
pub mod mock;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use gateway::ChatGateway;
pub use json::{JsonShape, extract_json};

/// A single system + user prompt exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl ModelRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, temperature: f32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ModelError {
    #[error("text model is not configured")]
    NotConfigured,
    #[error("text model request failed: {0}")]
    Http(String),
    #[error("text model returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("text model returned an empty response")]
    EmptyResponse,
    #[error("text model response was not usable: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        ModelError::Http(e.to_string())
    }
}

/// An external text-understanding service.
///
/// Implementations return the raw text content of the model's reply.
pub trait TextModel: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>>;
}

/// Run `request` and locate the first JSON value of `shape` in the reply.
pub async fn generate_json(
    model: &dyn TextModel,
    request: &ModelRequest,
    shape: JsonShape,
) -> Result<serde_json::Value, ModelError> {
    let content = model.generate(request).await?;
    if content.trim().is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    extract_json(&content, shape).ok_or_else(|| {
        ModelError::Malformed(format!("no JSON {} found in response", shape.as_str()))
    })
}
