use async_trait::async_trait;
use serde_json::Value;

use crate::error::{LedgerPilotError, Result};

pub mod openai;

pub use openai::OpenAiExtractor;

/// Turns a rendered prompt into a JSON object matching `schema`.
///
/// Implementations only guarantee well-formed JSON; callers still check the
/// shape before acting on it.
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, prompt: &str, schema: &Value) -> Result<Value>;
}

/// Stands in when no model endpoint is configured; every extraction fails
/// with the configuration problem that disabled it.
pub struct UnavailableExtractor {
    reason: String,
}

impl UnavailableExtractor {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl IntentExtractor for UnavailableExtractor {
    async fn extract(&self, _prompt: &str, _schema: &Value) -> Result<Value> {
        Err(LedgerPilotError::Config(self.reason.clone()))
    }
}
