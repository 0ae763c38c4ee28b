use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::OpenAiSettings;
use crate::error::{LedgerPilotError, Result};
use crate::extraction::IntentExtractor;

const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const SYSTEM_PROMPT: &str = "You extract wallet operation parameters from a conversation. \
Respond only with a JSON object that matches the provided schema. \
Use null for anything the user did not state; never invent addresses or amounts.";

/// Structured-output extraction against an OpenAI-compatible
/// `chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiExtractor {
    model: String,
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl OpenAiExtractor {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        Self {
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &OpenAiSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .as_ref()
            .map(|key| key.expose().to_string())
            .ok_or_else(|| {
                LedgerPilotError::Config("OPENAI_API_KEY must be configured".to_string())
            })?;
        Ok(Self::new(
            api_key,
            settings.model.clone(),
            settings.base_url.clone(),
        ))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerPilotError::Http(e.to_string()))?;
        Ok(self)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: &str, schema: &Value) -> Result<CreateChatCompletionRequest> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_PROMPT)
            .build()
            .map_err(|e| LedgerPilotError::Config(format!("invalid chat request: {e}")))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Text(
                prompt.to_string(),
            ))
            .build()
            .map_err(|e| LedgerPilotError::Config(format!("invalid chat request: {e}")))?;

        let name = schema
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("wallet_intent")
            .to_string();
        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                name,
                description: None,
                schema: Some(schema.clone()),
                strict: Some(true),
            },
        };

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(self.model.clone());
        builder.messages(vec![
            ChatCompletionRequestMessage::System(system),
            ChatCompletionRequestMessage::User(user),
        ]);
        builder.response_format(response_format);
        builder
            .build()
            .map_err(|e| LedgerPilotError::Config(format!("invalid chat request: {e}")))
    }

    async fn raw_chat_completion(&self, request: &CreateChatCompletionRequest) -> Result<Value> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LedgerPilotError::Http(format!("chat completion transport failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LedgerPilotError::Http(format!("chat completion read failed: {e}")))?;
        if status != StatusCode::OK {
            return Err(LedgerPilotError::Http(format!(
                "chat completion failed ({status}): {body}"
            )));
        }
        serde_json::from_str(&body).map_err(|e| {
            LedgerPilotError::Http(format!("chat completion decode failed: {e}"))
        })
    }
}

fn extract_text(response: &Value) -> Option<&str> {
    response
        .get("choices")
        .and_then(|v| v.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
}

/// Models sometimes wrap JSON in a markdown fence despite the response format.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[async_trait]
impl IntentExtractor for OpenAiExtractor {
    async fn extract(&self, prompt: &str, schema: &Value) -> Result<Value> {
        let request = self.build_request(prompt, schema)?;
        let response = self.raw_chat_completion(&request).await?;
        let content = extract_text(&response).ok_or_else(|| {
            LedgerPilotError::ExtractionInvalid("empty chat completion response".to_string())
        })?;
        debug!(model = %self.model, "structured extraction returned {} bytes", content.len());
        let parsed: Value = serde_json::from_str(strip_code_fence(content)).map_err(|e| {
            LedgerPilotError::ExtractionInvalid(format!("model output is not JSON: {e}"))
        })?;
        if !parsed.is_object() {
            return Err(LedgerPilotError::ExtractionInvalid(
                "model output is not a JSON object".to_string(),
            ));
        }
        Ok(parsed)
    }
}
