use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ErrorKind, LedgerPilotError, Result};

/// Inbound chat message an action is asked to handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub user_id: String,
    pub text: String,
}

impl Message {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
        }
    }
}

/// Conversation state supplied by the host runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub recent_messages: Vec<String>,
}

impl State {
    pub fn with_recent(recent_messages: Vec<String>) -> Self {
        Self { recent_messages }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionReply {
    pub text: String,
    pub content: Value,
}

impl ActionReply {
    pub fn success(text: impl Into<String>, details: Value) -> Self {
        let mut content = match details {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                map
            }
        };
        content.insert("success".to_string(), Value::Bool(true));
        Self {
            text: text.into(),
            content: Value::Object(content),
        }
    }

    pub fn failure(text: impl Into<String>, error: &LedgerPilotError) -> Self {
        Self {
            text: text.into(),
            content: json!({
                "error": error.detail(),
                "kind": error.kind(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.content.get("success").and_then(Value::as_bool) == Some(true)
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        let kind = self.content.get("kind")?.as_str()?;
        [
            ErrorKind::ExtractionInvalid,
            ErrorKind::NetworkUnavailable,
            ErrorKind::AccountNotFound,
            ErrorKind::ChainRejected,
            ErrorKind::Configuration,
            ErrorKind::Storage,
        ]
        .into_iter()
        .find(|candidate| candidate.as_str() == kind)
    }
}

/// Receives exactly one reply per handler invocation.
pub type ActionCallback = Box<dyn FnOnce(ActionReply) + Send>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionExample {
    pub user: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl ActionExample {
    pub fn user(text: &str) -> Self {
        Self {
            user: "{{user1}}".to_string(),
            text: text.to_string(),
            action: None,
        }
    }

    pub fn agent(text: &str, action: &str) -> Self {
        Self {
            user: "{{agent}}".to_string(),
            text: text.to_string(),
            action: Some(action.to_string()),
        }
    }
}

#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;
    fn similes(&self) -> &[&str];
    fn description(&self) -> &str;
    fn examples(&self) -> Vec<Vec<ActionExample>>;
    /// Cheap gate run before `handle`; never touches the network.
    fn validate(&self, message: &Message) -> bool;
    /// Runs the action and reports through `callback`. Returns whether the
    /// operation succeeded.
    async fn handle(&self, message: &Message, state: &State, callback: ActionCallback) -> bool;
}

/// Supplies text the host runtime injects into the agent's prompt.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn get(&self, message: &Message, state: &State) -> Result<String>;
}

#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn initialize(&self, registry: &crate::plugins::registry::ActionRegistry) -> bool;
}
