//! Wallet actions. Each handler walks the same stages: gather wallet
//! context, extract an intent, validate it, execute against the chain and
//! report through the callback exactly once.

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{LedgerPilotError, Result};
use crate::interfaces::actions::{ActionCallback, ActionReply, Message, State};
use crate::keys::Address;
use crate::runtime::WalletRuntime;
use crate::units;
use crate::wallet::WalletProvider;

pub mod balance;
pub mod batch_transfer;
pub mod deploy_token;
pub mod faucet;
pub mod templates;
pub mod transfer;

pub use balance::BalanceAction;
pub use batch_transfer::BatchTransferAction;
pub use deploy_token::DeployTokenAction;
pub use faucet::FaucetAction;
pub use transfer::TransferAction;

/// Error plus any partial results worth reporting alongside it.
#[derive(Debug)]
pub struct ActionFailure {
    pub error: LedgerPilotError,
    pub details: Map<String, Value>,
}

impl ActionFailure {
    pub fn with_details(error: LedgerPilotError, details: Map<String, Value>) -> Self {
        Self { error, details }
    }
}

impl From<LedgerPilotError> for ActionFailure {
    fn from(error: LedgerPilotError) -> Self {
        Self {
            error,
            details: Map::new(),
        }
    }
}

pub type ActionOutcome = std::result::Result<ActionReply, ActionFailure>;

/// Fills the template placeholders. The current message is appended to the
/// recent history unless the host already included it.
pub fn compose_context(template: &str, wallet_info: &str, message: &Message, state: &State) -> String {
    let mut recent = state.recent_messages.clone();
    if recent.last().map(String::as_str) != Some(message.text.as_str()) {
        recent.push(message.text.clone());
    }
    template
        .replace("{{walletInfo}}", wallet_info)
        .replace("{{recentMessages}}", &recent.join("\n"))
}

pub(crate) async fn extract_intent(
    runtime: &WalletRuntime,
    wallet: &WalletProvider,
    template: &str,
    schema: &Value,
    message: &Message,
    state: &State,
) -> Result<Value> {
    let wallet_info = wallet.wallet_context().await;
    let prompt = compose_context(template, &wallet_info, message, state);
    let intent = runtime.extractor().extract(&prompt, schema).await?;
    debug!(%intent, "extracted intent");
    Ok(intent)
}

/// Delivers the single reply for an invocation and returns the handler result.
pub(crate) fn finish(
    action: &str,
    failure_text: &str,
    outcome: ActionOutcome,
    callback: ActionCallback,
) -> bool {
    match outcome {
        Ok(reply) => {
            info!(action, "action succeeded");
            callback(reply);
            true
        }
        Err(failure) => {
            warn!(action, kind = failure.error.kind().as_str(), "action failed: {}", failure.error);
            let mut reply = ActionReply::failure(
                format!("{failure_text}: {}", failure.error.detail()),
                &failure.error,
            );
            if let Value::Object(content) = &mut reply.content {
                content.extend(failure.details);
            }
            callback(reply);
            false
        }
    }
}

pub(crate) fn has_text(message: &Message) -> bool {
    !message.text.trim().is_empty()
}

pub(crate) fn optional_string(intent: &Value, field: &str) -> Result<Option<String>> {
    match intent.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.trim().to_string())),
        Some(other) => Err(LedgerPilotError::ExtractionInvalid(format!(
            "{field} must be a string, got {other}"
        ))),
    }
}

pub(crate) fn required_string(intent: &Value, field: &str) -> Result<String> {
    optional_string(intent, field)?
        .ok_or_else(|| LedgerPilotError::ExtractionInvalid(format!("{field} is required")))
}

pub(crate) fn optional_address(intent: &Value, field: &str) -> Result<Option<Address>> {
    optional_string(intent, field)?
        .map(|text| text.parse::<Address>())
        .transpose()
}

pub(crate) fn required_address(intent: &Value, field: &str) -> Result<Address> {
    required_string(intent, field)?.parse()
}

pub(crate) fn required_amount(intent: &Value, field: &str) -> Result<Decimal> {
    let value = intent
        .get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| LedgerPilotError::ExtractionInvalid(format!("{field} is required")))?;
    let amount = units::decimal_from_json(value)?;
    if amount <= Decimal::ZERO {
        return Err(LedgerPilotError::ExtractionInvalid(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(amount)
}

pub(crate) fn required_string_list(intent: &Value, field: &str) -> Result<Vec<String>> {
    let items = intent
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| LedgerPilotError::ExtractionInvalid(format!("{field} must be a list")))?;
    if items.is_empty() {
        return Err(LedgerPilotError::ExtractionInvalid(format!(
            "{field} must not be empty"
        )));
    }
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item.as_str().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(LedgerPilotError::ExtractionInvalid(format!(
                "{field}[{index}] must be a non-empty string"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn compose_context_fills_placeholders_once() {
        let message = Message::new("u1", "send 2 to bob");
        let state = State::with_recent(vec!["hi".to_string(), "send 2 to bob".to_string()]);
        let prompt = compose_context("{{walletInfo}}\n--\n{{recentMessages}}", "W", &message, &state);
        assert_eq!(prompt, "W\n--\nhi\nsend 2 to bob");

        let prompt = compose_context("{{recentMessages}}", "W", &message, &State::default());
        assert_eq!(prompt, "send 2 to bob");
    }

    #[test]
    fn structural_predicates_reject_bad_shapes() {
        let intent = json!({
            "recipients": ["a", ""],
            "amount": true,
            "address": 7,
            "token_address": null,
        });
        assert!(required_string_list(&intent, "recipients").is_err());
        assert!(required_amount(&intent, "amount").is_err());
        assert!(optional_string(&intent, "address").is_err());
        assert_eq!(optional_address(&intent, "token_address").unwrap(), None);
        assert!(required_string_list(&json!({"recipients": []}), "recipients").is_err());
        assert!(required_amount(&json!({"amount": "0"}), "amount").is_err());
        assert_eq!(
            required_amount(&json!({"amount": 1.25}), "amount").unwrap(),
            Decimal::from_str("1.25").unwrap()
        );
    }

    #[test]
    fn failure_reply_keeps_partial_details() {
        let captured = std::sync::Arc::new(std::sync::Mutex::new(None));
        let sink = captured.clone();
        let mut details = Map::new();
        details.insert("submitted".to_string(), json!(["h1"]));
        let ok = finish(
            "TEST",
            "Batch failed",
            Err(ActionFailure::with_details(
                LedgerPilotError::ChainRejected("nonce too low".to_string()),
                details,
            )),
            Box::new(move |reply| *sink.lock().unwrap() = Some(reply)),
        );
        assert!(!ok);
        let reply = captured.lock().unwrap().take().unwrap();
        assert_eq!(reply.text, "Batch failed: nonce too low");
        assert_eq!(reply.content["kind"], json!("chain_rejected"));
        assert_eq!(reply.content["submitted"], json!(["h1"]));
    }
}
