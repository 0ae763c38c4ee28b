//! Prompt templates and the JSON schemas the extractor must satisfy.
//!
//! `{{walletInfo}}` and `{{recentMessages}}` are filled by
//! [`compose_context`](super::compose_context).

use serde_json::{json, Value};

pub const BALANCE_TEMPLATE: &str = "Extract the balance lookup the user is asking for.

{{walletInfo}}

Recent messages:
{{recentMessages}}

Given the recent messages, extract:
- address: the account to inspect, or null for the agent's own wallet
- token_address: the token ledger address, or null for the native asset";

pub const FAUCET_TEMPLATE: &str = "Extract the faucet request.

{{walletInfo}}

Recent messages:
{{recentMessages}}

Given the recent messages, extract:
- address: the account to fund, or null for the agent's own wallet";

pub const TRANSFER_TEMPLATE: &str = "Extract the token transfer the user is asking for.

{{walletInfo}}

Recent messages:
{{recentMessages}}

Given the recent messages, extract:
- recipient: the destination address exactly as written
- amount: the amount in whole token units, e.g. \"1.5\"
- token_address: the token ledger address, or null for the native asset";

pub const BATCH_TRANSFER_TEMPLATE: &str = "Extract the batch transfer the user is asking for. \
Every recipient receives the same amount.

{{walletInfo}}

Recent messages:
{{recentMessages}}

Given the recent messages, extract:
- recipients: every destination address exactly as written, in order
- amount: the amount each recipient receives in whole token units";

pub const DEPLOY_TOKEN_TEMPLATE: &str = "Extract the parameters of the fungible token to deploy.

{{walletInfo}}

Recent messages:
{{recentMessages}}

Given the recent messages, extract:
- symbol: the token ticker, at most 6 characters
- decimals: the number of decimal places, default 9
- recipient: the address receiving the initial supply, or null for the agent's own wallet
- initial_supply: the amount to mint in whole token units";

fn nullable_string(description: &str) -> Value {
    json!({ "type": ["string", "null"], "description": description })
}

fn amount(description: &str) -> Value {
    json!({ "type": ["string", "number"], "description": description })
}

fn object_schema(title: &str, properties: Value) -> Value {
    let required: Vec<String> = properties
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();
    json!({
        "title": title,
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

pub fn balance_schema() -> Value {
    object_schema(
        "balance_intent",
        json!({
            "address": nullable_string("Account to inspect"),
            "token_address": nullable_string("Token ledger address"),
        }),
    )
}

pub fn faucet_schema() -> Value {
    object_schema(
        "faucet_intent",
        json!({ "address": nullable_string("Account to fund") }),
    )
}

pub fn transfer_schema() -> Value {
    object_schema(
        "transfer_intent",
        json!({
            "recipient": { "type": "string", "description": "Destination address" },
            "amount": amount("Amount in whole token units"),
            "token_address": nullable_string("Token ledger address"),
        }),
    )
}

pub fn batch_transfer_schema() -> Value {
    object_schema(
        "batch_transfer_intent",
        json!({
            "recipients": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Destination addresses in order"
            },
            "amount": amount("Amount each recipient receives"),
        }),
    )
}

pub fn deploy_token_schema() -> Value {
    object_schema(
        "deploy_token_intent",
        json!({
            "symbol": { "type": "string", "description": "Token ticker" },
            "decimals": { "type": ["integer", "null"], "description": "Decimal places" },
            "recipient": nullable_string("Receiver of the initial supply"),
            "initial_supply": amount("Initial supply in whole token units"),
        }),
    )
}
