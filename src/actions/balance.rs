use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::actions::templates::{balance_schema, BALANCE_TEMPLATE};
use crate::actions::{extract_intent, finish, has_text, optional_address, ActionOutcome};
use crate::interfaces::actions::{Action, ActionCallback, ActionExample, ActionReply, Message, State};
use crate::price::Portfolio;
use crate::runtime::WalletRuntime;
use crate::units;

pub const NAME: &str = "GET_BALANCE";

pub struct BalanceAction {
    runtime: Arc<WalletRuntime>,
}

impl BalanceAction {
    pub fn new(runtime: Arc<WalletRuntime>) -> Self {
        Self { runtime }
    }

    async fn run(&self, message: &Message, state: &State) -> ActionOutcome {
        let config = self.runtime.config()?;
        let wallet = self.runtime.wallet(&config)?;
        let intent = extract_intent(
            &self.runtime,
            &wallet,
            BALANCE_TEMPLATE,
            &balance_schema(),
            message,
            state,
        )
        .await?;

        let address = optional_address(&intent, "address")?.unwrap_or_else(|| wallet.address());
        let token = optional_address(&intent, "token_address")?;

        let decimals = wallet.decimals_for(token.as_ref()).await?;
        let raw = wallet.get_balance(&address, token.as_ref()).await?;
        let human = units::to_human(raw, decimals);
        let asset = match &token {
            Some(token) => format!("of token {token}"),
            None => "native".to_string(),
        };
        let mut text = format!("Balance for {address}: {} ({asset})", units::display(human));
        let mut details = json!({
            "address": address.to_string(),
            "token": token.map(|t| t.to_string()),
            "balance": human.to_string(),
            "raw_balance": raw.to_string(),
            "decimals": decimals,
        });

        if address == wallet.address() && token.is_none() {
            match wallet.fetch_price().await.and_then(|q| Portfolio::compose(human, q.usd)) {
                Ok(value) => {
                    text.push_str(&format!(", about ${} USD", units::display(value.total_usd)));
                    details["usd"] = json!(value.total_usd.to_string());
                    details["price_usd"] = json!(value.price_usd.to_string());
                }
                Err(err) => warn!("price unavailable for balance report: {err}"),
            }
        }

        Ok(ActionReply::success(text, details))
    }
}

#[async_trait]
impl Action for BalanceAction {
    fn name(&self) -> &str {
        NAME
    }

    fn similes(&self) -> &[&str] {
        &["CHECK_BALANCE", "WALLET_BALANCE", "SHOW_BALANCE"]
    }

    fn description(&self) -> &str {
        "Check the balance of the agent's wallet or any other address, optionally for a token"
    }

    fn examples(&self) -> Vec<Vec<ActionExample>> {
        vec![
            vec![
                ActionExample::user("What's my balance?"),
                ActionExample::agent("Let me check your wallet balance.", NAME),
            ],
            vec![
                ActionExample::user(
                    "How many tokens does 7EcDhSYGxXyscszYEp35KHN8vvw3svAuLKTzXwCFLtV hold?",
                ),
                ActionExample::agent("Checking that address now.", NAME),
            ],
        ]
    }

    fn validate(&self, message: &Message) -> bool {
        has_text(message) && self.runtime.config().is_ok()
    }

    async fn handle(&self, message: &Message, state: &State, callback: ActionCallback) -> bool {
        let outcome = self.run(message, state).await;
        finish(NAME, "Error checking balance", outcome, callback)
    }
}
