use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::error::{LedgerPilotError, Result};
use crate::interfaces::actions::{Action, ActionCallback, ContextProvider, Message, State};

#[derive(Default)]
pub struct ActionRegistry {
    actions: RwLock<HashMap<String, Arc<dyn Action>>>,
    providers: RwLock<Vec<Arc<dyn ContextProvider>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when an action with the same name is already registered.
    pub async fn register_action(&self, action: Arc<dyn Action>) -> bool {
        let mut actions = self.actions.write().await;
        let name = action.name().to_string();
        if actions.contains_key(&name) {
            return false;
        }
        info!(action = %name, "registered action");
        actions.insert(name, action);
        true
    }

    pub async fn register_provider(&self, provider: Arc<dyn ContextProvider>) -> bool {
        let mut providers = self.providers.write().await;
        if providers.iter().any(|p| p.name() == provider.name()) {
            return false;
        }
        providers.push(provider);
        true
    }

    /// Looks an action up by name, falling back to its similes.
    pub async fn get_action(&self, name: &str) -> Option<Arc<dyn Action>> {
        let wanted = name.trim().to_ascii_uppercase();
        let actions = self.actions.read().await;
        if let Some(action) = actions.get(&wanted) {
            return Some(action.clone());
        }
        actions
            .values()
            .find(|action| action.similes().iter().any(|s| s.eq_ignore_ascii_case(&wanted)))
            .cloned()
    }

    pub async fn list_actions(&self) -> Vec<String> {
        let actions = self.actions.read().await;
        let mut names: Vec<String> = actions.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn providers(&self) -> Vec<Arc<dyn ContextProvider>> {
        self.providers.read().await.clone()
    }

    /// Runs a registered action. Validation failures are reported as `Ok(false)`
    /// without invoking the callback.
    pub async fn dispatch(
        &self,
        name: &str,
        message: &Message,
        state: &State,
        callback: ActionCallback,
    ) -> Result<bool> {
        let action = self
            .get_action(name)
            .await
            .ok_or_else(|| LedgerPilotError::Config(format!("action not found: {name}")))?;
        if !action.validate(message) {
            info!(action = %action.name(), "message rejected by action validator");
            return Ok(false);
        }
        Ok(action.handle(message, state, callback).await)
    }
}
