#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use ledger_pilot::cache::{Cache, MemoryCache};
use ledger_pilot::chain::{
    AccountState, ChainClient, ChainConnector, Operation, SignedTransaction, TokenInfo,
};
use ledger_pilot::config::{NetworkContext, SettingsSource};
use ledger_pilot::error::{LedgerPilotError, Result};
use ledger_pilot::extraction::IntentExtractor;
use ledger_pilot::interfaces::actions::{ActionCallback, ActionReply};
use ledger_pilot::keys::{Address, TokenId, WalletKeypair};
use ledger_pilot::runtime::WalletRuntime;

pub const OWN_SEED: u8 = 1;

pub fn seed(byte: u8) -> String {
    bs58::encode([byte; 32]).into_string()
}

pub fn address(byte: u8) -> Address {
    WalletKeypair::from_seed(&[byte; 32]).address()
}

pub fn own_address() -> Address {
    address(OWN_SEED)
}

/// Lightnet settings with an unreachable price endpoint and fast retries.
pub fn settings(overrides: Value) -> Value {
    let mut base = json!({
        "LEDGER_NETWORK": "lightnet",
        "LEDGER_PRIVATE_KEY": seed(OWN_SEED),
        "LEDGER_WAIT_FOR_INCLUSION": "false",
        "LEDGER_PRICE_URL": "http://127.0.0.1:9/price",
        "LEDGER_PRICE_RETRY_BASE_MS": "1",
        "LEDGER_TX_FEE": "1000",
    });
    if let (Some(base), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    base
}

#[derive(Default)]
pub struct FakeChain {
    pub accounts: Mutex<HashMap<Address, AccountState>>,
    pub rejected: Mutex<HashSet<Address>>,
    pub submitted: Mutex<Vec<SignedTransaction>>,
    pub account_reads: Mutex<Vec<Address>>,
    pub token_reads: Mutex<Vec<Option<TokenId>>>,
    pub tokens: Mutex<HashMap<TokenId, TokenInfo>>,
    pub token_balances: Mutex<HashMap<(Address, TokenId), u64>>,
    pub inclusion_waits: AtomicUsize,
}

impl FakeChain {
    pub fn with_account(self, address: Address, balance: u64, nonce: u64) -> Self {
        self.accounts
            .lock()
            .unwrap()
            .insert(address, AccountState { balance, nonce });
        self
    }

    pub fn with_token(self, token: TokenId, symbol: &str, decimals: u32) -> Self {
        self.tokens.lock().unwrap().insert(
            token,
            TokenInfo {
                symbol: symbol.to_string(),
                decimals,
            },
        );
        self
    }

    pub fn with_token_balance(self, owner: Address, token: TokenId, balance: u64) -> Self {
        self.token_balances
            .lock()
            .unwrap()
            .insert((owner, token), balance);
        self
    }

    pub fn token_balance(&self, owner: Address, token: TokenId) -> u64 {
        self.token_balances
            .lock()
            .unwrap()
            .get(&(owner, token))
            .copied()
            .unwrap_or(0)
    }

    pub fn rejecting(self, recipient: Address) -> Self {
        self.rejected.lock().unwrap().insert(recipient);
        self
    }

    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn reads(&self) -> Vec<Address> {
        self.account_reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn fetch_account(
        &self,
        address: &Address,
        token: Option<&TokenId>,
    ) -> Result<Option<AccountState>> {
        self.account_reads.lock().unwrap().push(*address);
        self.token_reads.lock().unwrap().push(token.copied());
        match token {
            Some(token) => Ok(self
                .token_balances
                .lock()
                .unwrap()
                .get(&(*address, *token))
                .map(|balance| AccountState {
                    balance: *balance,
                    nonce: 0,
                })),
            None => Ok(self.accounts.lock().unwrap().get(address).copied()),
        }
    }

    async fn fetch_token(&self, token: &TokenId) -> Result<Option<TokenInfo>> {
        Ok(self.tokens.lock().unwrap().get(token).cloned())
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<String> {
        tx.verify()?;
        let rejected = self.rejected.lock().unwrap().clone();
        for operation in &tx.transaction.operations {
            if let Operation::Transfer { to, .. } = operation {
                if rejected.contains(to) {
                    return Err(LedgerPilotError::ChainRejected(format!(
                        "transfer to {to} rejected"
                    )));
                }
            }
        }
        let sender = tx.transaction.sender;
        for operation in &tx.transaction.operations {
            match operation {
                Operation::DeployToken {
                    token,
                    symbol,
                    decimals,
                    ..
                } => {
                    self.tokens.lock().unwrap().insert(
                        *token,
                        TokenInfo {
                            symbol: symbol.clone(),
                            decimals: *decimals,
                        },
                    );
                }
                Operation::Mint { token, to, amount } => {
                    *self
                        .token_balances
                        .lock()
                        .unwrap()
                        .entry((*to, *token))
                        .or_default() += amount;
                }
                Operation::Transfer {
                    to,
                    amount,
                    token: Some(token),
                } => {
                    let mut balances = self.token_balances.lock().unwrap();
                    let held = balances.entry((sender, *token)).or_default();
                    if *held < *amount {
                        return Err(LedgerPilotError::ChainRejected(format!(
                            "insufficient {token} balance"
                        )));
                    }
                    *held -= amount;
                    *balances.entry((*to, *token)).or_default() += amount;
                }
                Operation::Transfer { token: None, .. } => {}
            }
        }
        self.submitted.lock().unwrap().push(tx.clone());
        tx.hash()
    }

    async fn wait_for_inclusion(&self, _hash: &str) -> Result<()> {
        self.inclusion_waits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeConnector {
    pub chain: Arc<FakeChain>,
    pub networks: Mutex<Vec<NetworkContext>>,
}

impl ChainConnector for FakeConnector {
    fn connect(&self, network: &NetworkContext) -> Result<Arc<dyn ChainClient>> {
        self.networks.lock().unwrap().push(network.clone());
        Ok(self.chain.clone())
    }
}

#[derive(Default)]
pub struct ScriptedExtractor {
    replies: Mutex<VecDeque<Value>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn new(replies: Vec<Value>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: Value) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl IntentExtractor for ScriptedExtractor {
    async fn extract(&self, prompt: &str, _schema: &Value) -> Result<Value> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies.lock().unwrap().pop_front().ok_or_else(|| {
            LedgerPilotError::ExtractionInvalid("no scripted reply left".to_string())
        })
    }
}

pub struct Harness {
    pub runtime: Arc<WalletRuntime>,
    pub chain: Arc<FakeChain>,
    pub extractor: Arc<ScriptedExtractor>,
    pub cache: Arc<MemoryCache>,
}

pub fn harness(settings: Value, chain: FakeChain, replies: Vec<Value>) -> Harness {
    let chain = Arc::new(chain);
    let extractor = Arc::new(ScriptedExtractor::new(replies));
    let cache = Arc::new(MemoryCache::default());
    let settings: Arc<dyn SettingsSource> = Arc::new(settings);
    let connector = Arc::new(FakeConnector {
        chain: chain.clone(),
        networks: Mutex::new(Vec::new()),
    });
    let shared_cache: Arc<dyn Cache> = cache.clone();
    let runtime = WalletRuntime::new(settings, extractor.clone(), connector, shared_cache);
    Harness {
        runtime: Arc::new(runtime),
        chain,
        extractor,
        cache,
    }
}

/// Callback that records every reply it receives.
pub fn capture() -> (ActionCallback, Arc<Mutex<Vec<ActionReply>>>) {
    let replies = Arc::new(Mutex::new(Vec::new()));
    let sink = replies.clone();
    let callback: ActionCallback = Box::new(move |reply| sink.lock().unwrap().push(reply));
    (callback, replies)
}

pub fn single_reply(replies: &Arc<Mutex<Vec<ActionReply>>>) -> ActionReply {
    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 1, "callback must fire exactly once");
    replies[0].clone()
}
