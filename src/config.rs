use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LedgerPilotError, Result};
use crate::keys::WalletKeypair;

pub const NETWORK_KEY: &str = "LEDGER_NETWORK";
pub const RPC_URL_KEY: &str = "LEDGER_RPC_URL";
pub const PRIVATE_KEY_KEY: &str = "LEDGER_PRIVATE_KEY";
pub const TX_FEE_KEY: &str = "LEDGER_TX_FEE";
pub const DECIMALS_KEY: &str = "LEDGER_DECIMALS";
pub const FAUCET_URL_KEY: &str = "LEDGER_FAUCET_URL";
pub const PRICE_URL_KEY: &str = "LEDGER_PRICE_URL";
pub const PRICE_ASSET_ID_KEY: &str = "LEDGER_PRICE_ASSET_ID";
pub const CACHE_PATH_KEY: &str = "LEDGER_CACHE_PATH";
pub const CACHE_TTL_KEY: &str = "LEDGER_CACHE_TTL_SECONDS";
pub const PORTFOLIO_TTL_KEY: &str = "LEDGER_PORTFOLIO_TTL_SECONDS";
pub const LOCAL_CACHE_TTL_KEY: &str = "LEDGER_LOCAL_CACHE_TTL_SECONDS";
pub const PRICE_RETRY_BASE_MS_KEY: &str = "LEDGER_PRICE_RETRY_BASE_MS";
pub const WAIT_FOR_INCLUSION_KEY: &str = "LEDGER_WAIT_FOR_INCLUSION";
pub const INCLUSION_POLL_MS_KEY: &str = "LEDGER_INCLUSION_POLL_MS";
pub const INCLUSION_MAX_POLLS_KEY: &str = "LEDGER_INCLUSION_MAX_POLLS";
pub const HTTP_TIMEOUT_KEY: &str = "LEDGER_HTTP_TIMEOUT_SECONDS";
pub const MEMO_KEY: &str = "LEDGER_MEMO";
pub const OPENAI_API_KEY_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_MODEL_KEY: &str = "OPENAI_MODEL";
pub const OPENAI_BASE_URL_KEY: &str = "OPENAI_BASE_URL";

const DEFAULT_PRICE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";
const DEFAULT_PRICE_ASSET_ID: &str = "mina-protocol";
const DEFAULT_TX_FEE: u64 = 100_000_000;
const DEFAULT_DECIMALS: u32 = 9;
const MAX_DECIMALS: u32 = 18;
const MAX_MEMO_BYTES: usize = 32;
const MAX_CACHE_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Runtime settings lookup. Implemented for plain maps, JSON objects and the
/// process environment.
pub trait SettingsSource: Send + Sync {
    fn get_setting(&self, key: &str) -> Option<String>;
}

impl SettingsSource for HashMap<String, String> {
    fn get_setting(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl SettingsSource for Value {
    fn get_setting(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSettings;

impl SettingsSource for EnvSettings {
    fn get_setting(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Mainnet,
    Devnet,
    Lightnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Devnet => "devnet",
            Self::Lightnet => "lightnet",
        }
    }

    fn parse(value: Option<&str>) -> Result<Self> {
        let normalized = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("devnet")
            .to_ascii_lowercase();
        match normalized.as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "devnet" | "testnet" => Ok(Self::Devnet),
            "lightnet" | "local" => Ok(Self::Lightnet),
            _ => Err(LedgerPilotError::Config(format!(
                "{NETWORK_KEY} must be one of mainnet, devnet, lightnet"
            ))),
        }
    }

    pub fn policy(&self) -> NetworkPolicy {
        match self {
            Self::Mainnet => NetworkPolicy {
                default_rpc_url: None,
                default_faucet_url: None,
                faucet_enabled: false,
            },
            Self::Devnet => NetworkPolicy {
                default_rpc_url: None,
                default_faucet_url: Some("https://faucet.minaprotocol.com/api/v1/faucet"),
                faucet_enabled: true,
            },
            Self::Lightnet => NetworkPolicy {
                default_rpc_url: Some("http://127.0.0.1:8080/rpc"),
                default_faucet_url: Some("http://127.0.0.1:8181/faucet"),
                faucet_enabled: true,
            },
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkPolicy {
    pub default_rpc_url: Option<&'static str>,
    pub default_faucet_url: Option<&'static str>,
    pub faucet_enabled: bool,
}

/// Private key material held only until the keypair is derived.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(<redacted>)")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.0);
    }
}

/// Everything a chain call needs, passed explicitly instead of living in
/// process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    pub network: Network,
    pub rpc_url: String,
    pub faucet_url: Option<String>,
    pub tx_fee: u64,
    pub decimals: u32,
    pub memo: String,
    pub http_timeout: Duration,
    pub wait_for_inclusion: bool,
    pub inclusion_poll_interval: Duration,
    pub inclusion_max_polls: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSettings {
    pub url: String,
    pub asset_id: String,
    pub retry_base_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub sqlite_path: String,
    pub ttl: Duration,
    pub local_ttl: Duration,
    pub portfolio_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: Option<SecretString>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub network: NetworkContext,
    pub private_key: SecretString,
    pub price: PriceSettings,
    pub cache: CacheSettings,
    pub openai: OpenAiSettings,
}

impl WalletConfig {
    pub fn from_settings(settings: &dyn SettingsSource) -> Result<Self> {
        let network = Network::parse(read(settings, NETWORK_KEY).as_deref())?;
        let policy = network.policy();

        let rpc_url = read(settings, RPC_URL_KEY)
            .or_else(|| policy.default_rpc_url.map(str::to_string))
            .ok_or_else(|| {
                LedgerPilotError::Config(format!(
                    "{RPC_URL_KEY} must be configured for {network}"
                ))
            })?;
        validate_http_url(RPC_URL_KEY, &rpc_url)?;

        let faucet_url = if policy.faucet_enabled {
            let url = read(settings, FAUCET_URL_KEY)
                .or_else(|| policy.default_faucet_url.map(str::to_string));
            if let Some(url) = &url {
                validate_http_url(FAUCET_URL_KEY, url)?;
            }
            url
        } else {
            None
        };

        let private_key = read(settings, PRIVATE_KEY_KEY)
            .map(SecretString)
            .ok_or_else(|| {
                LedgerPilotError::Config(format!("{PRIVATE_KEY_KEY} must be configured"))
            })?;

        let tx_fee = read_u64(settings, TX_FEE_KEY)?.unwrap_or(DEFAULT_TX_FEE);
        let decimals = match read_u64(settings, DECIMALS_KEY)? {
            Some(value) if value > MAX_DECIMALS as u64 => {
                return Err(LedgerPilotError::Config(format!(
                    "{DECIMALS_KEY} must be less than or equal to {MAX_DECIMALS}"
                )));
            }
            Some(value) => value as u32,
            None => DEFAULT_DECIMALS,
        };

        let memo = read(settings, MEMO_KEY).unwrap_or_default();
        if memo.len() > MAX_MEMO_BYTES {
            return Err(LedgerPilotError::Config(format!(
                "{MEMO_KEY} must be at most {MAX_MEMO_BYTES} bytes"
            )));
        }

        let http_timeout = Duration::from_secs(
            read_u64(settings, HTTP_TIMEOUT_KEY)?
                .unwrap_or(30)
                .clamp(1, 300),
        );
        let wait_for_inclusion = read_bool(settings, WAIT_FOR_INCLUSION_KEY)?.unwrap_or(true);
        let inclusion_poll_interval = Duration::from_millis(
            read_u64(settings, INCLUSION_POLL_MS_KEY)?.unwrap_or(2_000),
        );
        let inclusion_max_polls = read_u64(settings, INCLUSION_MAX_POLLS_KEY)?
            .unwrap_or(90)
            .clamp(1, 10_000) as u32;

        let price_url = read(settings, PRICE_URL_KEY).unwrap_or_else(|| DEFAULT_PRICE_URL.to_string());
        validate_http_url(PRICE_URL_KEY, &price_url)?;
        let price = PriceSettings {
            url: price_url,
            asset_id: read(settings, PRICE_ASSET_ID_KEY)
                .unwrap_or_else(|| DEFAULT_PRICE_ASSET_ID.to_string()),
            retry_base_delay: Duration::from_millis(
                read_u64(settings, PRICE_RETRY_BASE_MS_KEY)?.unwrap_or(2_000),
            ),
        };

        let ttl = Duration::from_secs(ttl_seconds(settings, CACHE_TTL_KEY)?);
        let cache = CacheSettings {
            sqlite_path: read(settings, CACHE_PATH_KEY)
                .unwrap_or_else(|| "./data/ledger_pilot_cache.db".to_string()),
            ttl,
            local_ttl: Duration::from_secs(ttl_seconds(settings, LOCAL_CACHE_TTL_KEY)?),
            portfolio_ttl: Duration::from_secs(ttl_seconds(settings, PORTFOLIO_TTL_KEY)?),
        };

        let openai = OpenAiSettings {
            api_key: read(settings, OPENAI_API_KEY_KEY).map(SecretString),
            model: read(settings, OPENAI_MODEL_KEY),
            base_url: read(settings, OPENAI_BASE_URL_KEY),
        };

        Ok(Self {
            network: NetworkContext {
                network,
                rpc_url,
                faucet_url,
                tx_fee,
                decimals,
                memo,
                http_timeout,
                wait_for_inclusion,
                inclusion_poll_interval,
                inclusion_max_polls,
            },
            private_key,
            price,
            cache,
            openai,
        })
    }

    pub fn keypair(&self) -> Result<WalletKeypair> {
        WalletKeypair::from_base58_seed(self.private_key.expose())
    }
}

fn read(settings: &dyn SettingsSource, key: &str) -> Option<String> {
    settings
        .get_setting(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_u64(settings: &dyn SettingsSource, key: &str) -> Result<Option<u64>> {
    read(settings, key)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| LedgerPilotError::Config(format!("{key} must be an integer")))
        })
        .transpose()
}

fn read_bool(settings: &dyn SettingsSource, key: &str) -> Result<Option<bool>> {
    read(settings, key)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(LedgerPilotError::Config(format!("{key} must be a boolean"))),
        })
        .transpose()
}

fn ttl_seconds(settings: &dyn SettingsSource, key: &str) -> Result<u64> {
    match read_u64(settings, key)? {
        Some(0) => Err(LedgerPilotError::Config(format!(
            "{key} must be greater than zero"
        ))),
        Some(value) if value > MAX_CACHE_TTL_SECONDS => Err(LedgerPilotError::Config(format!(
            "{key} must be at most {MAX_CACHE_TTL_SECONDS}"
        ))),
        Some(value) => Ok(value),
        None => Ok(300),
    }
}

fn validate_http_url(key: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(LedgerPilotError::Config(format!(
            "{key} must be an http(s) URL"
        )))
    }
}
