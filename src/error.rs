use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerPilotError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid extracted intent: {0}")]
    ExtractionInvalid(String),
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),
    #[error("account not found: {0}")]
    AccountNotFound(String),
    #[error("chain rejected: {0}")]
    ChainRejected(String),
}

/// Closed classification surfaced to callers alongside the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ExtractionInvalid,
    NetworkUnavailable,
    AccountNotFound,
    ChainRejected,
    Configuration,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractionInvalid => "extraction_invalid",
            Self::NetworkUnavailable => "network_unavailable",
            Self::AccountNotFound => "account_not_found",
            Self::ChainRejected => "chain_rejected",
            Self::Configuration => "configuration",
            Self::Storage => "storage",
        }
    }
}

impl LedgerPilotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Http(_) | Self::NetworkUnavailable(_) => ErrorKind::NetworkUnavailable,
            Self::ExtractionInvalid(_) => ErrorKind::ExtractionInvalid,
            Self::Serialization(_) | Self::Storage(_) => ErrorKind::Storage,
            Self::AccountNotFound(_) => ErrorKind::AccountNotFound,
            Self::ChainRejected(_) => ErrorKind::ChainRejected,
        }
    }

    /// Message without the variant prefix, as shown to end users.
    pub fn detail(&self) -> &str {
        match self {
            Self::Config(message)
            | Self::Http(message)
            | Self::Serialization(message)
            | Self::Storage(message)
            | Self::ExtractionInvalid(message)
            | Self::NetworkUnavailable(message)
            | Self::AccountNotFound(message)
            | Self::ChainRejected(message) => message,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerPilotError>;
