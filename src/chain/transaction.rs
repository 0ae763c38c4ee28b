use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{LedgerPilotError, Result};
use crate::keys::{Address, TokenId, WalletKeypair};

const MAX_MEMO_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Transfer {
        to: Address,
        amount: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<TokenId>,
    },
    DeployToken {
        token: TokenId,
        admin: Address,
        symbol: String,
        decimals: u32,
    },
    Mint {
        token: TokenId,
        to: Address,
        amount: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub network: String,
    pub sender: Address,
    pub fee: u64,
    pub memo: String,
    pub nonce: u64,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    pub public_key: Address,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<SignatureEntry>,
}

#[derive(Debug, Default)]
pub struct TransactionBuilder {
    network: Option<String>,
    sender: Option<Address>,
    fee: u64,
    memo: String,
    nonce: Option<u64>,
    operations: Vec<Operation>,
}

impl TransactionBuilder {
    pub fn new(network: &str) -> Self {
        Self {
            network: Some(network.to_string()),
            ..Self::default()
        }
    }

    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    pub fn memo(mut self, memo: &str) -> Self {
        self.memo = memo.to_string();
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn build(self) -> Result<Transaction> {
        let network = self
            .network
            .ok_or_else(|| LedgerPilotError::ChainRejected("transaction network missing".to_string()))?;
        let sender = self
            .sender
            .ok_or_else(|| LedgerPilotError::ChainRejected("transaction sender missing".to_string()))?;
        let nonce = self
            .nonce
            .ok_or_else(|| LedgerPilotError::ChainRejected("transaction nonce missing".to_string()))?;
        if self.operations.is_empty() {
            return Err(LedgerPilotError::ChainRejected(
                "transaction has no operations".to_string(),
            ));
        }
        if self.memo.len() > MAX_MEMO_BYTES {
            return Err(LedgerPilotError::ChainRejected(format!(
                "memo exceeds {MAX_MEMO_BYTES} bytes"
            )));
        }
        Ok(Transaction {
            network,
            sender,
            fee: self.fee,
            memo: self.memo,
            nonce,
            operations: self.operations,
        })
    }
}

impl Transaction {
    /// SHA-256 over the canonical JSON encoding; this is what every signer signs.
    pub fn signing_digest(&self) -> Result<[u8; 32]> {
        let payload = serde_json::to_vec(self)
            .map_err(|e| LedgerPilotError::Serialization(format!("failed to encode tx: {e}")))?;
        Ok(Sha256::digest(&payload).into())
    }

    /// The sender must be among `signers`; additional signers authorize
    /// operations on accounts other than the sender (token and admin keys).
    pub fn sign(self, signers: &[&WalletKeypair]) -> Result<SignedTransaction> {
        if !signers.iter().any(|key| key.address() == self.sender) {
            return Err(LedgerPilotError::ChainRejected(
                "sender key missing from signers".to_string(),
            ));
        }
        let digest = self.signing_digest()?;
        let signatures = signers
            .iter()
            .map(|key| SignatureEntry {
                public_key: key.address(),
                signature: key.sign_base58(&digest),
            })
            .collect();
        Ok(SignedTransaction {
            transaction: self,
            signatures,
        })
    }
}

impl SignedTransaction {
    pub fn hash(&self) -> Result<String> {
        let payload = serde_json::to_vec(self)
            .map_err(|e| LedgerPilotError::Serialization(format!("failed to encode tx: {e}")))?;
        Ok(bs58::encode(Sha256::digest(&payload)).into_string())
    }

    pub fn to_base64(&self) -> Result<String> {
        let payload = serde_json::to_vec(self)
            .map_err(|e| LedgerPilotError::Serialization(format!("failed to encode tx: {e}")))?;
        Ok(STANDARD.encode(payload))
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| LedgerPilotError::Serialization(format!("invalid tx base64: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| LedgerPilotError::Serialization(format!("invalid tx payload: {e}")))
    }

    pub fn verify(&self) -> Result<()> {
        let digest = self.transaction.signing_digest()?;
        for entry in &self.signatures {
            entry.public_key.verify(&digest, &entry.signature)?;
        }
        Ok(())
    }
}
