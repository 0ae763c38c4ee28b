use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::SysRng;
use rand::TryRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{LedgerPilotError, Result};

/// Account address: a base58-encoded ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 32]);

impl Address {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn verify(&self, message: &[u8], signature_base58: &str) -> Result<()> {
        let key = VerifyingKey::from_bytes(&self.0)
            .map_err(|e| LedgerPilotError::ChainRejected(format!("invalid public key: {e}")))?;
        let raw = bs58::decode(signature_base58).into_vec().map_err(|_| {
            LedgerPilotError::ChainRejected("invalid base58 signature".to_string())
        })?;
        let raw: [u8; 64] = raw.try_into().map_err(|_| {
            LedgerPilotError::ChainRejected("signature must be 64 bytes".to_string())
        })?;
        key.verify(message, &Signature::from_bytes(&raw))
            .map_err(|e| LedgerPilotError::ChainRejected(format!("signature mismatch: {e}")))
    }
}

impl FromStr for Address {
    type Err = LedgerPilotError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LedgerPilotError::ExtractionInvalid(
                "address must not be empty".to_string(),
            ));
        }
        let bytes = bs58::decode(trimmed).into_vec().map_err(|_| {
            LedgerPilotError::ExtractionInvalid(format!("invalid base58 address: {trimmed}"))
        })?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            LedgerPilotError::ExtractionInvalid(format!(
                "address must decode to 32 bytes: {trimmed}"
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = LedgerPilotError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Token ledgers are identified by the address of their token account.
pub type TokenId = Address;

/// Signing key plus its derived address. The secret half never leaves this type.
pub struct WalletKeypair {
    signing: SigningKey,
    address: Address,
}

impl WalletKeypair {
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(seed);
        let address = Address(signing.verifying_key().to_bytes());
        Self { signing, address }
    }

    pub fn from_base58_seed(secret: &str) -> Result<Self> {
        let mut bytes = bs58::decode(secret.trim()).into_vec().map_err(|_| {
            LedgerPilotError::Config("private key is not valid base58".to_string())
        })?;
        if bytes.len() != 32 {
            bytes.zeroize();
            return Err(LedgerPilotError::Config(
                "private key must decode to a 32 byte seed".to_string(),
            ));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes);
        bytes.zeroize();
        let keypair = Self::from_seed(&seed);
        seed.zeroize();
        Ok(keypair)
    }

    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; 32];
        let mut rng = SysRng;
        rng.try_fill_bytes(&mut seed)
            .map_err(|e| LedgerPilotError::Config(format!("key generation failed: {e}")))?;
        let keypair = Self::from_seed(&seed);
        seed.zeroize();
        Ok(keypair)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn sign_base58(&self, message: &[u8]) -> String {
        let signature = self.signing.sign(message);
        bs58::encode(signature.to_bytes()).into_string()
    }
}

impl fmt::Debug for WalletKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletKeypair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
