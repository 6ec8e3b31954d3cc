//! Bridge message contract
//!
//! Typed request/response pairs exchanged with the bridge channel. Each
//! request kind has exactly one expected response shape; the session rejects
//! anything else on receipt instead of trusting ambient structure.

use ethers::types::{Signature, U256};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::errors::KeyringError;

/// Operations the keyring may ask the bridge to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "params", rename_all = "kebab-case")]
pub enum BridgeRequest {
    /// Fetch the public key and address at a derivation path.
    #[serde(rename_all = "camelCase")]
    Unlock { hd_path: String },
    /// Sign an RLP-encoded transaction (hex) at a derivation path.
    #[serde(rename_all = "camelCase")]
    SignTransaction { hd_path: String, tx: String },
    /// Sign a personal message (hex-encoded bytes) at a derivation path.
    #[serde(rename_all = "camelCase")]
    SignPersonalMessage { hd_path: String, message: String },
}

impl BridgeRequest {
    /// Wire name of the requested action, for logging.
    pub fn action(&self) -> &'static str {
        match self {
            BridgeRequest::Unlock { .. } => "unlock",
            BridgeRequest::SignTransaction { .. } => "sign-transaction",
            BridgeRequest::SignPersonalMessage { .. } => "sign-personal-message",
        }
    }
}

/// Responses the bridge may deliver, one shape per request kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "kebab-case")]
pub enum BridgeResponse {
    Unlocked(UnlockPayload),
    TransactionSigned(SignaturePayload),
    MessageSigned(SignaturePayload),
}

/// Key material reported for an unlocked derivation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockPayload {
    /// SEC1 public key, hex encoded.
    pub public_key: String,
    /// 32-byte chain code, hex encoded.
    pub chain_code: String,
    /// Address of the unlocked account.
    pub address: String,
}

/// Raw ECDSA signature as reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePayload {
    pub v: u8,
    /// 32-byte r component, hex encoded.
    pub r: String,
    /// 32-byte s component, hex encoded.
    pub s: String,
}

impl SignaturePayload {
    /// Convert into an `ethers` signature, shifting a raw 0/1 recovery id to
    /// the 27/28 convention.
    pub fn to_signature(&self) -> Result<Signature, KeyringError> {
        let r = decode_word(&self.r, "r")?;
        let s = decode_word(&self.s, "s")?;
        let v = if self.v < 27 { u64::from(self.v) + 27 } else { u64::from(self.v) };
        Ok(Signature {
            r: U256::from_big_endian(&r),
            s: U256::from_big_endian(&s),
            v,
        })
    }
}

fn decode_word(value: &str, field: &str) -> Result<[u8; 32], KeyringError> {
    let bytes = hex::decode(value.trim_start_matches("0x"))
        .map_err(|e| KeyringError::Crypto(format!("invalid signature {}: {}", field, e)))?;
    if bytes.len() != 32 {
        return Err(KeyringError::Crypto(format!(
            "signature {} must be 32 bytes, got {}",
            field,
            bytes.len()
        )));
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&bytes);
    Ok(word)
}

/// A request paired with its correlation id. The id lets transports that
/// multiplex a shared message channel match exactly one reply to this
/// request and drop the listener afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeEnvelope {
    pub id: Uuid,
    #[serde(flatten)]
    pub request: BridgeRequest,
}

impl BridgeEnvelope {
    pub fn new(request: BridgeRequest) -> Self {
        Self { id: Uuid::new_v4(), request }
    }
}
