//! Extended public key handle
//!
//! Wraps the BIP32 extended public key the bridge reports for the configured
//! base path and derives child addresses locally, without any private-key
//! material. Only non-hardened derivation is possible here; hardened child
//! paths always require a device round trip.
//!
//! Child derivation follows BIP32: `I = HMAC-SHA512(chain_code,
//! ser_P(parent) || ser32(index))`, child key = `point(I_L) + parent`.

use ethers::types::Address;
use ethers::utils::to_checksum;
use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::{Field, PrimeField};
use k256::{FieldBytes, ProjectivePoint, PublicKey, Scalar};
use sha2::Sha512;
use sha3::{Digest, Keccak256};

use crate::core::errors::KeyringError;

type HmacSha512 = Hmac<Sha512>;

const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Cached extended public key for the configured base path.
///
/// Empty until the bridge answers an unlock for the base path; cleared again
/// whenever the base path changes or the device is forgotten.
#[derive(Debug, Clone)]
pub struct ExtendedKey {
    public_key: Option<PublicKey>,
    chain_code: [u8; 32],
}

impl Default for ExtendedKey {
    fn default() -> Self {
        Self { public_key: None, chain_code: [0u8; 32] }
    }
}

impl ExtendedKey {
    /// Build a handle from hex-encoded key material as reported by the
    /// bridge (SEC1 public key, compressed or uncompressed, plus the 32-byte
    /// chain code).
    pub fn from_parts(public_key_hex: &str, chain_code_hex: &str) -> Result<Self, KeyringError> {
        let key_bytes = hex::decode(public_key_hex.trim_start_matches("0x"))
            .map_err(|e| KeyringError::Crypto(format!("invalid public key hex: {}", e)))?;
        let public_key = PublicKey::from_sec1_bytes(&key_bytes)
            .map_err(|e| KeyringError::Crypto(format!("invalid public key: {}", e)))?;

        let code_bytes = hex::decode(chain_code_hex.trim_start_matches("0x"))
            .map_err(|e| KeyringError::Crypto(format!("invalid chain code hex: {}", e)))?;
        if code_bytes.len() != 32 {
            return Err(KeyringError::Crypto(format!(
                "chain code must be 32 bytes, got {}",
                code_bytes.len()
            )));
        }
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&code_bytes);

        Ok(Self { public_key: Some(public_key), chain_code })
    }

    /// True iff non-empty public-key material is cached.
    pub fn is_unlocked(&self) -> bool {
        self.public_key.is_some()
    }

    /// Drop the cached material, forcing a device round trip on next use.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Non-hardened BIP32 child public key.
    pub fn derive_child(&self, index: u32) -> Result<PublicKey, KeyringError> {
        let parent = self
            .public_key
            .as_ref()
            .ok_or_else(|| KeyringError::Locked("no public key cached for the base path".to_string()))?;
        if index >= HARDENED_OFFSET {
            return Err(KeyringError::Crypto(
                "hardened derivation requires the device".to_string(),
            ));
        }

        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|e| KeyringError::Crypto(format!("HMAC initialization failed: {}", e)))?;
        let compressed = parent.to_encoded_point(true);
        mac.update(compressed.as_bytes());
        mac.update(&index.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        let tweak: Option<Scalar> =
            Scalar::from_repr(FieldBytes::clone_from_slice(&digest[..32])).into();
        let tweak = tweak
            .filter(|t| !bool::from(t.is_zero()))
            .ok_or_else(|| KeyringError::Crypto("derived tweak is out of range".to_string()))?;

        let point = ProjectivePoint::from(*parent.as_affine()) + ProjectivePoint::GENERATOR * tweak;
        PublicKey::from_affine(point.to_affine())
            .map_err(|e| KeyringError::Crypto(format!("derived key is invalid: {}", e)))
    }

    /// Checksummed address of child `index` under the base path.
    pub fn address_for_index(&self, index: u32) -> Result<String, KeyringError> {
        let child = self.derive_child(index)?;
        Ok(to_checksum(&address_from_public_key(&child), None))
    }
}

/// Ethereum address of a secp256k1 public key: Keccak-256 of the uncompressed
/// point (without the 0x04 prefix), last 20 bytes.
pub fn address_from_public_key(key: &PublicKey) -> Address {
    let encoded = key.to_encoded_point(false);
    let digest = Keccak256::digest(&encoded.as_bytes()[1..]);
    Address::from_slice(&digest[12..])
}

/// Parse an address in any casing and return its EIP-55 checksummed form.
pub fn normalize_address(address: &str) -> Option<String> {
    address.parse::<Address>().ok().map(|parsed| to_checksum(&parsed, None))
}
