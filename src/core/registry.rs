//! Unlocked-account registry
//!
//! Ordered list of unlocked addresses (insertion order is selection order)
//! plus the derivation metadata recorded for each of them. Addresses are
//! stored checksummed; membership checks are case-insensitive.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::KeyringError;
use crate::crypto::hd::normalize_address;

/// Derivation metadata recorded for an unlocked account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEntry {
    /// Whether the path follows the BIP44 account layout.
    #[serde(default)]
    pub bip44: bool,
    /// Full derivation path the account was unlocked at.
    pub hd_path: String,
}

/// Ordered account list plus address -> entry map.
///
/// Invariant: both structures always cover exactly the same address set.
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    accounts: Vec<String>,
    details: HashMap<String, AccountEntry>,
}

impl AccountRegistry {
    /// Record an account. The address must already be checksummed. Appends to
    /// the ordered list only when absent; the entry is recorded either way.
    pub fn insert(&mut self, address: String, entry: AccountEntry) {
        if !self.details.contains_key(&address) {
            self.accounts.push(address.clone());
        }
        self.details.insert(address, entry);
    }

    /// Remove an account by address, matching case-insensitively. Fails with
    /// `AccountNotFound` (carrying the requested address) when absent, in
    /// which case the registry is unchanged.
    pub fn remove(&mut self, address: &str) -> Result<(), KeyringError> {
        let target = normalize_address(address)
            .filter(|checksummed| self.details.contains_key(checksummed))
            .ok_or_else(|| KeyringError::AccountNotFound(address.to_string()))?;

        self.accounts.retain(|account| account != &target);
        self.details.remove(&target);
        debug!("Removed account {} from the keyring", target);
        Ok(())
    }

    /// Entry for an address, matched case-insensitively.
    pub fn entry(&self, address: &str) -> Option<&AccountEntry> {
        normalize_address(address).and_then(|checksummed| self.details.get(&checksummed))
    }

    /// Ordered list of unlocked addresses.
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    /// Snapshot of the detail map with deterministic key order.
    pub fn details_map(&self) -> BTreeMap<String, AccountEntry> {
        self.details.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn clear(&mut self) {
        self.accounts.clear();
        self.details.clear();
    }
}
