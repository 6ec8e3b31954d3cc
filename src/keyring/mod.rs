//! Ledger bridge keyring
//!
//! The keyring tracks which device accounts have been unlocked, maps them to
//! HD derivation paths, pages through the device account space for selection
//! UIs, and forwards signing requests to the bridge. Private keys never leave
//! the device; the only key material held here is the extended *public* key
//! reported for the configured base path.
//!
//! All mutating operations expect to be invoked sequentially by the owning
//! application; the keyring provides no internal locking.

pub mod snapshot;

use std::sync::Arc;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::Signature;
use tracing::{debug, info, warn};

use crate::bridge::{BridgeSession, BridgeTransport};
use crate::core::config::{KeyringConfig, DEFAULT_HD_PATH};
use crate::core::errors::KeyringError;
use crate::core::pager::{AccountPager, PageAccount, PageDirection};
use crate::core::paths;
use crate::core::registry::{AccountEntry, AccountRegistry};
use crate::crypto::hd::{normalize_address, ExtendedKey};
use crate::keyring::snapshot::{migrate_to_current, KeyringSnapshot};

/// Hardware-wallet keyring backed by an asynchronous bridge channel.
pub struct LedgerBridgeKeyring {
    config: KeyringConfig,
    hdk: ExtendedKey,
    registry: AccountRegistry,
    pager: AccountPager,
    unlocked_account: u32,
    session: BridgeSession,
}

impl LedgerBridgeKeyring {
    /// Type-name constant identifying this keyring kind. Host applications
    /// use it to route serialized blobs to the right implementation.
    pub const TYPE: &'static str = "Ledger Hardware";

    pub fn new(transport: Arc<dyn BridgeTransport>) -> Self {
        Self::with_config(KeyringConfig::default(), transport)
    }

    pub fn with_config(config: KeyringConfig, transport: Arc<dyn BridgeTransport>) -> Self {
        Self {
            config,
            hdk: ExtendedKey::default(),
            registry: AccountRegistry::default(),
            pager: AccountPager::default(),
            unlocked_account: 0,
            session: BridgeSession::new(transport),
        }
    }

    pub fn keyring_type(&self) -> &'static str {
        Self::TYPE
    }

    pub fn hd_path(&self) -> &str {
        &self.config.hd_path
    }

    /// Device account index slated for the next unlock.
    pub fn unlocked_account(&self) -> u32 {
        self.unlocked_account
    }

    /// Current pager page (0 until a page has been requested).
    pub fn current_page(&self) -> usize {
        self.pager.page()
    }

    /// True iff the extended public key for the base path is cached.
    pub fn is_unlocked(&self) -> bool {
        self.hdk.is_unlocked()
    }

    /// Change the base derivation path. Dropping the cached public key is
    /// part of the same transition, so a stale key can never serve reads for
    /// the new path.
    pub fn set_hd_path(&mut self, hd_path: &str) -> Result<(), KeyringError> {
        paths::validate_hd_path(hd_path)?;
        if self.config.hd_path != hd_path {
            debug!("HD path changed from {} to {}", self.config.hd_path, hd_path);
            self.hdk.reset();
        }
        self.config.hd_path = hd_path.to_string();
        Ok(())
    }

    /// Ensure the extended public key for the base path is cached, fetching
    /// it from the bridge if necessary (one round trip).
    pub async fn unlock(&mut self) -> Result<(), KeyringError> {
        if self.hdk.is_unlocked() {
            return Ok(());
        }
        info!("Requesting public key for {} from the bridge", self.config.hd_path);
        let payload = self.session.unlock(&self.config.hd_path).await?;
        self.hdk = ExtendedKey::from_parts(&payload.public_key, &payload.chain_code)?;
        Ok(())
    }

    /// Point the next `add_accounts` call at a specific device account.
    pub fn set_account_to_unlock(&mut self, index: u32) {
        self.unlocked_account = index;
    }

    /// Unlock `count` device accounts starting at the cursor and record them.
    ///
    /// BIP44 paths are hardened and must be unlocked on the device, one
    /// round trip per account; legacy flat paths derive locally from the
    /// cached public key. Already-present addresses are not duplicated, but
    /// the cursor advances either way. Returns the full ordered account
    /// list.
    pub async fn add_accounts(&mut self, count: usize) -> Result<Vec<String>, KeyringError> {
        self.unlock().await?;

        let from = self.unlocked_account;
        let to = from + count as u32;
        for index in from..to {
            let (hd_path, bip44) = paths::path_for_index(&self.config.hd_path, index);
            let address = if bip44 {
                let payload = self.session.unlock(&hd_path).await?;
                normalize_address(&payload.address).ok_or_else(|| {
                    KeyringError::Crypto(format!(
                        "bridge returned an invalid address: {}",
                        payload.address
                    ))
                })?
            } else {
                self.hdk.address_for_index(index)?
            };

            debug!("Unlocked device account {} at {}", index, hd_path);
            self.registry.insert(address, AccountEntry { bip44, hd_path });
            self.unlocked_account = index + 1;
        }

        Ok(self.registry.accounts().to_vec())
    }

    /// Ordered list of unlocked account addresses.
    pub fn get_accounts(&self) -> Vec<String> {
        self.registry.accounts().to_vec()
    }

    /// Remove an account, matching case-insensitively.
    pub fn remove_account(&mut self, address: &str) -> Result<(), KeyringError> {
        self.registry.remove(address)
    }

    /// Confirm that `address` belongs to the connected device by unlocking
    /// device account index 0 and comparing. Returns the index-0 derivation
    /// path on a match. Only index 0 is ever probed.
    pub async fn unlock_account_by_address(
        &mut self,
        address: &str,
    ) -> Result<String, KeyringError> {
        let (hd_path, _) = paths::path_for_index(&self.config.hd_path, 0);
        let payload = self.session.unlock(&hd_path).await?;

        if !payload.address.eq_ignore_ascii_case(address) {
            warn!(
                "Requested account {} but the connected device reports {}",
                address, payload.address
            );
            return Err(KeyringError::AccountMismatch {
                requested: address.to_string(),
                connected: payload.address,
            });
        }
        Ok(hd_path)
    }

    pub async fn get_first_page(&mut self) -> Result<Vec<PageAccount>, KeyringError> {
        self.page(PageDirection::First).await
    }

    pub async fn get_next_page(&mut self) -> Result<Vec<PageAccount>, KeyringError> {
        self.page(PageDirection::Next).await
    }

    pub async fn get_previous_page(&mut self) -> Result<Vec<PageAccount>, KeyringError> {
        self.page(PageDirection::Previous).await
    }

    /// Candidate accounts for the requested page, derived locally from the
    /// cached public key. Never mutates the registry.
    async fn page(&mut self, direction: PageDirection) -> Result<Vec<PageAccount>, KeyringError> {
        self.unlock().await?;
        let page = self.pager.advance(direction);
        debug!("Deriving device accounts for page {}", page);

        let mut entries = Vec::with_capacity(self.pager.per_page());
        for index in self.pager.window() {
            let address = self.hdk.address_for_index(index)?;
            entries.push(PageAccount { address, balance: None, index });
        }
        Ok(entries)
    }

    /// Forward a transaction to the device for signing.
    pub async fn sign_transaction(
        &self,
        address: &str,
        tx: &TypedTransaction,
    ) -> Result<Signature, KeyringError> {
        let hd_path = self.path_for_account(address)?;
        info!("Requesting transaction signature for {}", address);
        let rlp_hex = hex::encode(tx.rlp());
        let payload = self.session.sign_transaction(&hd_path, &rlp_hex).await?;
        payload.to_signature()
    }

    /// Forward a personal message (EIP-191) to the device for signing.
    pub async fn sign_personal_message(
        &self,
        address: &str,
        message: &[u8],
    ) -> Result<Signature, KeyringError> {
        let hd_path = self.path_for_account(address)?;
        info!("Requesting personal-message signature for {}", address);
        let payload = self
            .session
            .sign_personal_message(&hd_path, &hex::encode(message))
            .await?;
        payload.to_signature()
    }

    /// Typed-data signing is unconditionally rejected: this device class
    /// cannot perform it, so the bridge is never contacted.
    pub fn sign_typed_data(&self) -> Result<Signature, KeyringError> {
        Err(KeyringError::NotSupported)
    }

    /// Private keys cannot leave the device.
    pub fn export_account(&self) -> Result<String, KeyringError> {
        Err(KeyringError::NotSupported)
    }

    /// Wipe the keyring: accounts, cursors, and the cached public key.
    pub fn forget_device(&mut self) {
        info!("Forgetting device; clearing {} account(s)", self.registry.len());
        self.registry.clear();
        self.pager.reset();
        self.unlocked_account = 0;
        self.hdk.reset();
    }

    /// Snapshot the keyring state for persistence.
    pub fn serialize(&self) -> KeyringSnapshot {
        KeyringSnapshot {
            bridge_url: Some(self.config.bridge_url.clone()),
            hd_path: Some(self.config.hd_path.clone()),
            accounts: self.registry.accounts().to_vec(),
            account_details: Some(self.registry.details_map()),
            account_indexes: None,
        }
    }

    /// Restore keyring state from a snapshot, migrating deprecated schemas
    /// forward.
    pub fn deserialize(&mut self, snapshot: KeyringSnapshot) -> Result<(), KeyringError> {
        if let Some(bridge_url) = snapshot.bridge_url.clone() {
            self.config.bridge_url = bridge_url;
        }
        let hd_path = snapshot
            .hd_path
            .clone()
            .unwrap_or_else(|| DEFAULT_HD_PATH.to_string());
        self.set_hd_path(&hd_path)?;

        let migrated = migrate_to_current(snapshot, &self.config.hd_path);
        let details = migrated.account_details.unwrap_or_default();

        self.registry.clear();
        for account in &migrated.accounts {
            let Some(checksummed) = normalize_address(account) else {
                warn!("Skipping restore of invalid address {}", account);
                continue;
            };
            match details.get(&checksummed) {
                Some(entry) => self.registry.insert(checksummed, entry.clone()),
                None => warn!("No derivation details for {}, skipping", checksummed),
            }
        }
        info!("Restored {} account(s) from snapshot", self.registry.len());
        Ok(())
    }

    fn path_for_account(&self, address: &str) -> Result<String, KeyringError> {
        self.registry
            .entry(address)
            .map(|entry| entry.hd_path.clone())
            .ok_or_else(|| KeyringError::AccountNotFound(address.to_string()))
    }
}
