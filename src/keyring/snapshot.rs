//! Persisted keyring snapshots
//!
//! Wire form of the keyring state plus the forward migration chain for the
//! two deprecated schemas: snapshots that carry per-address device indexes
//! (`accountIndexes`) and snapshots that carry bare account lists with no
//! derivation details at all. Migrations are pure, one-way, and idempotent —
//! a migrated snapshot re-serializes identically forever after.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::paths::ledger_live_path;
use crate::core::registry::AccountEntry;
use crate::crypto::hd::normalize_address;

/// Serialized keyring state.
///
/// `accountIndexes` only ever appears on input; current snapshots persist
/// `accountDetails` exclusively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyringSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hd_path: Option<String>,
    pub accounts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_details: Option<BTreeMap<String, AccountEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_indexes: Option<BTreeMap<String, u32>>,
}

/// Run the full migration chain against a freshly loaded snapshot.
///
/// `base_path` is the restored HD path; it anchors the flat paths assigned to
/// bare accounts.
pub fn migrate_to_current(snapshot: KeyringSnapshot, base_path: &str) -> KeyringSnapshot {
    migrate_bare_accounts(migrate_legacy_indexes(snapshot), base_path)
}

/// Rewrite legacy `accountIndexes` entries into BIP44 account details.
/// Device index `i` maps to `m/44'/60'/{i}'/0/0`. The legacy field is
/// consumed and never re-emitted.
fn migrate_legacy_indexes(mut snapshot: KeyringSnapshot) -> KeyringSnapshot {
    let Some(indexes) = snapshot.account_indexes.take() else {
        return snapshot;
    };

    let mut details = snapshot.account_details.take().unwrap_or_default();
    for (address, index) in indexes {
        let Some(checksummed) = normalize_address(&address) else {
            warn!("Failed to migrate account {}", address);
            continue;
        };
        if details.contains_key(&checksummed) {
            continue;
        }
        details.insert(
            checksummed,
            AccountEntry { bip44: true, hd_path: ledger_live_path(index) },
        );
    }
    snapshot.account_details = Some(details);
    snapshot
}

/// Assign flat derivation paths to accounts that predate detail tracking:
/// each account still missing an entry gets `{base}/{position}`, where
/// `position` is its index in the ordered account list.
fn migrate_bare_accounts(mut snapshot: KeyringSnapshot, base_path: &str) -> KeyringSnapshot {
    let mut details = snapshot.account_details.take().unwrap_or_default();
    for (position, address) in snapshot.accounts.iter().enumerate() {
        let Some(checksummed) = normalize_address(address) else {
            warn!("Failed to migrate account {}", address);
            continue;
        };
        if details.contains_key(&checksummed) {
            continue;
        }
        details.insert(
            checksummed,
            AccountEntry { bip44: false, hd_path: format!("{}/{}", base_path, position) },
        );
    }
    snapshot.account_details = Some(details);
    snapshot
}
