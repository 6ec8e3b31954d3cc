//! Keyring configuration
//!
//! Defaults match the public bridge deployment; hosts override them when
//! running a self-hosted bridge page or a non-standard derivation tree.

use serde::{Deserialize, Serialize};

/// Default base derivation path (BIP44 account level, Ethereum).
pub const DEFAULT_HD_PATH: &str = "m/44'/60'/0'";

/// Default URL of the bridge deployment. Informational: carried in config and
/// persisted snapshots so hosts can route blobs to the right deployment.
pub const DEFAULT_BRIDGE_URL: &str = "https://metamask.github.io/eth-ledger-bridge-keyring";

/// Keyring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyringConfig {
    /// Base HD path accounts are derived under.
    #[serde(default = "KeyringConfig::default_hd_path")]
    pub hd_path: String,

    /// Bridge deployment URL, fixed per deployment.
    #[serde(default = "KeyringConfig::default_bridge_url")]
    pub bridge_url: String,
}

impl KeyringConfig {
    fn default_hd_path() -> String {
        DEFAULT_HD_PATH.to_string()
    }

    fn default_bridge_url() -> String {
        DEFAULT_BRIDGE_URL.to_string()
    }
}

impl Default for KeyringConfig {
    fn default() -> Self {
        Self {
            hd_path: Self::default_hd_path(),
            bridge_url: Self::default_bridge_url(),
        }
    }
}
