//! Account-management keyring for hardware-backed Ethereum accounts reached
//! through an asynchronous bridge channel.

pub mod bridge;
pub mod core;
pub mod crypto;
pub mod keyring;

pub use crate::bridge::{
    BridgeEnvelope, BridgeRequest, BridgeResponse, BridgeSession, BridgeTransport, MockBridge,
    SignaturePayload, UnlockPayload,
};
pub use crate::core::config::{KeyringConfig, DEFAULT_BRIDGE_URL, DEFAULT_HD_PATH};
pub use crate::core::errors::KeyringError;
pub use crate::core::pager::{PageAccount, PageDirection, PER_PAGE};
pub use crate::core::registry::AccountEntry;
pub use crate::keyring::snapshot::KeyringSnapshot;
pub use crate::keyring::LedgerBridgeKeyring;
