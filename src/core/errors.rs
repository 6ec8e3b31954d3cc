//! Keyring error types

use thiserror::Error;

/// Errors surfaced by keyring operations.
///
/// Every error is terminal for the call that produced it; none of them leave
/// the account registry in a partially-updated state.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// The requested address is not tracked by this keyring.
    #[error("Address {0} not found in this keyring")]
    AccountNotFound(String),

    /// The device answered an unlock with a different account than requested.
    #[error("Account {requested} does not belong to the connected device (connected account is {connected})")]
    AccountMismatch { requested: String, connected: String },

    /// Operation the device class cannot perform (typed data, key export).
    #[error("Not supported on this device")]
    NotSupported,

    /// Rejection or failure reported by the bridge channel, unchanged.
    #[error("Bridge error: {0}")]
    Bridge(String),

    /// A second bridge request was issued while one was still pending.
    #[error("A bridge request is already in flight")]
    RequestInFlight,

    /// Malformed HD derivation path handed to the path setter.
    #[error("Invalid HD path: {0}")]
    InvalidHdPath(String),

    /// Local derivation attempted without cached public-key material.
    #[error("Keyring is locked: {0}")]
    Locked(String),

    /// Malformed key material or signature payload.
    #[error("Crypto error: {0}")]
    Crypto(String),
}
