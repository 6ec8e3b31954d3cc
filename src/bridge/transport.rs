//! Bridge transport contract

use async_trait::async_trait;

use crate::bridge::messages::{BridgeEnvelope, BridgeResponse};

/// Defines the interface to the bridge channel that reaches the hardware
/// signing device. Implementations deliver the request to the bridge
/// deployment, wait for the single reply correlated to the envelope id, and
/// return it; framing and transport details are theirs alone.
///
/// Errors are returned as-is — the keyring propagates them to the caller
/// without retrying.
#[async_trait]
pub trait BridgeTransport: Send + Sync {
    async fn exchange(&self, envelope: BridgeEnvelope) -> anyhow::Result<BridgeResponse>;
}
