//! Bridge session
//!
//! One typed round trip per device operation. The session owns the
//! one-outstanding-request contract: a second request issued while one is
//! pending is a caller error, reported without touching the transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::bridge::messages::{
    BridgeEnvelope, BridgeRequest, BridgeResponse, SignaturePayload, UnlockPayload,
};
use crate::bridge::transport::BridgeTransport;
use crate::core::errors::KeyringError;

/// Request/response session over a bridge transport.
pub struct BridgeSession {
    transport: Arc<dyn BridgeTransport>,
    in_flight: AtomicBool,
}

impl BridgeSession {
    pub fn new(transport: Arc<dyn BridgeTransport>) -> Self {
        Self { transport, in_flight: AtomicBool::new(false) }
    }

    /// Fetch the public key, chain code and address at `hd_path`.
    pub async fn unlock(&self, hd_path: &str) -> Result<UnlockPayload, KeyringError> {
        let request = BridgeRequest::Unlock { hd_path: hd_path.to_string() };
        match self.exchange(request).await? {
            BridgeResponse::Unlocked(payload) => Ok(payload),
            other => Err(unexpected("unlock", &other)),
        }
    }

    /// Sign an RLP-encoded transaction (hex) at `hd_path`.
    pub async fn sign_transaction(
        &self,
        hd_path: &str,
        tx_hex: &str,
    ) -> Result<SignaturePayload, KeyringError> {
        let request = BridgeRequest::SignTransaction {
            hd_path: hd_path.to_string(),
            tx: tx_hex.to_string(),
        };
        match self.exchange(request).await? {
            BridgeResponse::TransactionSigned(payload) => Ok(payload),
            other => Err(unexpected("sign-transaction", &other)),
        }
    }

    /// Sign a personal message (hex-encoded bytes) at `hd_path`.
    pub async fn sign_personal_message(
        &self,
        hd_path: &str,
        message_hex: &str,
    ) -> Result<SignaturePayload, KeyringError> {
        let request = BridgeRequest::SignPersonalMessage {
            hd_path: hd_path.to_string(),
            message: message_hex.to_string(),
        };
        match self.exchange(request).await? {
            BridgeResponse::MessageSigned(payload) => Ok(payload),
            other => Err(unexpected("sign-personal-message", &other)),
        }
    }

    async fn exchange(&self, request: BridgeRequest) -> Result<BridgeResponse, KeyringError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let envelope = BridgeEnvelope::new(request);
        debug!("Sending {} request {} to the bridge", envelope.request.action(), envelope.id);

        match self.transport.exchange(envelope).await {
            Ok(response) => {
                debug!("Bridge request completed");
                Ok(response)
            }
            Err(e) => {
                warn!("Bridge request failed: {}", e);
                Err(KeyringError::Bridge(e.to_string()))
            }
        }
    }
}

fn unexpected(action: &str, response: &BridgeResponse) -> KeyringError {
    KeyringError::Bridge(format!("unexpected response to {}: {:?}", action, response))
}

/// Latch held for the duration of one bridge round trip.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, KeyringError> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(KeyringError::RequestInFlight);
        }
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
