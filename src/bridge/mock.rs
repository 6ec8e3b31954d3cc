//! Mock bridge transport
//!
//! Deterministic stand-in for the bridge channel so integration tests and
//! host development can run without a device. Unlock requests answer with
//! addresses derived from a fixed throwaway key; signing requests answer
//! with signatures derived from the request bytes.

use std::sync::Mutex;

use async_trait::async_trait;
use sha3::{Digest, Keccak256};

use crate::bridge::messages::{
    BridgeEnvelope, BridgeRequest, BridgeResponse, SignaturePayload, UnlockPayload,
};
use crate::bridge::transport::BridgeTransport;
use crate::crypto::hd::ExtendedKey;

/// In-memory bridge double.
pub struct MockBridge {
    key: ExtendedKey,
    requests: Mutex<Vec<BridgeRequest>>,
    unlock_address: Mutex<Option<String>>,
    failure: Mutex<Option<String>>,
}

impl MockBridge {
    /// Extended public key of the mock device tree (SEC1, compressed).
    pub const PUBLIC_KEY: &'static str =
        "024d902e1a2fc7a8755ab5b694c575fce742c48d9ff192e63df5193e4c7afe1f9c";

    /// Chain code of the mock device tree.
    pub const CHAIN_CODE: &'static str =
        "9452b549be8cea3ecb7a84bec10dcfd94afe4d129ebfd3b3cb58eedf394ed271";

    /// Checksummed addresses of the first fifteen accounts in the mock tree.
    pub const ACCOUNTS: [&'static str; 15] = [
        "0xF30952A1c534CDE7bC471380065726fa8686dfB3",
        "0x44fe3Cf56CaF651C4bD34Ae6dbcffa34e9e3b84B",
        "0x8Ee3374Fa705C1F939715871faf91d4348D5b906",
        "0xEF69e24dE9CdEe93C4736FE29791E45d5D4CFd6A",
        "0xC668a5116A045e9162902795021907Cb15aa2620",
        "0xbF519F7a6D8E72266825D770C60dbac55a3baeb9",
        "0x0258632Fe2F91011e06375eB0E6f8673C0463204",
        "0x4fC1700C0C61980aef0Fb9bDBA67D8a25B5d4335",
        "0xeEC5D417152aE295c047FB0B0eBd7c7090dDedEb",
        "0xd3f978B9eEEdB68A38CF252B3779afbeb3623fDf",
        "0xd819fE2beD53f44825F66873a159B687736d3092",
        "0xE761dA62f053ad9eE221d325657535991Ab659bD",
        "0xd4F1686961642340a80334b5171d85Bbd390c691",
        "0x6772C4B1E841b295960Bb4662dceD9bb71726357",
        "0x41bEAD6585eCA6c79B553Ca136f0DFA78A006899",
    ];

    pub fn new() -> Self {
        let key = ExtendedKey::from_parts(Self::PUBLIC_KEY, Self::CHAIN_CODE)
            .expect("mock key material is valid");
        Self {
            key,
            requests: Mutex::new(Vec::new()),
            unlock_address: Mutex::new(None),
            failure: Mutex::new(None),
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<BridgeRequest> {
        self.requests.lock().expect("mock state lock poisoned").clone()
    }

    /// Force every subsequent unlock to report `address` as the connected
    /// account, regardless of the requested path.
    pub fn respond_with_address(&self, address: &str) {
        *self.unlock_address.lock().expect("mock state lock poisoned") = Some(address.to_string());
    }

    /// Make the next request fail with `message`.
    pub fn fail_next(&self, message: &str) {
        *self.failure.lock().expect("mock state lock poisoned") = Some(message.to_string());
    }

    /// Device account index encoded in the final path segment.
    fn account_index(hd_path: &str) -> u32 {
        hd_path
            .rsplit('/')
            .next()
            .map(|segment| segment.trim_end_matches('\''))
            .and_then(|segment| segment.parse().ok())
            .unwrap_or(0)
    }
}

impl Default for MockBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BridgeTransport for MockBridge {
    async fn exchange(&self, envelope: BridgeEnvelope) -> anyhow::Result<BridgeResponse> {
        let request = envelope.request;
        self.requests.lock().expect("mock state lock poisoned").push(request.clone());

        if let Some(message) = self.failure.lock().expect("mock state lock poisoned").take() {
            anyhow::bail!(message);
        }

        match request {
            BridgeRequest::Unlock { hd_path } => {
                let forced = self.unlock_address.lock().expect("mock state lock poisoned").clone();
                let address = match forced {
                    Some(address) => address,
                    None => self.key.address_for_index(Self::account_index(&hd_path))?,
                };
                Ok(BridgeResponse::Unlocked(UnlockPayload {
                    public_key: Self::PUBLIC_KEY.to_string(),
                    chain_code: Self::CHAIN_CODE.to_string(),
                    address,
                }))
            }
            BridgeRequest::SignTransaction { tx, .. } => {
                Ok(BridgeResponse::TransactionSigned(mock_signature(&tx)))
            }
            BridgeRequest::SignPersonalMessage { message, .. } => {
                Ok(BridgeResponse::MessageSigned(mock_signature(&message)))
            }
        }
    }
}

fn mock_signature(data: &str) -> SignaturePayload {
    let r = Keccak256::digest(data.as_bytes());
    let s = Keccak256::digest(&r);
    SignaturePayload { v: 27, r: hex::encode(r), s: hex::encode(s) }
}
