//! Bridge channel integration: typed message contract, transport trait,
//! request session, and an in-memory mock for tests and host development.

pub mod messages;
pub mod mock;
pub mod session;
pub mod transport;

pub use messages::{
    BridgeEnvelope, BridgeRequest, BridgeResponse, SignaturePayload, UnlockPayload,
};
pub use mock::MockBridge;
pub use session::BridgeSession;
pub use transport::BridgeTransport;
