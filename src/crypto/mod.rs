//! Public-key cryptography helpers for the keyring.

pub mod hd;
