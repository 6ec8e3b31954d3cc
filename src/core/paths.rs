//! HD derivation path policy
//!
//! Pure string policy translating a base path plus a device account index into
//! the path requested from the device and recorded for the account. Two path
//! families exist:
//!
//! - BIP44 form: the base already carries a change-level component
//!   (`m/44'/60'/0'/0` or deeper). The account-level segment is rewritten to
//!   the device index and an address suffix appended, so account `i` lives at
//!   `m/44'/60'/{i}'/0/{i}`.
//! - Legacy flat form: a bare account-level base (`m/44'/60'/0'`); the device
//!   index is appended directly, `{base}/{i}`.

use crate::core::errors::KeyringError;

/// True when `base` already includes a change-level component beyond the
/// hardened account segment, i.e. the path follows the BIP44 account layout.
pub fn is_bip44_base(base: &str) -> bool {
    base.split('/').skip(1).count() >= 4
}

/// Compute the derivation path for device account `index` under `base`,
/// returning the path and whether it follows the BIP44 layout.
pub fn path_for_index(base: &str, index: u32) -> (String, bool) {
    if is_bip44_base(base) {
        let parts: Vec<&str> = base.split('/').collect();
        // m / purpose' / coin' / {index}' / 0 / {index}
        let path = format!("{}/{}/{}/{}'/0/{}", parts[0], parts[1], parts[2], index, index);
        (path, true)
    } else {
        (format!("{}/{}", base, index), false)
    }
}

/// Path assigned by the legacy account-index migration: the account segment of
/// the standard Ethereum tree rewritten to `index`, address fixed at `0/0`.
pub fn ledger_live_path(index: u32) -> String {
    format!("m/44'/60'/{}'/0/0", index)
}

/// Validate an HD path eagerly: `m` root followed by numeric segments, each
/// optionally hardened with a trailing apostrophe. Malformed paths are a
/// caller error and are rejected before they reach the path policy.
pub fn validate_hd_path(path: &str) -> Result<(), KeyringError> {
    let mut segments = path.split('/');
    if segments.next() != Some("m") {
        return Err(KeyringError::InvalidHdPath(path.to_string()));
    }
    for segment in segments {
        let index = segment.strip_suffix('\'').unwrap_or(segment);
        if index.is_empty() || index.parse::<u32>().is_err() {
            return Err(KeyringError::InvalidHdPath(path.to_string()));
        }
    }
    Ok(())
}
