//! Account lifecycle, paging, signing, and unlock-by-address flows against
//! the in-tree mock bridge.

use std::sync::Arc;

use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, TransactionRequest};
use ledger_bridge_keyring::{
    BridgeRequest, KeyringError, LedgerBridgeKeyring, MockBridge,
};
use pretty_assertions::assert_eq;

const ACCOUNTS: [&str; 15] = MockBridge::ACCOUNTS;

fn new_keyring() -> (LedgerBridgeKeyring, Arc<MockBridge>) {
    let bridge = Arc::new(MockBridge::new());
    let keyring = LedgerBridgeKeyring::new(bridge.clone());
    (keyring, bridge)
}

fn test_tx() -> TypedTransaction {
    TransactionRequest::new()
        .nonce(0u64)
        .gas_price(10_000_000_000u64)
        .gas(10_000u64)
        .to(Address::zero())
        .value(0u64)
        .chain_id(1u64)
        .into()
}

#[test]
fn test_type_identity() {
    let (keyring, _) = new_keyring();
    assert_eq!(LedgerBridgeKeyring::TYPE, "Ledger Hardware");
    assert_eq!(keyring.keyring_type(), LedgerBridgeKeyring::TYPE);
}

#[test]
fn test_starts_locked_and_empty() {
    let (keyring, _) = new_keyring();
    assert!(!keyring.is_unlocked());
    assert!(keyring.get_accounts().is_empty());
    assert_eq!(keyring.hd_path(), "m/44'/60'/0'");
}

#[tokio::test]
async fn test_add_accounts_returns_a_single_account() {
    let (mut keyring, _) = new_keyring();
    keyring.set_account_to_unlock(0);
    let accounts = keyring.add_accounts(1).await.unwrap();
    assert_eq!(accounts, vec![ACCOUNTS[0].to_string()]);
    assert!(keyring.is_unlocked());
}

#[tokio::test]
async fn test_add_accounts_returns_the_requested_count() {
    let (mut keyring, _) = new_keyring();
    keyring.set_account_to_unlock(0);
    let accounts = keyring.add_accounts(5).await.unwrap();
    assert_eq!(accounts.len(), 5);
    for (i, account) in accounts.iter().enumerate() {
        assert_eq!(account, ACCOUNTS[i]);
    }
}

#[tokio::test]
async fn test_cursor_advances_by_count() {
    let (mut keyring, _) = new_keyring();
    keyring.set_account_to_unlock(3);
    let accounts = keyring.add_accounts(2).await.unwrap();
    assert_eq!(keyring.unlocked_account(), 5);
    assert_eq!(accounts, vec![ACCOUNTS[3].to_string(), ACCOUNTS[4].to_string()]);
}

#[tokio::test]
async fn test_repeated_adds_preserve_existing_accounts() {
    let (mut keyring, _) = new_keyring();
    keyring.set_account_to_unlock(0);
    keyring.add_accounts(1).await.unwrap();
    keyring.set_account_to_unlock(1);
    let accounts = keyring.add_accounts(1).await.unwrap();
    assert_eq!(accounts, vec![ACCOUNTS[0].to_string(), ACCOUNTS[1].to_string()]);
}

#[tokio::test]
async fn test_overlapping_cursor_ranges_do_not_duplicate() {
    let (mut keyring, _) = new_keyring();
    keyring.set_account_to_unlock(0);
    keyring.add_accounts(2).await.unwrap();
    keyring.set_account_to_unlock(0);
    let accounts = keyring.add_accounts(3).await.unwrap();
    assert_eq!(
        accounts,
        vec![ACCOUNTS[0].to_string(), ACCOUNTS[1].to_string(), ACCOUNTS[2].to_string()]
    );
    assert_eq!(keyring.unlocked_account(), 3);
}

#[tokio::test]
async fn test_flat_base_stores_flat_account_details() {
    let (mut keyring, _) = new_keyring();
    keyring.set_account_to_unlock(2);
    let accounts = keyring.add_accounts(1).await.unwrap();

    let snapshot = keyring.serialize();
    let entry = snapshot.account_details.unwrap().remove(&accounts[0]).unwrap();
    assert!(!entry.bip44);
    assert_eq!(entry.hd_path, "m/44'/60'/0'/2");
}

#[tokio::test]
async fn test_bip44_base_stores_rewritten_account_details() {
    let (mut keyring, bridge) = new_keyring();
    keyring.set_hd_path("m/44'/60'/0'/0/0").unwrap();
    keyring.set_account_to_unlock(1);
    let accounts = keyring.add_accounts(1).await.unwrap();

    let snapshot = keyring.serialize();
    let entry = snapshot.account_details.unwrap().remove(&accounts[0]).unwrap();
    assert!(entry.bip44);
    assert_eq!(entry.hd_path, "m/44'/60'/1'/0/1");

    // Hardened account paths are unlocked on the device, one request per
    // account on top of the base unlock.
    let unlocks: Vec<_> = bridge
        .requests()
        .into_iter()
        .filter(|r| matches!(r, BridgeRequest::Unlock { .. }))
        .collect();
    assert_eq!(unlocks.len(), 2);
}

#[tokio::test]
async fn test_remove_account() {
    let (mut keyring, _) = new_keyring();
    keyring.set_account_to_unlock(0);
    keyring.add_accounts(1).await.unwrap();

    keyring.remove_account(ACCOUNTS[0]).unwrap();
    assert!(keyring.get_accounts().is_empty());
}

#[tokio::test]
async fn test_remove_account_is_case_insensitive() {
    let (mut keyring, _) = new_keyring();
    keyring.set_account_to_unlock(0);
    keyring.add_accounts(1).await.unwrap();

    keyring.remove_account(&ACCOUNTS[0].to_lowercase()).unwrap();
    assert!(keyring.get_accounts().is_empty());
}

#[test]
fn test_remove_unknown_account_fails_and_changes_nothing() {
    let (mut keyring, _) = new_keyring();
    let missing = "0x0000000000000000000000000000000000000000";
    let err = keyring.remove_account(missing).unwrap_err();
    assert_eq!(err.to_string(), format!("Address {} not found in this keyring", missing));
    assert!(keyring.get_accounts().is_empty());
}

#[tokio::test]
async fn test_first_page_sets_page_one_and_lists_five_accounts() {
    let (mut keyring, _) = new_keyring();
    let page = keyring.get_first_page().await.unwrap();

    assert_eq!(keyring.current_page(), 1);
    assert_eq!(page.len(), 5);
    for (i, entry) in page.iter().enumerate() {
        assert_eq!(entry.address, ACCOUNTS[i]);
        assert_eq!(entry.index, i as u32);
        assert!(entry.balance.is_none());
    }
}

#[tokio::test]
async fn test_next_page_advances_the_window() {
    let (mut keyring, _) = new_keyring();
    let first = keyring.get_next_page().await.unwrap();
    assert_eq!(first[0].address, ACCOUNTS[0]);

    let second = keyring.get_next_page().await.unwrap();
    assert_eq!(keyring.current_page(), 2);
    for (i, entry) in second.iter().enumerate() {
        assert_eq!(entry.address, ACCOUNTS[5 + i]);
        assert_eq!(entry.index, (5 + i) as u32);
    }
}

#[tokio::test]
async fn test_previous_page_floors_at_page_one() {
    let (mut keyring, _) = new_keyring();
    keyring.get_next_page().await.unwrap();
    let page = keyring.get_previous_page().await.unwrap();

    assert_eq!(keyring.current_page(), 1);
    assert_eq!(page[0].address, ACCOUNTS[0]);

    let page = keyring.get_previous_page().await.unwrap();
    assert_eq!(keyring.current_page(), 1);
    assert_eq!(page[0].address, ACCOUNTS[0]);
}

#[tokio::test]
async fn test_paging_derives_locally_and_leaves_registry_alone() {
    let (mut keyring, bridge) = new_keyring();
    keyring.get_first_page().await.unwrap();
    keyring.get_next_page().await.unwrap();
    keyring.get_next_page().await.unwrap();

    // One unlock to fetch the base public key; the pages themselves never
    // touch the bridge.
    assert_eq!(bridge.requests().len(), 1);
    assert!(keyring.get_accounts().is_empty());
}

#[tokio::test]
async fn test_forget_device_wipes_everything() {
    let (mut keyring, _) = new_keyring();
    keyring.set_account_to_unlock(0);
    keyring.add_accounts(2).await.unwrap();
    keyring.get_first_page().await.unwrap();

    keyring.forget_device();

    assert!(!keyring.is_unlocked());
    assert!(keyring.get_accounts().is_empty());
    assert_eq!(keyring.unlocked_account(), 0);
    assert_eq!(keyring.current_page(), 0);
}

#[test]
fn test_set_hd_path_validates_and_resets_the_cached_key() {
    let (mut keyring, _) = new_keyring();
    keyring.set_hd_path("m/44'/99'/0").unwrap();
    assert_eq!(keyring.hd_path(), "m/44'/99'/0");

    assert!(matches!(
        keyring.set_hd_path("not-a-path"),
        Err(KeyringError::InvalidHdPath(_))
    ));
}

#[tokio::test]
async fn test_changing_hd_path_locks_the_keyring_again() {
    let (mut keyring, _) = new_keyring();
    keyring.get_first_page().await.unwrap();
    assert!(keyring.is_unlocked());

    // Same path: the cached key survives.
    keyring.set_hd_path("m/44'/60'/0'").unwrap();
    assert!(keyring.is_unlocked());

    keyring.set_hd_path("m/44'/99'/0").unwrap();
    assert!(!keyring.is_unlocked());
}

#[tokio::test]
async fn test_unlock_account_by_address_resolves_with_index_zero_path() {
    let (mut keyring, _) = new_keyring();
    keyring.set_account_to_unlock(0);
    keyring.add_accounts(1).await.unwrap();

    let hd_path = keyring.unlock_account_by_address(ACCOUNTS[0]).await.unwrap();
    assert_eq!(hd_path, "m/44'/60'/0'/0");
}

#[tokio::test]
async fn test_unlock_account_by_address_matches_case_insensitively() {
    let (mut keyring, _) = new_keyring();
    let hd_path = keyring
        .unlock_account_by_address(&ACCOUNTS[0].to_lowercase())
        .await
        .unwrap();
    assert_eq!(hd_path, "m/44'/60'/0'/0");
}

#[tokio::test]
async fn test_unlock_account_by_address_rejects_a_foreign_account() {
    let (mut keyring, bridge) = new_keyring();
    bridge.respond_with_address(ACCOUNTS[1]);

    let err = keyring.unlock_account_by_address(ACCOUNTS[0]).await.unwrap_err();
    match &err {
        KeyringError::AccountMismatch { requested, connected } => {
            assert_eq!(requested, ACCOUNTS[0]);
            assert_eq!(connected, ACCOUNTS[1]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Both addresses are named in the rendered error.
    let text = err.to_string();
    assert!(text.contains(ACCOUNTS[0]));
    assert!(text.contains(ACCOUNTS[1]));
}

#[tokio::test]
async fn test_sign_transaction_forwards_the_account_path() {
    let (mut keyring, bridge) = new_keyring();
    keyring.set_account_to_unlock(0);
    keyring.add_accounts(1).await.unwrap();

    let signature = keyring.sign_transaction(ACCOUNTS[0], &test_tx()).await.unwrap();
    assert_eq!(signature.v, 27);

    let request = bridge.requests().into_iter().last().unwrap();
    match request {
        BridgeRequest::SignTransaction { hd_path, tx } => {
            assert_eq!(hd_path, "m/44'/60'/0'/0");
            assert!(!tx.is_empty());
        }
        other => panic!("unexpected request: {other:?}"),
    }
}

#[tokio::test]
async fn test_sign_personal_message_forwards_the_message_bytes() {
    let (mut keyring, bridge) = new_keyring();
    keyring.set_account_to_unlock(0);
    keyring.add_accounts(1).await.unwrap();

    let signature = keyring
        .sign_personal_message(ACCOUNTS[0], b"some msg")
        .await
        .unwrap();
    assert_eq!(signature.v, 27);

    let request = bridge.requests().into_iter().last().unwrap();
    match request {
        BridgeRequest::SignPersonalMessage { hd_path, message } => {
            assert_eq!(hd_path, "m/44'/60'/0'/0");
            assert_eq!(message, hex::encode(b"some msg"));
        }
        other => panic!("unexpected request: {other:?}"),
    }
}

#[tokio::test]
async fn test_signing_for_an_unknown_account_never_reaches_the_bridge() {
    let (keyring, bridge) = new_keyring();
    let err = keyring.sign_transaction(ACCOUNTS[0], &test_tx()).await.unwrap_err();
    assert!(matches!(err, KeyringError::AccountNotFound(_)));
    assert!(bridge.requests().is_empty());
}

#[test]
fn test_typed_data_and_key_export_are_rejected_synchronously() {
    let (keyring, bridge) = new_keyring();

    let err = keyring.sign_typed_data().unwrap_err();
    assert_eq!(err.to_string(), "Not supported on this device");

    let err = keyring.export_account().unwrap_err();
    assert_eq!(err.to_string(), "Not supported on this device");

    assert!(bridge.requests().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_bridge_failure_propagates_and_commits_nothing() {
    let (mut keyring, bridge) = new_keyring();
    bridge.fail_next("device disconnected");

    let err = keyring.add_accounts(1).await.unwrap_err();
    assert!(matches!(err, KeyringError::Bridge(_)));
    assert!(err.to_string().contains("device disconnected"));
    assert!(keyring.get_accounts().is_empty());
    assert_eq!(keyring.unlocked_account(), 0);
}

#[test_log::test(tokio::test)]
async fn test_failed_unlock_does_not_partially_commit() {
    let (mut keyring, bridge) = new_keyring();
    keyring.set_hd_path("m/44'/60'/0'/0/0").unwrap();
    keyring.set_account_to_unlock(0);
    keyring.add_accounts(1).await.unwrap();

    bridge.fail_next("user rejected");
    let err = keyring.add_accounts(2).await.unwrap_err();
    assert!(matches!(err, KeyringError::Bridge(_)));

    // The earlier account is intact and the cursor did not move.
    assert_eq!(keyring.get_accounts(), vec![ACCOUNTS[0].to_string()]);
    assert_eq!(keyring.unlocked_account(), 1);
}
