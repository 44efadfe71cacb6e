//! Integration tests for transfers

mod common;

use std::sync::Arc;

use common::*;
use domain_ledger::{Account, AccountKey, AccountStatus, EntryDirection, LedgerError, TransactionKind};

fn key(account_number: u64) -> AccountKey {
    AccountKey::new(AGENCY, account_number)
}

// ============================================================================
// Successful Transfers
// ============================================================================

mod success {
    use super::*;

    #[tokio::test]
    async fn test_transfer_moves_money_and_conserves_sum() {
        let a = account(1, 500);
        let b = account(2, 100);
        let h = Harness::new(vec![a.clone(), b.clone()]).await;

        let committed = h.transfer().execute(key(1), key(2), cents(200)).await.unwrap();

        assert_eq!(committed.value.source.balance, cents(300));
        assert_eq!(committed.value.destination.balance, cents(300));
        assert_eq!(h.accounts.total_balance().await, cents(600));

        let tx = &committed.transaction;
        assert_eq!(tx.kind, TransactionKind::Transfer);
        assert_eq!(tx.source, Some(a.id));
        assert_eq!(tx.destination, Some(b.id));
        assert_eq!(tx.direction_for(b.id), Some(EntryDirection::Credit));
    }

    #[tokio::test]
    async fn test_transfer_of_entire_balance() {
        let h = Harness::new(vec![account(1, 500), account(2, 0)]).await;

        let committed = h.transfer().execute(key(1), key(2), cents(500)).await.unwrap();

        assert!(committed.value.source.balance.is_zero());
        assert_eq!(committed.value.destination.balance, cents(500));
    }

    #[tokio::test]
    async fn test_transfer_bumps_both_versions() {
        let a = account(1, 500);
        let b = account(2, 0);
        let h = Harness::new(vec![a.clone(), b.clone()]).await;

        let committed = h.transfer().execute(key(1), key(2), cents(1)).await.unwrap();

        assert_eq!(committed.value.source.version, a.version + 1);
        assert_eq!(committed.value.destination.version, b.version + 1);
    }
}

// ============================================================================
// Rejections
// ============================================================================

mod rejections {
    use super::*;

    #[tokio::test]
    async fn test_same_account_rejected() {
        let h = Harness::new(vec![account(1, 500)]).await;
        let result = h.transfer().execute(key(1), key(1), cents(10)).await;
        assert!(matches!(result, Err(LedgerError::SameAccountTransfer)));
    }

    #[tokio::test]
    async fn test_insufficient_source_changes_nothing() {
        let a = account(1, 50);
        let b = account(2, 0);
        let h = Harness::new(vec![a.clone(), b.clone()]).await;

        let result = h.transfer().execute(key(1), key(2), cents(51)).await;

        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert_eq!(h.accounts.get(a.id).await.unwrap(), a);
        assert_eq!(h.accounts.get(b.id).await.unwrap(), b);
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn test_destination_past_storable_balance_changes_nothing() {
        let a = account(1, 500);
        let b = account(2, Account::MAX_BALANCE.cents() - 100);
        let h = Harness::new(vec![a.clone(), b.clone()]).await;

        let result = h.transfer().execute(key(1), key(2), cents(101)).await;

        assert!(matches!(result, Err(LedgerError::BalanceOverflow)));
        assert_eq!(h.accounts.get(a.id).await.unwrap(), a);
        assert_eq!(h.accounts.get(b.id).await.unwrap(), b);
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn test_missing_destination_is_not_found() {
        let h = Harness::new(vec![account(1, 500)]).await;

        let result = h.transfer().execute(key(1), key(9), cents(10)).await;

        assert!(matches!(
            result,
            Err(LedgerError::AccountNotFound { account_number: 9, agency: AGENCY })
        ));
    }

    #[tokio::test]
    async fn test_blocked_destination_rejected() {
        let mut b = account(2, 0);
        b.status = AccountStatus::Blocked;
        let h = Harness::new(vec![account(1, 500), b]).await;

        let result = h.transfer().execute(key(1), key(2), cents(10)).await;

        assert!(matches!(
            result,
            Err(LedgerError::AccountNotActive { status: AccountStatus::Blocked, .. })
        ));
    }

    #[tokio::test]
    async fn test_storage_failure_mid_transaction_rolls_back() {
        let a = account(1, 500);
        let b = account(2, 100);
        let h = Harness::new(vec![a.clone(), b.clone()]).await;
        h.accounts.fail_transaction_after_first_write();

        let result = h.transfer().execute(key(1), key(2), cents(200)).await;

        assert!(matches!(result, Err(LedgerError::Storage(_))));
        assert_eq!(h.accounts.get(a.id).await.unwrap().balance, cents(500));
        assert_eq!(h.accounts.get(b.id).await.unwrap().balance, cents(100));
        assert!(h.queue.is_empty());
    }
}

// ============================================================================
// Interaction with the Daily Ceiling
// ============================================================================

mod ceiling {
    use super::*;

    #[tokio::test]
    async fn test_settled_transfers_do_not_count_toward_ceiling() {
        let a = account(1, 1_000_000);
        let h = Harness::new(vec![a.clone(), account(2, 0)]).await;
        let handle = h.consumer().spawn();

        h.transfer().execute(key(1), key(2), cents(200_000)).await.unwrap();
        let history = &h.history;
        eventually(|| async move { history.len().await == 1 }).await;

        assert!(h.calculator().extract_today(a.id).await.unwrap().is_zero());
        assert!(h.withdrawal().execute(1, AGENCY, cents(200_000)).await.is_ok());

        handle.shutdown().await;
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposite_transfers_conserve_total() {
        let h = Harness::new(vec![account(1, 10_000), account(2, 10_000)]).await;
        let transfer = Arc::new(h.transfer());

        let tasks: Vec<_> = (0..40u64)
            .map(|i| {
                let transfer = Arc::clone(&transfer);
                tokio::spawn(async move {
                    let (from, to) = if i % 2 == 0 { (key(1), key(2)) } else { (key(2), key(1)) };
                    transfer.execute(from, to, cents(1 + i * 7)).await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(h.accounts.total_balance().await, cents(20_000));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn transfer_conserves_sum(
            from_balance in 0u64..1_000_000,
            to_balance in 0u64..1_000_000,
            amount in 1u64..1_000_000
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let (ok, total) = runtime.block_on(async {
                let h = Harness::new(vec![account(1, from_balance), account(2, to_balance)]).await;
                let ok = h.transfer().execute(key(1), key(2), cents(amount)).await.is_ok();
                (ok, h.accounts.total_balance().await)
            });

            prop_assert_eq!(ok, amount <= from_balance);
            prop_assert_eq!(total, cents(from_balance + to_balance));
        }
    }
}
