//! Integration tests for deposits, status changes and statements

mod common;

use chrono::{Duration as ChronoDuration, NaiveDate};

use common::*;
use core_kernel::{AccountId, Amount};
use domain_ledger::ports::mock::MockTransactionHistory;
use domain_ledger::{Account, AccountStatus, EntryDirection, LedgerError, Transaction};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

// ============================================================================
// Deposits
// ============================================================================

mod deposits {
    use super::*;

    #[tokio::test]
    async fn test_deposit_credits_balance() {
        let acc = account(1, 100);
        let h = Harness::new(vec![acc.clone()]).await;

        let committed = h.deposit().execute(1, AGENCY, cents(250)).await.unwrap();

        assert_eq!(committed.value.balance, cents(350));
        assert_eq!(committed.transaction.destination, Some(acc.id));
        assert_eq!(committed.transaction.source, None);
        committed.publish.outcome().await.unwrap();
    }

    #[tokio::test]
    async fn test_deposit_overflow_rejected() {
        let acc = account(1, u64::MAX);
        let h = Harness::new(vec![acc.clone()]).await;

        let result = h.deposit().execute(1, AGENCY, cents(1)).await;

        assert!(matches!(result, Err(LedgerError::BalanceOverflow)));
        assert_eq!(h.accounts.get(acc.id).await.unwrap().balance, cents(u64::MAX));
    }

    #[tokio::test]
    async fn test_deposit_past_storable_balance_rejected() {
        let acc = account(1, Account::MAX_BALANCE.cents());
        let h = Harness::new(vec![acc.clone()]).await;

        let result = h.deposit().execute(1, AGENCY, cents(1)).await;

        assert!(matches!(result, Err(LedgerError::BalanceOverflow)));
        assert_eq!(h.accounts.get(acc.id).await.unwrap(), acc);
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn test_deposit_into_closed_account_rejected() {
        let mut acc = account(1, 0);
        acc.status = AccountStatus::Closed;
        let h = Harness::new(vec![acc]).await;

        let result = h.deposit().execute(1, AGENCY, cents(1)).await;
        assert!(matches!(result, Err(LedgerError::AccountNotActive { status: AccountStatus::Closed, .. })));
    }
}

// ============================================================================
// Status Changes
// ============================================================================

mod status {
    use super::*;

    #[tokio::test]
    async fn test_block_then_withdraw_is_rejected() {
        let h = Harness::new(vec![account(1, 300)]).await;

        let blocked = h.update_status().execute(1, AGENCY, AccountStatus::Blocked).await.unwrap();
        assert_eq!(blocked.status, AccountStatus::Blocked);

        let result = h.withdrawal().execute(1, AGENCY, cents(10)).await;
        assert!(matches!(result, Err(LedgerError::AccountNotActive { .. })));
    }

    #[tokio::test]
    async fn test_reactivate_restores_transactions() {
        let h = Harness::new(vec![account(1, 300)]).await;
        let command = h.update_status();

        command.execute(1, AGENCY, AccountStatus::Blocked).await.unwrap();
        command.execute(1, AGENCY, AccountStatus::Active).await.unwrap();

        assert!(h.withdrawal().execute(1, AGENCY, cents(10)).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_with_balance_rejected() {
        let h = Harness::new(vec![account(1, 300)]).await;

        let result = h.update_status().execute(1, AGENCY, AccountStatus::Closed).await;

        assert!(matches!(
            result,
            Err(LedgerError::InvalidStatusTransition { from: AccountStatus::Active, to: AccountStatus::Closed })
        ));
    }

    #[tokio::test]
    async fn test_closed_is_terminal() {
        let h = Harness::new(vec![account(1, 0)]).await;
        let command = h.update_status();

        command.execute(1, AGENCY, AccountStatus::Closed).await.unwrap();
        let result = command.execute(1, AGENCY, AccountStatus::Active).await;

        assert!(matches!(result, Err(LedgerError::InvalidStatusTransition { .. })));
    }

    #[tokio::test]
    async fn test_status_change_emits_nothing() {
        let h = Harness::new(vec![account(1, 0)]).await;
        h.update_status().execute(1, AGENCY, AccountStatus::Blocked).await.unwrap();
        assert!(h.queue.is_empty());
    }

    #[tokio::test]
    async fn test_status_of_unknown_account() {
        let h = Harness::new(vec![]).await;
        let result = h.update_status().execute(2, AGENCY, AccountStatus::Blocked).await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound { .. })));
    }
}

// ============================================================================
// Statements
// ============================================================================

mod statements {
    use super::*;

    #[tokio::test]
    async fn test_statement_directions_and_totals() {
        let acc = account(1, 700);
        let other = AccountId::new();
        let history = MockTransactionHistory::with_transactions(vec![
            Transaction::deposit(acc.id, cents(1_000), now() - ChronoDuration::hours(3)),
            Transaction::withdrawal(acc.id, cents(200), now() - ChronoDuration::hours(2)),
            Transaction::transfer(acc.id, other, cents(150), now() - ChronoDuration::hours(1)),
            Transaction::transfer(other, acc.id, cents(50), now()),
            Transaction::deposit(other, cents(999), now()),
        ])
        .await;
        let h = Harness::with_history(vec![acc.clone()], history).await;

        let statement = h.statement().execute(1, AGENCY, day(1), day(1)).await.unwrap();

        let directions: Vec<_> = statement.entries.iter().map(|e| e.direction).collect();
        assert_eq!(
            directions,
            vec![
                EntryDirection::Credit,
                EntryDirection::Debit,
                EntryDirection::Debit,
                EntryDirection::Credit,
            ]
        );
        assert_eq!(statement.total_credits, cents(1_050));
        assert_eq!(statement.total_debits, cents(350));
        assert_eq!(statement.balance, cents(700));
        assert_eq!(statement.account_id, acc.id);
    }

    #[tokio::test]
    async fn test_statement_period_follows_local_days() {
        let acc = account(1, 0);
        let history = MockTransactionHistory::with_transactions(vec![
            // 23:00 local on 30 April
            Transaction::deposit(acc.id, cents(1), now() - ChronoDuration::hours(13)),
            // 12:00 local on 1 May
            Transaction::deposit(acc.id, cents(2), now()),
        ])
        .await;
        let h = Harness::with_history(vec![acc], history).await;

        let statement = h.statement().execute(1, AGENCY, day(1), day(2)).await.unwrap();

        assert_eq!(statement.entries.len(), 1);
        assert_eq!(statement.total_credits, cents(2));
        assert_eq!(statement.period_end - statement.period_start, ChronoDuration::days(2));
    }

    #[tokio::test]
    async fn test_statement_reversed_period_rejected() {
        let h = Harness::new(vec![account(1, 0)]).await;
        let result = h.statement().execute(1, AGENCY, day(3), day(1)).await;
        assert!(matches!(result, Err(LedgerError::InvalidPeriod { .. })));
    }

    #[tokio::test]
    async fn test_empty_statement() {
        let h = Harness::new(vec![account(1, 42)]).await;
        let statement = h.statement().execute(1, AGENCY, day(1), day(1)).await.unwrap();

        assert!(statement.entries.is_empty());
        assert_eq!(statement.total_credits, Amount::zero());
        assert_eq!(statement.total_debits, Amount::zero());
    }
}
