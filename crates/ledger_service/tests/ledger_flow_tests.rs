//! End-to-end flows through the `Ledger` façade over in-memory adapters

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};

use core_kernel::{Amount, CarrierId, FixedClock};
use domain_ledger::ports::mock::{MockAccountPort, MockTransactionHistory};
use domain_ledger::{
    Account, AccountKey, AccountStatus, ConsumerConfig, InMemoryEventQueue, LedgerError,
    WithdrawalLimits,
};
use ledger_service::{Ledger, LedgerConfig};

const AGENCY: u64 = 878;

fn account(account_number: u64, cents: u64) -> Account {
    Account::open(CarrierId::new(), "12345678909", AGENCY, account_number)
        .with_balance(Amount::from_cents(cents))
}

fn may_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

struct Fixture {
    ledger: Ledger,
    accounts: Arc<MockAccountPort>,
    history: Arc<MockTransactionHistory>,
    queue: Arc<InMemoryEventQueue>,
}

async fn fixture(accounts: Vec<Account>, ceiling: u64) -> Fixture {
    let accounts = Arc::new(MockAccountPort::with_accounts(accounts).await);
    let history = Arc::new(MockTransactionHistory::new());
    let queue = Arc::new(InMemoryEventQueue::new());

    let ledger = Ledger::builder(accounts.clone(), history.clone(), queue.clone())
        .clock(Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap())))
        .configure(&LedgerConfig::default())
        .unwrap()
        .limits(WithdrawalLimits::new(Amount::from_cents(ceiling)))
        .consumer_config(ConsumerConfig {
            retry_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(10),
        })
        .build();

    Fixture {
        ledger,
        accounts,
        history,
        queue,
    }
}

async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within five seconds");
}

// ============================================================================
// Settlement
// ============================================================================

mod settlement {
    use super::*;

    #[tokio::test]
    async fn test_commands_settle_into_statement() {
        let f = fixture(vec![account(1, 0)], 200_000).await;
        let consumer = f.ledger.consumer().spawn();

        f.ledger.deposit(1, AGENCY, Amount::from_cents(300)).await.unwrap();
        let committed = f.ledger.withdraw(1, AGENCY, Amount::from_cents(200)).await.unwrap();
        assert_eq!(committed.value.balance, Amount::from_cents(100));

        let history = &f.history;
        eventually(|| async move { history.len().await == 2 }).await;

        let statement = f.ledger.statement(1, AGENCY, may_first(), may_first()).await.unwrap();
        assert_eq!(statement.balance, Amount::from_cents(100));
        assert_eq!(statement.total_credits, Amount::from_cents(300));
        assert_eq!(statement.total_debits, Amount::from_cents(200));

        let stats = consumer.shutdown().await;
        assert_eq!(stats.settled, 2);
        assert_eq!(f.queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_ceiling_applies_once_withdrawals_settle() {
        let f = fixture(vec![account(1, 10_000)], 500).await;
        let consumer = f.ledger.consumer().spawn();

        f.ledger.withdraw(1, AGENCY, Amount::from_cents(400)).await.unwrap();
        let history = &f.history;
        eventually(|| async move { history.len().await == 1 }).await;

        let err = f.ledger.withdraw(1, AGENCY, Amount::from_cents(101)).await.unwrap_err();
        assert!(matches!(err, LedgerError::DailyWithdrawalLimitExceeded { .. }));

        f.ledger.withdraw(1, AGENCY, Amount::from_cents(100)).await.unwrap();
        consumer.shutdown().await;
    }
}

// ============================================================================
// Transfers and status
// ============================================================================

mod transfers {
    use super::*;

    #[tokio::test]
    async fn test_transfer_conserves_total() {
        let f = fixture(vec![account(1, 1_000), account(2, 50)], 200_000).await;
        let before = f.accounts.total_balance().await;

        let committed = f
            .ledger
            .transfer(AccountKey::new(AGENCY, 1), AccountKey::new(AGENCY, 2), Amount::from_cents(700))
            .await
            .unwrap();

        assert_eq!(committed.value.source.balance, Amount::from_cents(300));
        assert_eq!(committed.value.destination.balance, Amount::from_cents(750));
        assert_eq!(f.accounts.total_balance().await, before);
    }

    #[tokio::test]
    async fn test_blocked_account_rejects_withdrawal() {
        let f = fixture(vec![account(1, 1_000)], 200_000).await;

        let blocked = f.ledger.update_status(1, AGENCY, AccountStatus::Blocked).await.unwrap();
        assert_eq!(blocked.status, AccountStatus::Blocked);

        let err = f.ledger.withdraw(1, AGENCY, Amount::from_cents(1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotActive { .. }));
    }
}
