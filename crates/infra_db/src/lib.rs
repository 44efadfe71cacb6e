//! Infrastructure Database Layer
//!
//! This crate provides the PostgreSQL adapters for the account ledger using
//! SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. Repositories own the SQL and
//! speak in row types and `DatabaseError`; adapters implement the domain
//! ports on top of them and translate errors into `PortError`.
//!
//! - `AccountRepository` / `PostgresAccountAdapter`: balances with row locks
//!   and optimistic versioning
//! - `TransactionRepository` / `PostgresTransactionHistory`: the append-only,
//!   idempotent history
//! - `PostgresEventQueue`: a durable at-least-once queue
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresAccountAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/ledger")).await?;
//! run_migrations(&pool).await?;
//! let accounts = PostgresAccountAdapter::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;
pub mod queue;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use repositories::{AccountRepository, TransactionRepository};
pub use adapters::{PostgresAccountAdapter, PostgresTransactionHistory};
pub use queue::{PostgresEventQueue, PostgresSubscription, QueueConfig};
