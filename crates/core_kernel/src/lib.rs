//! Core Kernel - Foundational types and utilities for the account ledger
//!
//! This crate provides the fundamental building blocks used across the ledger crates:
//! - `Amount`, an unsigned integer count of cents that can never go negative
//! - Temporal helpers for computing business-day windows in a timezone
//! - Strongly-typed identifiers
//! - Port infrastructure shared by every adapter (errors, health checks)

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use money::{Amount, MoneyError};
pub use temporal::{Clock, SystemClock, FixedClock, DayWindow, Timezone, TemporalError};
pub use identifiers::{AccountId, CarrierId, TransactionId, EventId};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
