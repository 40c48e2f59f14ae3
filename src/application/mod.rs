//! Application layer orchestrating the ledger's business rules.
//!
//! [`engine::LedgerEngine`] is the single entry point. Each operation family
//! lives in its own module as a `plan_*` method that reads the store,
//! validates, and returns the `WriteBatch` the engine commits.

pub mod access;
mod accrual;
mod deposit;
pub mod engine;
mod governance;
mod payout;
