//! Adapters between the outside world and the ledger engine.

pub mod csv;
