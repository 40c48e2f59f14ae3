//! Ledger records, value objects and the ports the application layer talks through.

pub mod batch;
pub mod command;
pub mod money;
pub mod name;
pub mod payment;
pub mod ports;
pub mod project;
pub mod time;
