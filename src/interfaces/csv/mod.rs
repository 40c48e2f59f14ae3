//! CSV command streams in, ledger state out.

pub mod command_reader;
pub mod state_writer;
