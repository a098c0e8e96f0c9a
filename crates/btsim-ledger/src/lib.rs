//! FIFO position ledger: one per account, keyed by symbol.
//!
//! No IO, no feed calls, no cash bookkeeping — those live on
//! `btsim-account::Account`. This crate only owns the lot arithmetic.

pub mod error;
pub mod ledger;

pub use error::LedgerError;
pub use ledger::{Ledger, LedgerSnapshot, PositionState, SellOutcome};
