//! Account orchestration: the `Account` aggregate, its process-wide trade
//! sequence counter, and the `Registry` that keyspaces many accounts behind
//! bearer tokens.

mod account;
mod registry;
mod seq;

pub use account::{Account, AccountConfig};
pub use registry::{Registry, StartBacktestParams};
pub use seq::next_seq_no;
