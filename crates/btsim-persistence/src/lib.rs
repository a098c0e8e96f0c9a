//! Account snapshot persistence: the opaque-blob contract behind
//! `save_backtest`/`load_backtest`. No IO beyond a single read/write per
//! call; `btsim-account` decides when to call in.

pub mod error;
pub mod snapshot;
pub mod store;

pub use error::PersistenceError;
pub use snapshot::AccountSnapshot;
pub use store::{FileStore, MemoryStore, SnapshotStore};
