//! Wire DTOs, the error hierarchy, and the fixed-point representation
//! shared by every `btsim-*` crate.
//!
//! No business logic lives here — matching, ledger accounting, and
//! corporate-action handling are owned by their respective crates.

pub mod error;
pub mod micros;
pub mod types;

pub use error::{AccountError, BadParameter, BtsimError, ErrorBody, Infra, TradeRejected};
pub use micros::MICROS_SCALE;
pub use types::{
    derive_id, AccountInfo, AssetsRow, Entrust, Lot, MetricsReport, OrderStatus, PositionSnapshot,
    Side, Trade,
};
