//! HTTP transport for the backtesting brokerage simulator.
//!
//! This crate owns only the wire boundary: request/response DTOs
//! (`api_types`), bearer-token auth (`auth`), the axum router and handlers
//! (`routes`), and the shared daemon state (`state`). All trading/account
//! logic lives in `btsim-account` and its collaborators; handlers here do
//! nothing but decode, authorize, delegate, and re-encode.

pub mod api_types;
pub mod auth;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
