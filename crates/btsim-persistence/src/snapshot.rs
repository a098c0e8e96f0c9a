use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use btsim_schemas::{AssetsRow, Entrust, Lot, Trade};

/// The full, opaque-to-transport state of one account: metadata (name,
/// principal, commission, dates, description), entrusts, trades, lots, and
/// the assets table. This is the one blob `save_backtest`/`load_backtest`
/// round-trip through a [`crate::SnapshotStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub name: String,
    pub token: String,
    pub principal_micros: i64,
    pub cash_micros: i64,
    pub commission_micros: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub xdxr_cursor: NaiveDate,
    pub description: Option<String>,
    pub entrusts: Vec<Entrust>,
    pub trades: Vec<Trade>,
    pub lots: Vec<Lot>,
    pub assets: Vec<AssetsRow>,
}
