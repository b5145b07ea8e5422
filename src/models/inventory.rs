use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Unit recorded when a medication enters the ledger without one.
pub const DEFAULT_UNIT: &str = "UN";

/// One row of the medication stock ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: i64,
    pub medication_name: String,
    pub quantity: i64,
    pub unit: Option<String>,
    pub last_restock_at: Option<NaiveDateTime>,
}
