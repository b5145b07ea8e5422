//! Medication stock ledger.
//!
//! Quantities are whole units. Restocking adds; administering a dose
//! subtracts the rounded dose and never drives a row below zero.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::{self, DatabaseError};
use crate::models::{StockItem, DEFAULT_UNIT};

/// Largest quantity a ledger row may hold.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum StockError {
    #[error("{0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Body of a restock request.
#[derive(Debug, Clone, Deserialize)]
pub struct Restock {
    pub medication_name: String,
    pub quantity: i64,
    #[serde(default)]
    pub unit: Option<String>,
}

pub fn list_stock(conn: &Connection) -> Result<Vec<StockItem>, StockError> {
    Ok(db::list_stock(conn)?)
}

/// Add `quantity` of a medication, creating its ledger row if needed.
/// Returns the row after the update.
pub fn restock(
    conn: &Connection,
    restock: &Restock,
    now: &NaiveDateTime,
) -> Result<StockItem, StockError> {
    let name = restock.medication_name.trim();
    if name.is_empty() {
        return Err(StockError::Validation("Medication name is required".into()));
    }
    if restock.quantity <= 0 {
        return Err(StockError::Validation("Quantity must be greater than zero".into()));
    }
    let unit = restock
        .unit
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_UNIT);

    let tx = conn.unchecked_transaction().map_err(DatabaseError::from)?;
    let on_hand = db::get_stock_item(&tx, name)?.map(|item| item.quantity);
    let total = on_hand
        .unwrap_or(0)
        .checked_add(restock.quantity)
        .filter(|total| *total <= MAX_STOCK_QUANTITY)
        .ok_or_else(|| {
            StockError::Validation(format!(
                "Quantity would exceed the ledger limit of {MAX_STOCK_QUANTITY}"
            ))
        })?;

    if on_hand.is_some() {
        db::add_to_stock(&tx, name, restock.quantity, unit, now)?;
        tracing::info!(medication = name, quantity = restock.quantity, total, "Stock replenished");
    } else {
        db::insert_stock_item(&tx, name, restock.quantity, unit, now)?;
        tracing::info!(medication = name, quantity = restock.quantity, "Stock item created");
    }

    let item = db::get_stock_item(&tx, name)?.ok_or_else(|| {
        StockError::Database(DatabaseError::NotFound {
            entity_type: "inventory".into(),
            id: name.to_string(),
        })
    })?;
    tx.commit().map_err(DatabaseError::from)?;
    Ok(item)
}

/// Take a dose out of stock. Non-positive doses leave the ledger untouched.
/// A medication missing from the ledger is logged and skipped.
pub fn consume(conn: &Connection, name: &str, dose: f64) -> Result<(), DatabaseError> {
    if !(dose > 0.0) {
        return Ok(());
    }
    let amount = dose.round() as i64;
    if !db::decrement_stock(conn, name, amount)? {
        tracing::warn!(medication = name, amount, "Medication not in stock ledger, nothing decremented");
    }
    Ok(())
}

/// Names with stock on hand.
pub fn available_medications(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    db::available_medication_names(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-05-10 08:00:00", db::DATETIME_FORMAT).unwrap()
    }

    fn restock_req(name: &str, qty: i64, unit: Option<&str>) -> Restock {
        Restock {
            medication_name: name.into(),
            quantity: qty,
            unit: unit.map(String::from),
        }
    }

    #[test]
    fn restock_inserts_then_adds() {
        let conn = open_memory_database().unwrap();
        let item = restock(&conn, &restock_req(" Dipirona ", 20, None), &now()).unwrap();
        assert_eq!(item.medication_name, "Dipirona");
        assert_eq!(item.quantity, 20);
        assert_eq!(item.unit.as_deref(), Some("UN"));

        let item = restock(&conn, &restock_req("Dipirona", 5, Some("CX")), &now()).unwrap();
        assert_eq!(item.quantity, 25);
        assert_eq!(item.unit.as_deref(), Some("CX"));
        assert_eq!(item.last_restock_at, Some(now()));
    }

    #[test]
    fn restock_validation() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            restock(&conn, &restock_req("  ", 5, None), &now()),
            Err(StockError::Validation(_))
        ));
        assert!(matches!(
            restock(&conn, &restock_req("Dipirona", 0, None), &now()),
            Err(StockError::Validation(_))
        ));
        assert!(list_stock(&conn).unwrap().is_empty());
    }

    #[test]
    fn restock_rejects_overflowing_totals() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            restock(&conn, &restock_req("Dipirona", i64::MAX, None), &now()),
            Err(StockError::Validation(_))
        ));
        assert!(list_stock(&conn).unwrap().is_empty());

        restock(&conn, &restock_req("Dipirona", MAX_STOCK_QUANTITY, None), &now()).unwrap();
        assert!(matches!(
            restock(&conn, &restock_req("Dipirona", 10, None), &now()),
            Err(StockError::Validation(_))
        ));
        assert!(matches!(
            restock(&conn, &restock_req("Dipirona", i64::MAX, None), &now()),
            Err(StockError::Validation(_))
        ));

        // Ledger stays readable and unchanged
        let items = list_stock(&conn).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, MAX_STOCK_QUANTITY);
    }

    #[test]
    fn consume_rounds_and_clamps() {
        let conn = open_memory_database().unwrap();
        restock(&conn, &restock_req("Dipirona", 3, None), &now()).unwrap();

        consume(&conn, "Dipirona", 1.6).unwrap();
        assert_eq!(db::get_stock_item(&conn, "Dipirona").unwrap().unwrap().quantity, 1);

        consume(&conn, "Dipirona", 10.0).unwrap();
        assert_eq!(db::get_stock_item(&conn, "Dipirona").unwrap().unwrap().quantity, 0);
    }

    #[test]
    fn consume_ignores_zero_and_unknown() {
        let conn = open_memory_database().unwrap();
        restock(&conn, &restock_req("Dipirona", 3, None), &now()).unwrap();
        consume(&conn, "Dipirona", 0.0).unwrap();
        consume(&conn, "Dipirona", f64::NAN).unwrap();
        consume(&conn, "Unknown", 2.0).unwrap();
        assert_eq!(db::get_stock_item(&conn, "Dipirona").unwrap().unwrap().quantity, 3);
    }

    #[test]
    fn available_skips_empty_rows() {
        let conn = open_memory_database().unwrap();
        restock(&conn, &restock_req("Dipirona", 3, None), &now()).unwrap();
        db::ensure_stock_item(&conn, "Amoxicilina", &now()).unwrap();
        assert_eq!(available_medications(&conn).unwrap(), vec!["Dipirona".to_string()]);
    }
}
