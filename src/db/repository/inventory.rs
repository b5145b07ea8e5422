use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{DatabaseError, DATETIME_FORMAT};
use crate::models::{StockItem, DEFAULT_UNIT};

/// Whole ledger ordered by medication name.
pub fn list_stock(conn: &Connection) -> Result<Vec<StockItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, medication_name, quantity, unit, last_restock_at
         FROM inventory
         ORDER BY medication_name",
    )?;
    let rows = stmt.query_map([], row_to_stock_item)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn get_stock_item(conn: &Connection, name: &str) -> Result<Option<StockItem>, DatabaseError> {
    conn.query_row(
        "SELECT id, medication_name, quantity, unit, last_restock_at
         FROM inventory WHERE medication_name = ?1",
        params![name],
        row_to_stock_item,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Medication names with stock on hand, for admission pick lists.
pub fn available_medication_names(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT medication_name FROM inventory WHERE quantity > 0 ORDER BY medication_name",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Add to an existing row. Returns `false` when no row has that name.
pub fn add_to_stock(
    conn: &Connection,
    name: &str,
    quantity: i64,
    unit: &str,
    at: &NaiveDateTime,
) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "UPDATE inventory SET quantity = quantity + ?1, unit = ?2, last_restock_at = ?3
         WHERE medication_name = ?4",
        params![quantity, unit, at.format(DATETIME_FORMAT).to_string(), name],
    )?;
    Ok(affected > 0)
}

pub fn insert_stock_item(
    conn: &Connection,
    name: &str,
    quantity: i64,
    unit: &str,
    at: &NaiveDateTime,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO inventory (medication_name, quantity, unit, last_restock_at) VALUES (?1, ?2, ?3, ?4)",
        params![name, quantity, unit, at.format(DATETIME_FORMAT).to_string()],
    )
    .map_err(|e| DatabaseError::from_write(e, "inventory.medication_name"))?;
    Ok(conn.last_insert_rowid())
}

/// Register a medication with zero stock unless it is already in the ledger.
pub fn ensure_stock_item(
    conn: &Connection,
    name: &str,
    at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO inventory (medication_name, quantity, unit, last_restock_at)
         VALUES (?1, 0, ?2, ?3)",
        params![name, DEFAULT_UNIT, at.format(DATETIME_FORMAT).to_string()],
    )?;
    Ok(())
}

/// Subtract `amount`, never going below zero. Returns `false` when no row matched.
pub fn decrement_stock(conn: &Connection, name: &str, amount: i64) -> Result<bool, DatabaseError> {
    let affected = conn.execute(
        "UPDATE inventory SET quantity = MAX(quantity - ?1, 0) WHERE medication_name = ?2",
        params![amount, name],
    )?;
    Ok(affected > 0)
}

pub fn count_low_stock(conn: &Connection, threshold: i64) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM inventory WHERE quantity < ?1",
        params![threshold],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn row_to_stock_item(row: &rusqlite::Row) -> Result<StockItem, rusqlite::Error> {
    Ok(StockItem {
        id: row.get(0)?,
        medication_name: row.get(1)?,
        quantity: row.get(2)?,
        unit: row.get(3)?,
        last_restock_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-05-01 12:00:00", DATETIME_FORMAT).unwrap()
    }

    #[test]
    fn add_to_missing_row_reports_false() {
        let conn = open_memory_database().unwrap();
        assert!(!add_to_stock(&conn, "Dipirona", 10, "CP", &now()).unwrap());
        insert_stock_item(&conn, "Dipirona", 10, "CP", &now()).unwrap();
        assert!(add_to_stock(&conn, "Dipirona", 5, "CX", &now()).unwrap());

        let item = get_stock_item(&conn, "Dipirona").unwrap().unwrap();
        assert_eq!(item.quantity, 15);
        assert_eq!(item.unit.as_deref(), Some("CX"));
        assert_eq!(item.last_restock_at, Some(now()));
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let conn = open_memory_database().unwrap();
        insert_stock_item(&conn, "Insulina", 3, "UN", &now()).unwrap();
        assert!(decrement_stock(&conn, "Insulina", 2).unwrap());
        assert_eq!(get_stock_item(&conn, "Insulina").unwrap().unwrap().quantity, 1);
        assert!(decrement_stock(&conn, "Insulina", 5).unwrap());
        assert_eq!(get_stock_item(&conn, "Insulina").unwrap().unwrap().quantity, 0);
        assert!(!decrement_stock(&conn, "Nada", 1).unwrap());
    }

    #[test]
    fn ensure_item_keeps_existing_quantity() {
        let conn = open_memory_database().unwrap();
        insert_stock_item(&conn, "Soro", 7, "ML", &now()).unwrap();
        ensure_stock_item(&conn, "Soro", &now()).unwrap();
        ensure_stock_item(&conn, "Novo", &now()).unwrap();

        assert_eq!(get_stock_item(&conn, "Soro").unwrap().unwrap().quantity, 7);
        let novo = get_stock_item(&conn, "Novo").unwrap().unwrap();
        assert_eq!(novo.quantity, 0);
        assert_eq!(novo.unit.as_deref(), Some(DEFAULT_UNIT));
    }

    #[test]
    fn available_names_skip_empty_rows_and_low_stock_counts() {
        let conn = open_memory_database().unwrap();
        insert_stock_item(&conn, "B", 50, "UN", &now()).unwrap();
        insert_stock_item(&conn, "A", 2, "UN", &now()).unwrap();
        insert_stock_item(&conn, "C", 0, "UN", &now()).unwrap();

        assert_eq!(available_medication_names(&conn).unwrap(), vec!["A", "B"]);
        assert_eq!(count_low_stock(&conn, 10).unwrap(), 2);
        assert_eq!(list_stock(&conn).unwrap().len(), 3);
    }

    #[test]
    fn duplicate_insert_is_constraint_violation() {
        let conn = open_memory_database().unwrap();
        insert_stock_item(&conn, "A", 1, "UN", &now()).unwrap();
        let err = insert_stock_item(&conn, "A", 1, "UN", &now()).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }
}
