use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::db::{DatabaseError, DATETIME_FORMAT};
use crate::models::{NewVitalCheck, VitalCheck, VitalCheckEntry};

/// Insert a proof-of-life record. Returns the new id.
pub fn insert_vital_check(conn: &Connection, vc: &NewVitalCheck) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO vital_checks (patient_id, recorded_at, blood_pressure, glucose, saturation, heart_rate, performed_by, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            vc.patient_id,
            vc.recorded_at.format(DATETIME_FORMAT).to_string(),
            vc.blood_pressure,
            vc.glucose,
            vc.saturation,
            vc.heart_rate,
            vc.performed_by,
            vc.notes,
        ],
    )
    .map_err(|e| DatabaseError::from_write(e, "vital_checks.patient_id"))?;
    Ok(conn.last_insert_rowid())
}

/// All checks for a patient, newest first.
pub fn vital_checks_for_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<VitalCheck>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, recorded_at, blood_pressure, glucose, saturation, heart_rate, performed_by, notes
         FROM vital_checks
         WHERE patient_id = ?1
         ORDER BY recorded_at DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![patient_id], |row| row_to_vital_check(row, 0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Most recent checks across patients (or for one patient), with patient names.
pub fn recent_vital_checks(
    conn: &Connection,
    patient_id: Option<i64>,
    limit: u32,
) -> Result<Vec<VitalCheckEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT p.name, v.id, v.patient_id, v.recorded_at, v.blood_pressure, v.glucose, v.saturation,
                v.heart_rate, v.performed_by, v.notes
         FROM vital_checks v
         JOIN patients p ON p.id = v.patient_id
         WHERE ?1 IS NULL OR v.patient_id = ?1
         ORDER BY v.recorded_at DESC, v.id DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![patient_id, limit], |row| {
        Ok(VitalCheckEntry {
            patient_name: row.get(0)?,
            check: row_to_vital_check(row, 1)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

pub fn count_vital_checks_since(
    conn: &Connection,
    since: &NaiveDateTime,
) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM vital_checks WHERE recorded_at >= ?1",
        params![since.format(DATETIME_FORMAT).to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn row_to_vital_check(row: &rusqlite::Row, offset: usize) -> Result<VitalCheck, rusqlite::Error> {
    Ok(VitalCheck {
        id: row.get(offset)?,
        patient_id: row.get(offset + 1)?,
        recorded_at: row.get(offset + 2)?,
        blood_pressure: row.get(offset + 3)?,
        glucose: row.get(offset + 4)?,
        saturation: row.get(offset + 5)?,
        heart_rate: row.get(offset + 6)?,
        performed_by: row.get(offset + 7)?,
        notes: row.get(offset + 8)?,
    })
}
