use rusqlite::{params, Connection};

use crate::db::{DatabaseError, DATETIME_FORMAT};
use crate::models::{MedicationAdministration, NewAdministration};

/// Insert an administration record. Returns the new id.
pub fn insert_administration(
    conn: &Connection,
    a: &NewAdministration,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO medication_administrations
         (patient_id, medication_name, quantity, as_needed, administered_at, administered_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            a.patient_id,
            a.medication_name,
            a.quantity,
            a.as_needed,
            a.administered_at.format(DATETIME_FORMAT).to_string(),
            a.administered_by,
        ],
    )
    .map_err(|e| DatabaseError::from_write(e, "medication_administrations.patient_id"))?;
    Ok(conn.last_insert_rowid())
}

/// Administration history for a patient, newest first.
pub fn administrations_for_patient(
    conn: &Connection,
    patient_id: i64,
) -> Result<Vec<MedicationAdministration>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, medication_name, quantity, as_needed, administered_at, administered_by
         FROM medication_administrations
         WHERE patient_id = ?1
         ORDER BY administered_at DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![patient_id], |row| {
        Ok(MedicationAdministration {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            medication_name: row.get(2)?,
            quantity: row.get(3)?,
            as_needed: row.get(4)?,
            administered_at: row.get(5)?,
            administered_by: row.get(6)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}
