use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{enum_column, DatabaseError, DATETIME_FORMAT, DATE_FORMAT};
use crate::models::{NewPatient, Patient, PatientStatus, PatientSummary};

const PATIENT_COLUMNS: &str = "id, name, birth_date, cep, address, district, procedure,
     priority, status, admitted_at, discharged_on, discharged_by";

/// Insert a new patient with status `inpatient`. Returns the new id.
pub fn insert_patient(conn: &Connection, p: &NewPatient) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (name, birth_date, cep, address, district, procedure, priority, status, admitted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            p.name,
            p.birth_date.map(|d| d.format(DATE_FORMAT).to_string()),
            p.cep,
            p.address,
            p.district,
            p.procedure,
            p.priority.as_str(),
            PatientStatus::Inpatient.as_str(),
            p.admitted_at.format(DATETIME_FORMAT).to_string(),
        ],
    )
    .map_err(|e| DatabaseError::from_write(e, "patients"))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
        params![id],
        row_to_patient,
    )
    .optional()
    .map_err(DatabaseError::from)
}

/// Current inpatients ordered by name, optionally filtered by a name fragment.
///
/// The filter folds case with Unicode rules in Rust; SQLite's `lower()` only
/// folds ASCII, and the fragment is matched literally (no LIKE wildcards).
pub fn list_inpatients(
    conn: &Connection,
    name_filter: Option<&str>,
) -> Result<Vec<PatientSummary>, DatabaseError> {
    let needle = name_filter
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut stmt = conn.prepare(
        "SELECT id, name, priority, admitted_at FROM patients
         WHERE status = 'inpatient'
         ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        let priority: String = row.get(2)?;
        Ok(PatientSummary {
            id: row.get(0)?,
            name: row.get(1)?,
            priority: enum_column(2, &priority)?,
            admitted_at: row.get(3)?,
        })
    })?;
    let patients = rows.collect::<Result<Vec<_>, _>>()?;

    Ok(match needle {
        None => patients,
        Some(needle) => patients
            .into_iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .collect(),
    })
}

/// Discharged patients, most recent discharge first.
pub fn list_discharged(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE status = 'discharged'
         ORDER BY discharged_on DESC, id DESC"
    ))?;
    let rows = stmt.query_map([], row_to_patient)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Move an inpatient to `discharged`. Returns the number of rows changed
/// (0 when the patient is missing or already discharged).
pub fn mark_discharged(
    conn: &Connection,
    id: i64,
    discharged_on: NaiveDate,
    discharged_by: &str,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE patients SET status = 'discharged', discharged_on = ?1, discharged_by = ?2
         WHERE id = ?3 AND status = 'inpatient'",
        params![
            discharged_on.format(DATE_FORMAT).to_string(),
            discharged_by,
            id
        ],
    )?;
    Ok(affected)
}

fn row_to_patient(row: &rusqlite::Row) -> Result<Patient, rusqlite::Error> {
    let priority: String = row.get(7)?;
    let status: String = row.get(8)?;
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        birth_date: row.get(2)?,
        cep: row.get(3)?,
        address: row.get(4)?,
        district: row.get(5)?,
        procedure: row.get(6)?,
        priority: enum_column(7, &priority)?,
        status: enum_column(8, &status)?,
        admitted_at: row.get(9)?,
        discharged_on: row.get(10)?,
        discharged_by: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::Priority;
    use chrono::NaiveDateTime;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).unwrap()
    }

    fn new_patient(name: &str) -> NewPatient {
        NewPatient {
            name: name.into(),
            birth_date: NaiveDate::from_ymd_opt(1970, 3, 9),
            cep: Some("01310-100".into()),
            address: Some("Av. Paulista, 1000".into()),
            district: Some("Bela Vista".into()),
            procedure: Some("Apendicectomia".into()),
            priority: Priority::Yellow,
            admitted_at: at("2024-05-01 10:30:00"),
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &new_patient("Ana Souza")).unwrap();
        let p = get_patient(&conn, id).unwrap().unwrap();
        assert_eq!(p.name, "Ana Souza");
        assert_eq!(p.status, PatientStatus::Inpatient);
        assert_eq!(p.priority, Priority::Yellow);
        assert_eq!(p.birth_date, NaiveDate::from_ymd_opt(1970, 3, 9));
        assert_eq!(p.admitted_at, at("2024-05-01 10:30:00"));
        assert!(p.discharged_on.is_none());
    }

    #[test]
    fn inpatient_filter_is_case_insensitive() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &new_patient("Bruno Lima")).unwrap();
        insert_patient(&conn, &new_patient("Ana Souza")).unwrap();

        let all = list_inpatients(&conn, None).unwrap();
        assert_eq!(all.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["Ana Souza", "Bruno Lima"]);

        let filtered = list_inpatients(&conn, Some("LIMA")).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Bruno Lima");

        let blank = list_inpatients(&conn, Some("   ")).unwrap();
        assert_eq!(blank.len(), 2);
    }

    #[test]
    fn inpatient_filter_folds_accented_names() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &new_patient("Álvaro Souza")).unwrap();
        insert_patient(&conn, &new_patient("João Conceição")).unwrap();

        for query in ["Álvaro", "álvaro", "ÁLVARO"] {
            let hits = list_inpatients(&conn, Some(query)).unwrap();
            assert_eq!(hits.len(), 1, "{query}");
            assert_eq!(hits[0].name, "Álvaro Souza");
        }
        assert_eq!(list_inpatients(&conn, Some("CONCEIÇÃO")).unwrap().len(), 1);
    }

    #[test]
    fn inpatient_filter_treats_wildcards_literally() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &new_patient("Ana Souza")).unwrap();
        insert_patient(&conn, &new_patient("Bruno Lima")).unwrap();

        assert!(list_inpatients(&conn, Some("%")).unwrap().is_empty());
        assert!(list_inpatients(&conn, Some("_")).unwrap().is_empty());
    }

    #[test]
    fn discharge_only_applies_to_inpatients() {
        let conn = open_memory_database().unwrap();
        let id = insert_patient(&conn, &new_patient("Ana Souza")).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();

        assert_eq!(mark_discharged(&conn, id, day, "admin").unwrap(), 1);
        assert_eq!(mark_discharged(&conn, id, day, "admin").unwrap(), 0);
        assert_eq!(mark_discharged(&conn, 404, day, "admin").unwrap(), 0);

        let p = get_patient(&conn, id).unwrap().unwrap();
        assert_eq!(p.status, PatientStatus::Discharged);
        assert_eq!(p.discharged_on, Some(day));
        assert_eq!(p.discharged_by.as_deref(), Some("admin"));
        assert!(list_inpatients(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn discharged_list_newest_first() {
        let conn = open_memory_database().unwrap();
        let a = insert_patient(&conn, &new_patient("A")).unwrap();
        let b = insert_patient(&conn, &new_patient("B")).unwrap();
        mark_discharged(&conn, a, NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(), "x").unwrap();
        mark_discharged(&conn, b, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(), "x").unwrap();

        let list = list_discharged(&conn).unwrap();
        assert_eq!(list[0].id, a);
        assert_eq!(list[1].id, b);
    }
}
