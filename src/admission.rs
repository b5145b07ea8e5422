//! Patient admission, medication administration and discharge.
//!
//! An admission writes the patient row, every initial medication line and
//! the matching stock decrements in a single transaction. A failure at
//! any step leaves the database untouched.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{self, DatabaseError, DATE_FORMAT};
use crate::models::{
    MedicationAdministration, NewAdministration, NewPatient, Patient, PatientStatus,
    PatientSummary, Priority, VitalCheck,
};
use crate::stock;

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("{0}")]
    Validation(String),
    #[error("Patient not found: {0}")]
    PatientNotFound(i64),
    #[error("Patient {0} is not an inpatient")]
    NotInpatient(i64),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for AdmissionError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(e))
    }
}

// ═══════════════════════════════════════════════════════════
// Request types
// ═══════════════════════════════════════════════════════════

/// Body of an admission request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdmissionForm {
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub cep: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub procedure: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub admitted_at: String,
    #[serde(default)]
    pub medications: Vec<MedicationLine>,
}

/// One medication given to a patient.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicationLine {
    pub name: String,
    /// Dose as typed. Empty means zero.
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub as_needed: bool,
    /// Register the name in the stock ledger (at zero) if it is not there yet.
    #[serde(default)]
    pub new_item: bool,
    /// Defaults to the admission time, or now for later administrations.
    #[serde(default)]
    pub administered_at: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Response types
// ═══════════════════════════════════════════════════════════

/// Everything recorded for one patient.
#[derive(Debug, Clone, Serialize)]
pub struct PatientRecord {
    pub patient: Patient,
    pub vital_checks: Vec<VitalCheck>,
    pub administrations: Vec<MedicationAdministration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdmissionOutcome {
    pub patient_id: i64,
    pub administrations: usize,
}

// ═══════════════════════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════════════════════

/// Admit a patient together with the initial medication lines.
pub fn admit(
    conn: &Connection,
    form: &AdmissionForm,
    actor: &str,
) -> Result<AdmissionOutcome, AdmissionError> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(AdmissionError::Validation("Patient name is required".into()));
    }
    let admitted_at = parse_timestamp(&form.admitted_at)
        .ok_or_else(|| AdmissionError::Validation("Invalid admission time".into()))?;

    let patient = NewPatient {
        name: name.to_string(),
        birth_date: form.birth_date.as_deref().and_then(parse_date),
        cep: form.cep.as_deref().and_then(normalize_cep),
        address: join_address(form.street.as_deref(), form.number.as_deref()),
        district: non_empty(form.district.as_deref()),
        procedure: non_empty(form.procedure.as_deref()),
        priority: form.priority.unwrap_or_default(),
        admitted_at,
    };

    let tx = conn.unchecked_transaction()?;
    let patient_id = db::insert_patient(&tx, &patient)?;

    let mut administrations = 0;
    for line in &form.medications {
        if record_line(&tx, patient_id, line, admitted_at, actor)? {
            administrations += 1;
        }
    }
    tx.commit()?;

    tracing::info!(patient_id, administrations, by = actor, "Patient admitted");
    Ok(AdmissionOutcome {
        patient_id,
        administrations,
    })
}

/// Record one more administration for a current inpatient.
pub fn administer(
    conn: &Connection,
    patient_id: i64,
    line: &MedicationLine,
    actor: &str,
    now: NaiveDateTime,
) -> Result<(), AdmissionError> {
    let patient = db::get_patient(conn, patient_id)?.ok_or(AdmissionError::PatientNotFound(patient_id))?;
    if patient.status != PatientStatus::Inpatient {
        return Err(AdmissionError::NotInpatient(patient_id));
    }
    if line.name.trim().is_empty() {
        return Err(AdmissionError::Validation("Medication name is required".into()));
    }

    let tx = conn.unchecked_transaction()?;
    record_line(&tx, patient_id, line, now, actor)?;
    tx.commit()?;
    Ok(())
}

/// Discharge an inpatient. Missing or already-discharged patients are
/// reported as not found.
pub fn discharge(
    conn: &Connection,
    patient_id: i64,
    actor: &str,
    today: NaiveDate,
) -> Result<(), AdmissionError> {
    if db::mark_discharged(conn, patient_id, today, actor)? == 0 {
        return Err(AdmissionError::PatientNotFound(patient_id));
    }
    tracing::info!(patient_id, by = actor, "Patient discharged");
    Ok(())
}

pub fn list_inpatients(
    conn: &Connection,
    search: Option<&str>,
) -> Result<Vec<PatientSummary>, AdmissionError> {
    Ok(db::list_inpatients(conn, search)?)
}

pub fn list_discharged(conn: &Connection) -> Result<Vec<Patient>, AdmissionError> {
    Ok(db::list_discharged(conn)?)
}

pub fn record_detail(conn: &Connection, patient_id: i64) -> Result<PatientRecord, AdmissionError> {
    let patient = db::get_patient(conn, patient_id)?.ok_or(AdmissionError::PatientNotFound(patient_id))?;
    Ok(PatientRecord {
        patient,
        vital_checks: db::vital_checks_for_patient(conn, patient_id)?,
        administrations: db::administrations_for_patient(conn, patient_id)?,
    })
}

/// Medication names offered on the admission form.
pub fn form_options(conn: &Connection) -> Result<Vec<String>, AdmissionError> {
    Ok(stock::available_medications(conn)?)
}

/// Returns `false` when the line carries no medication name.
fn record_line(
    conn: &Connection,
    patient_id: i64,
    line: &MedicationLine,
    default_at: NaiveDateTime,
    actor: &str,
) -> Result<bool, AdmissionError> {
    let name = line.name.trim();
    if name.is_empty() {
        return Ok(false);
    }
    let administered_at = match line.administered_at.as_deref().map(str::trim) {
        None | Some("") => default_at,
        Some(raw) => parse_timestamp(raw)
            .ok_or_else(|| AdmissionError::Validation("Invalid administration time".into()))?,
    };

    if line.new_item {
        // Registration time, not the administration time
        let registered_at = chrono::Local::now().naive_local();
        db::ensure_stock_item(conn, name, &registered_at)?;
    }

    let dose = parse_dose(line.dose.as_deref())?;
    db::insert_administration(
        conn,
        &NewAdministration {
            patient_id,
            medication_name: name.to_string(),
            quantity: dose,
            as_needed: line.as_needed,
            administered_at,
            administered_by: Some(actor.to_string()),
        },
    )?;
    stock::consume(conn, name, dose)?;
    Ok(true)
}

// ═══════════════════════════════════════════════════════════
// Field parsing
// ═══════════════════════════════════════════════════════════

/// Parse `YYYY-MM-DDTHH:MM[:SS]` or `YYYY-MM-DD HH:MM[:SS]`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let normalized = raw.trim().replacen('T', " ", 1);
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

fn parse_dose(raw: Option<&str>) -> Result<f64, AdmissionError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(0.0),
        Some(s) => s
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| AdmissionError::Validation(format!("Invalid dose: {s}"))),
    }
}

/// Format eight-digit postal codes as `NNNNN-NNN`. Anything else is kept as typed.
fn normalize_cep(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 8 {
        Some(format!("{}-{}", &digits[..5], &digits[5..]))
    } else {
        Some(trimmed.to_string())
    }
}

fn join_address(street: Option<&str>, number: Option<&str>) -> Option<String> {
    match (non_empty(street), non_empty(number)) {
        (Some(s), Some(n)) => Some(format!("{s}, {n}")),
        (Some(s), None) => Some(s),
        (None, Some(n)) => Some(n),
        (None, None) => None,
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_stock_item, open_memory_database, DATETIME_FORMAT};
    use crate::stock::{restock, Restock};

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).unwrap()
    }

    fn stocked(name: &str, qty: i64) -> Connection {
        let conn = open_memory_database().unwrap();
        restock(
            &conn,
            &Restock {
                medication_name: name.into(),
                quantity: qty,
                unit: None,
            },
            &at("2024-01-01 00:00:00"),
        )
        .unwrap();
        conn
    }

    fn form(meds: Vec<MedicationLine>) -> AdmissionForm {
        AdmissionForm {
            name: "Ana Souza".into(),
            birth_date: Some("1980-02-29".into()),
            cep: Some("01310100".into()),
            street: Some("Av. Paulista".into()),
            number: Some("1000".into()),
            district: Some("Bela Vista".into()),
            procedure: Some("Apendicectomia".into()),
            priority: Some(Priority::Yellow),
            admitted_at: "2024-03-10T14:30".into(),
            medications: meds,
        }
    }

    fn line(name: &str, dose: &str) -> MedicationLine {
        MedicationLine {
            name: name.into(),
            dose: Some(dose.into()),
            ..Default::default()
        }
    }

    #[test]
    fn admit_stores_patient_and_decrements_stock() {
        let conn = stocked("Dipirona", 10);
        let outcome = admit(&conn, &form(vec![line("Dipirona", "2.4")]), "maria").unwrap();
        assert_eq!(outcome.administrations, 1);

        let record = record_detail(&conn, outcome.patient_id).unwrap();
        let p = &record.patient;
        assert_eq!(p.status, PatientStatus::Inpatient);
        assert_eq!(p.priority, Priority::Yellow);
        assert_eq!(p.cep.as_deref(), Some("01310-100"));
        assert_eq!(p.address.as_deref(), Some("Av. Paulista, 1000"));
        assert_eq!(p.admitted_at, at("2024-03-10 14:30:00"));
        assert_eq!(p.birth_date, NaiveDate::from_ymd_opt(1980, 2, 29));

        assert_eq!(record.administrations.len(), 1);
        assert_eq!(record.administrations[0].quantity, 2.4);
        assert_eq!(record.administrations[0].administered_by.as_deref(), Some("maria"));
        assert_eq!(get_stock_item(&conn, "Dipirona").unwrap().unwrap().quantity, 8);
    }

    #[test]
    fn invalid_birth_date_is_stored_as_null() {
        let conn = open_memory_database().unwrap();
        let mut f = form(vec![]);
        f.birth_date = Some("10/03/1980".into());
        f.priority = None;
        let id = admit(&conn, &f, "maria").unwrap().patient_id;
        let p = db::get_patient(&conn, id).unwrap().unwrap();
        assert!(p.birth_date.is_none());
        assert_eq!(p.priority, Priority::Green);
    }

    #[test]
    fn invalid_dose_rolls_back_everything() {
        let conn = stocked("Dipirona", 10);
        let err = admit(
            &conn,
            &form(vec![line("Dipirona", "1"), line("Dipirona", "dois")]),
            "maria",
        )
        .unwrap_err();
        assert!(matches!(err, AdmissionError::Validation(_)));

        assert!(list_inpatients(&conn, None).unwrap().is_empty());
        assert_eq!(get_stock_item(&conn, "Dipirona").unwrap().unwrap().quantity, 10);
    }

    #[test]
    fn invalid_admission_time_is_rejected() {
        let conn = open_memory_database().unwrap();
        let mut f = form(vec![]);
        f.admitted_at = "yesterday".into();
        assert!(matches!(admit(&conn, &f, "maria"), Err(AdmissionError::Validation(_))));
    }

    #[test]
    fn new_item_is_registered_at_zero() {
        let conn = open_memory_database().unwrap();
        let new_med = MedicationLine {
            new_item: true,
            ..line("Tramadol", "1")
        };
        // Stored timestamps have whole-second precision
        let before = chrono::Local::now().naive_local() - chrono::Duration::seconds(1);
        admit(&conn, &form(vec![new_med]), "maria").unwrap();

        let item = get_stock_item(&conn, "Tramadol").unwrap().unwrap();
        assert_eq!(item.quantity, 0);
        assert_eq!(item.unit.as_deref(), Some("UN"));
        // Stamped with the wall clock, not the (past) admission time
        assert!(item.last_restock_at.unwrap() >= before);
    }

    #[test]
    fn unknown_medication_does_not_fail() {
        let conn = open_memory_database().unwrap();
        let outcome = admit(&conn, &form(vec![line("Fantasma", "3")]), "maria").unwrap();
        assert_eq!(outcome.administrations, 1);
        assert!(get_stock_item(&conn, "Fantasma").unwrap().is_none());
    }

    #[test]
    fn blank_lines_are_skipped() {
        let conn = stocked("Dipirona", 10);
        let outcome = admit(
            &conn,
            &form(vec![line("  ", "5"), line("Dipirona", "")]),
            "maria",
        )
        .unwrap();
        assert_eq!(outcome.administrations, 1);
        assert_eq!(get_stock_item(&conn, "Dipirona").unwrap().unwrap().quantity, 10);
    }

    #[test]
    fn discharge_once() {
        let conn = open_memory_database().unwrap();
        let id = admit(&conn, &form(vec![]), "maria").unwrap().patient_id;
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        discharge(&conn, id, "joao", today).unwrap();
        assert!(matches!(
            discharge(&conn, id, "joao", today),
            Err(AdmissionError::PatientNotFound(_))
        ));
        assert!(matches!(
            discharge(&conn, 999, "joao", today),
            Err(AdmissionError::PatientNotFound(_))
        ));

        let archived = list_discharged(&conn).unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].discharged_on, Some(today));
        assert_eq!(archived[0].discharged_by.as_deref(), Some("joao"));
        assert!(list_inpatients(&conn, None).unwrap().is_empty());
    }

    #[test]
    fn administer_requires_inpatient() {
        let conn = stocked("Dipirona", 10);
        let id = admit(&conn, &form(vec![]), "maria").unwrap().patient_id;
        let now = at("2024-03-11 09:00:00");

        administer(&conn, id, &line("Dipirona", "3"), "maria", now).unwrap();
        assert_eq!(get_stock_item(&conn, "Dipirona").unwrap().unwrap().quantity, 7);
        let record = record_detail(&conn, id).unwrap();
        assert_eq!(record.administrations[0].administered_at, now);

        discharge(&conn, id, "joao", now.date()).unwrap();
        assert!(matches!(
            administer(&conn, id, &line("Dipirona", "1"), "maria", now),
            Err(AdmissionError::NotInpatient(_))
        ));
        assert!(matches!(
            administer(&conn, 404, &line("Dipirona", "1"), "maria", now),
            Err(AdmissionError::PatientNotFound(404))
        ));
    }

    #[test]
    fn record_detail_missing_patient() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            record_detail(&conn, 1),
            Err(AdmissionError::PatientNotFound(1))
        ));
    }

    #[test]
    fn timestamp_formats() {
        assert_eq!(parse_timestamp("2024-03-10T14:30"), Some(at("2024-03-10 14:30:00")));
        assert_eq!(parse_timestamp("2024-03-10 14:30:15"), Some(at("2024-03-10 14:30:15")));
        assert_eq!(parse_timestamp("2024-03-10"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn cep_and_address_normalization() {
        assert_eq!(normalize_cep("01310-100").as_deref(), Some("01310-100"));
        assert_eq!(normalize_cep(" 01310100 ").as_deref(), Some("01310-100"));
        assert_eq!(normalize_cep("123").as_deref(), Some("123"));
        assert_eq!(normalize_cep("  "), None);
        assert_eq!(join_address(Some("Rua A"), Some("")).as_deref(), Some("Rua A"));
        assert_eq!(join_address(None, None), None);
    }

    #[test]
    fn dose_parsing() {
        assert_eq!(parse_dose(None).unwrap(), 0.0);
        assert_eq!(parse_dose(Some(" ")).unwrap(), 0.0);
        assert_eq!(parse_dose(Some("1,5")).unwrap(), 1.5);
        assert!(parse_dose(Some("-1")).is_err());
        assert!(parse_dose(Some("abc")).is_err());
    }
}
