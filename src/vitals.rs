//! Proof-of-life checks: timestamped vital-sign observations.

use rusqlite::Connection;
use serde::Deserialize;

use crate::admission::parse_timestamp;
use crate::db::{self, DatabaseError};
use crate::models::{NewVitalCheck, PatientStatus, VitalCheckEntry};

/// Default page size for the history view.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const MAX_HISTORY_LIMIT: u32 = 500;

#[derive(Debug, thiserror::Error)]
pub enum VitalsError {
    #[error("{0}")]
    Validation(String),
    #[error("Patient not found: {0}")]
    PatientNotFound(i64),
    #[error("Patient {0} is not an inpatient")]
    NotInpatient(i64),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Body of a proof-of-life request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VitalCheckForm {
    pub patient_id: i64,
    pub recorded_at: String,
    #[serde(default)]
    pub blood_pressure: Option<String>,
    #[serde(default)]
    pub glucose: Option<f64>,
    #[serde(default)]
    pub saturation: Option<f64>,
    #[serde(default)]
    pub heart_rate: Option<i64>,
    /// Defaults to the logged-in user.
    #[serde(default)]
    pub performed_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Record a check for an inpatient. Returns the new row id.
pub fn record_vital_check(
    conn: &Connection,
    form: &VitalCheckForm,
    session_user: &str,
) -> Result<i64, VitalsError> {
    let recorded_at = parse_timestamp(&form.recorded_at)
        .ok_or_else(|| VitalsError::Validation("Invalid check time".into()))?;

    let patient = db::get_patient(conn, form.patient_id)?
        .ok_or(VitalsError::PatientNotFound(form.patient_id))?;
    if patient.status != PatientStatus::Inpatient {
        return Err(VitalsError::NotInpatient(form.patient_id));
    }

    for (label, value) in [("glucose", form.glucose), ("saturation", form.saturation)] {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            return Err(VitalsError::Validation(format!("Invalid {label}")));
        }
    }
    if form.heart_rate.is_some_and(|bpm| bpm < 0) {
        return Err(VitalsError::Validation("Invalid heart rate".into()));
    }

    let performed_by = text(form.performed_by.as_deref()).unwrap_or_else(|| session_user.to_string());
    let id = db::insert_vital_check(
        conn,
        &NewVitalCheck {
            patient_id: form.patient_id,
            recorded_at,
            blood_pressure: text(form.blood_pressure.as_deref()),
            glucose: form.glucose,
            saturation: form.saturation,
            heart_rate: form.heart_rate,
            performed_by: Some(performed_by),
            notes: text(form.notes.as_deref()),
        },
    )?;

    tracing::info!(patient_id = form.patient_id, check_id = id, "Vital check recorded");
    Ok(id)
}

/// Recent checks, newest first, optionally for a single patient.
pub fn list_recent(
    conn: &Connection,
    patient_id: Option<i64>,
    limit: Option<u32>,
) -> Result<Vec<VitalCheckEntry>, VitalsError> {
    let limit = limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    Ok(db::recent_vital_checks(conn, patient_id, limit)?)
}

fn text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
