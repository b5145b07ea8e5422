use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A dose of medication given to a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationAdministration {
    pub id: i64,
    pub patient_id: i64,
    pub medication_name: String,
    pub quantity: f64,
    pub as_needed: bool,
    pub administered_at: NaiveDateTime,
    pub administered_by: Option<String>,
}

/// Fields required to insert an administration row.
#[derive(Debug, Clone)]
pub struct NewAdministration {
    pub patient_id: i64,
    pub medication_name: String,
    pub quantity: f64,
    pub as_needed: bool,
    pub administered_at: NaiveDateTime,
    pub administered_by: Option<String>,
}
