use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single proof-of-life observation for a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalCheck {
    pub id: i64,
    pub patient_id: i64,
    pub recorded_at: NaiveDateTime,
    pub blood_pressure: Option<String>, // free text, e.g. "120/80"
    pub glucose: Option<f64>,
    pub saturation: Option<f64>,
    pub heart_rate: Option<i64>,
    pub performed_by: Option<String>,
    pub notes: Option<String>,
}

/// Fields required to insert a vital check.
#[derive(Debug, Clone)]
pub struct NewVitalCheck {
    pub patient_id: i64,
    pub recorded_at: NaiveDateTime,
    pub blood_pressure: Option<String>,
    pub glucose: Option<f64>,
    pub saturation: Option<f64>,
    pub heart_rate: Option<i64>,
    pub performed_by: Option<String>,
    pub notes: Option<String>,
}

/// Vital check joined with the patient's name, for the general history view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalCheckEntry {
    pub patient_name: String,
    #[serde(flatten)]
    pub check: VitalCheck,
}
