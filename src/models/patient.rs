use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::enums::{PatientStatus, Priority};

/// A patient record. Created on admission, closed on discharge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub cep: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub procedure: Option<String>,
    pub priority: Priority,
    pub status: PatientStatus,
    pub admitted_at: NaiveDateTime,
    pub discharged_on: Option<NaiveDate>,
    pub discharged_by: Option<String>,
}

/// Fields required to insert a new patient row.
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub cep: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub procedure: Option<String>,
    pub priority: Priority,
    pub admitted_at: NaiveDateTime,
}

/// Row shape for patient pick lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: i64,
    pub name: String,
    pub priority: Priority,
    pub admitted_at: NaiveDateTime,
}
