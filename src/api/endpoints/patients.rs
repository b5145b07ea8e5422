//! Patient endpoints.
//!
//! - `GET /api/patients` — current inpatients, optional name search
//! - `GET /api/patients/form` — options for the admission form
//! - `POST /api/patients` — admit a patient
//! - `GET /api/patients/:id` — full record
//! - `POST /api/patients/:id/discharge` — admin or technician only
//! - `POST /api/patients/:id/medications` — record an administration
//! - `GET /api/archive` — discharged patients

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::admission::{self, AdmissionForm, AdmissionOutcome, MedicationLine, PatientRecord};
use crate::api::endpoints::require_manager;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Patient, PatientSummary, Priority};
use crate::session_cache::StaffSession;

#[derive(Deserialize)]
pub struct PatientListQuery {
    pub search: Option<String>,
}

#[derive(Serialize)]
pub struct PatientsResponse {
    pub patients: Vec<PatientSummary>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct FormOptionsResponse {
    pub medications: Vec<String>,
    pub priorities: &'static [Priority],
}

#[derive(Serialize)]
pub struct ArchiveResponse {
    pub patients: Vec<Patient>,
}

#[derive(Serialize)]
pub struct DischargeResponse {
    pub patient_id: i64,
    pub discharged_on: chrono::NaiveDate,
    pub discharged_by: String,
}

/// `GET /api/patients` — inpatient list.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<PatientsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patients = admission::list_inpatients(&conn, query.search.as_deref())?;
    Ok(Json(PatientsResponse {
        total: patients.len(),
        patients,
    }))
}

/// `GET /api/patients/form` — medications in stock and triage priorities.
pub async fn form(State(ctx): State<ApiContext>) -> Result<Json<FormOptionsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(FormOptionsResponse {
        medications: admission::form_options(&conn)?,
        priorities: Priority::all(),
    }))
}

/// `POST /api/patients` — admission.
pub async fn admit(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<StaffSession>,
    Json(form): Json<AdmissionForm>,
) -> Result<(StatusCode, Json<AdmissionOutcome>), ApiError> {
    let conn = ctx.core.open_db()?;
    let outcome = admission::admit(&conn, &form, &session.username)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /api/patients/:id` — patient, vitals and medication history.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<PatientRecord>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(admission::record_detail(&conn, id)?))
}

/// `POST /api/patients/:id/discharge` — close an admission.
pub async fn discharge(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<StaffSession>,
    Path(id): Path<i64>,
) -> Result<Json<DischargeResponse>, ApiError> {
    require_manager(&session)?;
    let conn = ctx.core.open_db()?;
    let today = chrono::Local::now().date_naive();
    admission::discharge(&conn, id, &session.username, today)?;
    Ok(Json(DischargeResponse {
        patient_id: id,
        discharged_on: today,
        discharged_by: session.username,
    }))
}

/// `POST /api/patients/:id/medications` — give a dose to an inpatient.
pub async fn administer(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<StaffSession>,
    Path(id): Path<i64>,
    Json(line): Json<MedicationLine>,
) -> Result<(StatusCode, Json<PatientRecord>), ApiError> {
    let conn = ctx.core.open_db()?;
    let now = chrono::Local::now().naive_local();
    admission::administer(&conn, id, &line, &session.username, now)?;
    Ok((StatusCode::CREATED, Json(admission::record_detail(&conn, id)?)))
}

/// `GET /api/archive` — discharged patients, latest first.
pub async fn archive(State(ctx): State<ApiContext>) -> Result<Json<ArchiveResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(ArchiveResponse {
        patients: admission::list_discharged(&conn)?,
    }))
}
