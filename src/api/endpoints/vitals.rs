//! Proof-of-life endpoints.
//!
//! - `GET /api/vitals` — recent checks, optionally for one patient
//! - `POST /api/vitals` — record a check

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{PatientSummary, VitalCheckEntry};
use crate::session_cache::StaffSession;
use crate::vitals::{self, VitalCheckForm};

#[derive(Deserialize)]
pub struct VitalsQuery {
    pub patient_id: Option<i64>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct VitalsResponse {
    pub checks: Vec<VitalCheckEntry>,
    /// Patients a new check can be recorded for.
    pub inpatients: Vec<PatientSummary>,
}

#[derive(Serialize)]
pub struct RecordedResponse {
    pub id: i64,
}

/// `GET /api/vitals` — history plus the inpatient pick list.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<VitalsQuery>,
) -> Result<Json<VitalsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(VitalsResponse {
        checks: vitals::list_recent(&conn, query.patient_id, query.limit)?,
        inpatients: crate::admission::list_inpatients(&conn, None)?,
    }))
}

/// `POST /api/vitals` — record a proof of life.
pub async fn record(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<StaffSession>,
    Json(form): Json<VitalCheckForm>,
) -> Result<(StatusCode, Json<RecordedResponse>), ApiError> {
    let conn = ctx.core.open_db()?;
    let id = vitals::record_vital_check(&conn, &form, &session.username)?;
    Ok((StatusCode::CREATED, Json(RecordedResponse { id })))
}
