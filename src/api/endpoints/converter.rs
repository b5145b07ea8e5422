//! Drip conversion endpoint.

use axum::extract::Query;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::converter::{self, Conversion};

#[derive(Deserialize)]
pub struct ConverterQuery {
    pub ml: Option<f64>,
    pub drops: Option<f64>,
}

/// `GET /api/converter?ml=&drops=` — millilitres to drops and back.
pub async fn convert(Query(query): Query<ConverterQuery>) -> Result<Json<Conversion>, ApiError> {
    if query.ml.is_none() && query.drops.is_none() {
        return Err(ApiError::BadRequest("Provide ml or drops".into()));
    }
    Ok(Json(converter::convert(query.ml, query.drops)))
}
