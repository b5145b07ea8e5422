//! Dashboard endpoint.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::dashboard;

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub year: Option<i32>,
}

/// `GET /api/dashboard` — counts and charts for the landing page.
pub async fn overview(
    State(ctx): State<ApiContext>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<dashboard::Dashboard>, ApiError> {
    let conn = ctx.core.open_db()?;
    let now = chrono::Local::now().naive_local();
    let data = dashboard::build(&conn, now, query.year, ctx.core.config.low_stock_threshold)?;
    Ok(Json(data))
}
