//! Stock ledger endpoints (admin and technician only).

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::endpoints::require_manager;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::StockItem;
use crate::session_cache::StaffSession;
use crate::stock::{self, Restock};

#[derive(Serialize)]
pub struct StockResponse {
    pub items: Vec<StockItem>,
    pub low_stock_threshold: i64,
}

/// `GET /api/stock` — full ledger.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<StaffSession>,
) -> Result<Json<StockResponse>, ApiError> {
    require_manager(&session)?;
    let conn = ctx.core.open_db()?;
    Ok(Json(StockResponse {
        items: stock::list_stock(&conn)?,
        low_stock_threshold: ctx.core.config.low_stock_threshold,
    }))
}

/// `POST /api/stock` — restock or register a medication.
pub async fn restock(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<StaffSession>,
    Json(request): Json<Restock>,
) -> Result<Json<StockItem>, ApiError> {
    require_manager(&session)?;
    let conn = ctx.core.open_db()?;
    let now = chrono::Local::now().naive_local();
    Ok(Json(stock::restock(&conn, &request, &now)?))
}
