//! API endpoint handlers.
//!
//! Each module corresponds to one screen of the ward application.
//! Handlers open a connection per request and delegate to the domain
//! modules.

pub mod auth;
pub mod converter;
pub mod dashboard;
pub mod health;
pub mod patients;
pub mod stock;
pub mod users;
pub mod vitals;

use crate::api::error::ApiError;
use crate::authorization;
use crate::session_cache::StaffSession;

/// Reject nurses from admin/technician screens.
pub(crate) fn require_manager(session: &StaffSession) -> Result<(), ApiError> {
    authorization::require_manager(session.role).map_err(|denial| {
        tracing::info!(username = %session.username, role = %session.role, "Manager-only route refused");
        ApiError::Forbidden(denial.to_string())
    })
}
