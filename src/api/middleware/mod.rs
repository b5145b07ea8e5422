//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Rate limiter — reject early, save resources
//! 2. Session auth — cookie lookup, idle refresh (protected routes only)
//! 3. Audit logger — logs after auth, has the username

pub mod audit;
pub mod auth;
pub mod rate;
