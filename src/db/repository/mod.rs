//! Repository layer — entity-scoped database operations.
//!
//! One sub-module per table; everything is re-exported here.

mod audit;
mod inventory;
mod medication;
mod patient;
mod user;
mod vital_sign;

pub use audit::*;
pub use inventory::*;
pub use medication::*;
pub use patient::*;
pub use user::*;
pub use vital_sign::*;
