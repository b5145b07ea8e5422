pub mod enums;
pub mod inventory;
pub mod medication;
pub mod patient;
pub mod user;
pub mod vital_sign;

pub use enums::*;
pub use inventory::*;
pub use medication::*;
pub use patient::*;
pub use user::*;
pub use vital_sign::*;
