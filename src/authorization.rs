//! Role hierarchy for staff accounts.
//!
//! Three roles, flat rules, default deny:
//! - Admin manages technicians and nurses, never other admins
//! - Technician manages nurses
//! - Nurse manages nobody and cannot touch stock or discharges
//!
//! Nothing here touches the database. Callers pass in the counts the
//! rules depend on.

use crate::models::Role;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Why an account operation was refused, for the audit trail and error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The actor's role has no management rights at all.
    NotManager,
    /// The actor may manage users, but not of this role.
    RoleNotCreatable { actor: Role, target: Role },
    /// Technician cap reached.
    TechnicianLimit { max: i64 },
    /// Admin accounts are never removable.
    AdminProtected,
    /// The actor may not remove accounts of this role.
    RoleNotDeletable { actor: Role, target: Role },
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotManager => write!(f, "Access restricted to administrators and technicians"),
            Self::RoleNotCreatable { actor, target } => {
                write!(f, "A {actor} cannot create {target} accounts")
            }
            Self::TechnicianLimit { max } => {
                write!(f, "Technician limit reached ({max})")
            }
            Self::AdminProtected => write!(f, "Administrator accounts cannot be deleted"),
            Self::RoleNotDeletable { actor, target } => {
                write!(f, "A {actor} cannot delete {target} accounts")
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Route-level checks
// ═══════════════════════════════════════════════════════════

/// Stock ledger, discharge and user management.
pub fn is_manager(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Technician)
}

pub fn require_manager(role: Role) -> Result<(), Denial> {
    if is_manager(role) {
        Ok(())
    } else {
        Err(Denial::NotManager)
    }
}

// ═══════════════════════════════════════════════════════════
// User management rules
// ═══════════════════════════════════════════════════════════

/// Roles whose accounts `actor` may list. `None` means all roles.
pub fn visible_roles(actor: Role) -> Result<Option<Role>, Denial> {
    match actor {
        Role::Admin => Ok(None),
        Role::Technician => Ok(Some(Role::Nurse)),
        Role::Nurse => Err(Denial::NotManager),
    }
}

/// Roles `actor` may create, in display order.
pub fn creatable_roles(actor: Role) -> &'static [Role] {
    match actor {
        Role::Admin => &[Role::Technician, Role::Nurse],
        Role::Technician => &[Role::Nurse],
        Role::Nurse => &[],
    }
}

/// Decide whether `actor` may create an account with role `target`.
///
/// `technician_count` is the number of technicians that already exist.
pub fn check_create(
    actor: Role,
    target: Role,
    technician_count: i64,
    max_technicians: i64,
) -> Result<(), Denial> {
    require_manager(actor)?;
    if !creatable_roles(actor).contains(&target) {
        return Err(Denial::RoleNotCreatable { actor, target });
    }
    if target == Role::Technician && technician_count >= max_technicians {
        return Err(Denial::TechnicianLimit {
            max: max_technicians,
        });
    }
    Ok(())
}

/// Decide whether `actor` may delete an account with role `target`.
pub fn check_delete(actor: Role, target: Role) -> Result<(), Denial> {
    require_manager(actor)?;
    match (actor, target) {
        (_, Role::Admin) => Err(Denial::AdminProtected),
        (Role::Admin, _) => Ok(()),
        (Role::Technician, Role::Nurse) => Ok(()),
        _ => Err(Denial::RoleNotDeletable { actor, target }),
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
