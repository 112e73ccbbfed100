//! User roles and the authorization policy
//!
//! Roles are a closed enum stored as TEXT in the `users` table. Handlers never
//! compare role strings directly; they go through the policy functions below.

use serde::{Deserialize, Serialize};

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Registered visitor with no firm attached
    Basic,
    /// Administrator of exactly one firm
    FirmAdmin,
    /// Portal operator
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Basic => "basic",
            Role::FirmAdmin => "firm_admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Parse from the stored column value; unknown values fall back to Basic
    /// rather than failing the whole row load.
    pub fn parse(value: &str) -> Role {
        match value {
            "firm_admin" => Role::FirmAdmin,
            "super_admin" => Role::SuperAdmin,
            _ => Role::Basic,
        }
    }
}

/// User account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> UserStatus {
        match value {
            "inactive" => UserStatus::Inactive,
            _ => UserStatus::Active,
        }
    }
}

/// Can the user manage other user accounts (list, change role/status)?
pub fn can_manage_users(role: Role) -> bool {
    role == Role::SuperAdmin
}

/// Can the user create firms, hard-delete them, or run maintenance
/// (import, dedup)?
pub fn can_administer_directory(role: Role) -> bool {
    role == Role::SuperAdmin
}

/// Can the user edit the given firm?
///
/// Super admins edit anything; a firm admin edits only the firm they own.
pub fn can_edit_firm(role: Role, own_firm: Option<&str>, firm_guid: &str) -> bool {
    match role {
        Role::SuperAdmin => true,
        Role::FirmAdmin => own_firm == Some(firm_guid),
        Role::Basic => false,
    }
}

/// Can the user review lead intake (approve price, discard)?
pub fn can_review_leads(role: Role) -> bool {
    role == Role::SuperAdmin
}

/// Can the user purchase a lead?
pub fn can_purchase_leads(role: Role) -> bool {
    matches!(role, Role::FirmAdmin | Role::SuperAdmin)
}

/// Can the user decide ownership requests?
pub fn can_decide_ownership(role: Role) -> bool {
    role == Role::SuperAdmin
}
