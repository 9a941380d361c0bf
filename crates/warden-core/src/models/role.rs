//! Role domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::app_scope::AppScope;
use super::permission::Permission;
use super::role_assignment::RoleAssignment;

/// A named bundle of permissions bound to one app scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// `None` when the scope id given at creation did not resolve.
    pub app_scope: Option<AppScope>,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn has_permission(&self, permission_id: Uuid) -> bool {
        self.permissions.iter().any(|p| p.id == permission_id)
    }
}

/// A role together with the assignments that reference it.
///
/// The assignments' `role` field is left empty; the owning role is the
/// enclosing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDetail {
    #[serde(flatten)]
    pub role: Role,
    pub assignments: Vec<RoleAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub description: String,
    pub app_scope_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Re-resolved and rebound when present.
    pub app_scope_id: Option<Uuid>,
}
