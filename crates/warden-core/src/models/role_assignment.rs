//! Role assignment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::app_scope::AppScope;
use super::role::Role;

/// "This profile holds this role within this scope."
///
/// Either relation is `None` when it did not resolve at assignment time
/// or has since been deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: Uuid,
    /// Opaque external identifier, not a key into this engine.
    pub profile_id: String,
    pub app_scope: Option<AppScope>,
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRole {
    pub profile_id: String,
    pub role_id: Uuid,
    pub app_scope_id: Uuid,
}
