//! SurrealDB repository implementations.

mod app_scope;
mod permission;
mod role;
mod role_assignment;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

pub use app_scope::SurrealAppScopeRepository;
pub use permission::SurrealPermissionRepository;
pub use role::SurrealRoleRepository;
pub use role_assignment::SurrealRoleAssignmentRepository;

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::InvalidRecord(format!("invalid {what} UUID: {e}")))
}
