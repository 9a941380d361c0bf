//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Single-entity lookups return
//! `Ok(None)` when nothing matches; deletes are no-ops on missing ids.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WardenResult;
use crate::filter::{AppScopeField, ListFilter, PermissionField, RoleField};
use crate::models::{
    app_scope::{AppScope, CreateAppScope, UpdateAppScope},
    permission::{CreatePermission, Permission, PermissionDetail, UpdatePermission},
    role::{CreateRole, Role, RoleDetail, UpdateRole},
    role_assignment::{AssignRole, RoleAssignment},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Registries
// ---------------------------------------------------------------------------

pub trait AppScopeRepository: Send + Sync {
    /// Fails with the store's constraint error if the name is taken.
    fn create(&self, input: CreateAppScope) -> impl Future<Output = WardenResult<AppScope>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Option<AppScope>>> + Send;
    fn get_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = WardenResult<Option<AppScope>>> + Send;
    fn list(
        &self,
        filter: ListFilter<AppScopeField>,
    ) -> impl Future<Output = WardenResult<PaginatedResult<AppScope>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateAppScope,
    ) -> impl Future<Output = WardenResult<AppScope>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = WardenResult<Permission>> + Send;
    /// Fetch a permission with the roles that hold it.
    fn get_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = WardenResult<Option<PermissionDetail>>> + Send;
    fn list(
        &self,
        filter: ListFilter<PermissionField>,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Permission>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = WardenResult<Permission>> + Send;
    /// Also detaches the permission from every role.
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    /// An unresolvable `app_scope_id` yields a role with no scope bound.
    fn create(&self, input: CreateRole) -> impl Future<Output = WardenResult<Role>> + Send;
    /// Fetch a role with its permissions, assignments and app scope.
    fn get_by_id(&self, id: Uuid)
    -> impl Future<Output = WardenResult<Option<RoleDetail>>> + Send;
    /// Look up a role by name, optionally requiring its app scope to have
    /// the given name.
    fn get_by_name(
        &self,
        name: &str,
        app_scope_name: Option<&str>,
    ) -> impl Future<Output = WardenResult<Option<Role>>> + Send;
    fn list(
        &self,
        filter: ListFilter<RoleField>,
    ) -> impl Future<Output = WardenResult<PaginatedResult<Role>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = WardenResult<Role>> + Send;
    /// Removes the role and its permission links. Assignments referencing
    /// it are kept and load with no role.
    fn delete(&self, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;

    /// Attach a permission. Attaching one that is already present is a no-op.
    fn add_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = WardenResult<Role>> + Send;

    /// Detach a permission. Detaching one that is not present is a no-op.
    fn remove_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = WardenResult<Role>> + Send;
}

pub trait RoleAssignmentRepository: Send + Sync {
    /// Unresolvable role or scope ids yield an assignment with a null
    /// relation rather than an error.
    fn assign(&self, input: AssignRole)
    -> impl Future<Output = WardenResult<RoleAssignment>> + Send;
    fn unassign(&self, assignment_id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    /// All assignments held by a profile, oldest first, with role
    /// permissions and app scope loaded. When `app_scope_id` is given only
    /// assignments bound to that scope are returned.
    fn get_user_roles(
        &self,
        profile_id: &str,
        app_scope_id: Option<Uuid>,
    ) -> impl Future<Output = WardenResult<Vec<RoleAssignment>>> + Send;
}
