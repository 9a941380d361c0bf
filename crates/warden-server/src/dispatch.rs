//! Routes decoded commands to the repositories and the evaluator.

use serde::Serialize;
use serde_json::Value;
use surrealdb::{Connection, Surreal};
use tracing::debug;
use warden_core::error::{WardenError, WardenResult};
use warden_core::repository::{
    AppScopeRepository, PermissionRepository, RoleAssignmentRepository, RoleRepository,
};
use warden_core::PermissionEvaluator;
use warden_db::repository::{
    SurrealAppScopeRepository, SurrealPermissionRepository, SurrealRoleAssignmentRepository,
    SurrealRoleRepository,
};

use crate::command::Command;

fn to_json<T: Serialize>(value: T) -> WardenResult<Value> {
    serde_json::to_value(value).map_err(|e| WardenError::Internal(e.to_string()))
}

/// Handles named commands against one SurrealDB handle.
#[derive(Clone)]
pub struct Dispatcher<C: Connection> {
    app_scopes: SurrealAppScopeRepository<C>,
    permissions: SurrealPermissionRepository<C>,
    roles: SurrealRoleRepository<C>,
    assignments: SurrealRoleAssignmentRepository<C>,
    evaluator: PermissionEvaluator<SurrealRoleAssignmentRepository<C>>,
}

impl<C: Connection> Dispatcher<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            app_scopes: SurrealAppScopeRepository::new(db.clone()),
            permissions: SurrealPermissionRepository::new(db.clone()),
            roles: SurrealRoleRepository::new(db.clone()),
            assignments: SurrealRoleAssignmentRepository::new(db.clone()),
            evaluator: PermissionEvaluator::new(SurrealRoleAssignmentRepository::new(db)),
        }
    }

    pub async fn dispatch(&self, name: &str, payload: Value) -> WardenResult<Value> {
        let command = Command::parse(name, payload)?;
        debug!(command = name, "Dispatching");
        self.execute(command).await
    }

    pub async fn execute(&self, command: Command) -> WardenResult<Value> {
        match command {
            Command::CreateAppScope(input) => to_json(self.app_scopes.create(input).await?),
            Command::GetAppScope(id) => to_json(self.app_scopes.get_by_id(id).await?),
            Command::GetAppScopeByName(name) => {
                to_json(self.app_scopes.get_by_name(&name).await?)
            }
            Command::ListAppScopes(filter) => to_json(self.app_scopes.list(filter).await?.items),
            Command::UpdateAppScope(patch) => {
                to_json(self.app_scopes.update(patch.id, patch.changes).await?)
            }
            Command::DeleteAppScope(id) => to_json(self.app_scopes.delete(id).await?),

            Command::CreatePermission(input) => to_json(self.permissions.create(input).await?),
            Command::GetPermission(id) => to_json(self.permissions.get_by_id(id).await?),
            Command::ListPermissions(filter) => {
                to_json(self.permissions.list(filter).await?.items)
            }
            Command::UpdatePermission(patch) => {
                to_json(self.permissions.update(patch.id, patch.changes).await?)
            }
            Command::DeletePermission(id) => to_json(self.permissions.delete(id).await?),

            Command::CreateRole(input) => to_json(self.roles.create(input).await?),
            Command::GetRole(id) => to_json(self.roles.get_by_id(id).await?),
            Command::GetRoleByName(query) => to_json(
                self.roles
                    .get_by_name(&query.name, query.app_scope.as_deref())
                    .await?,
            ),
            Command::ListRoles(filter) => to_json(self.roles.list(filter).await?.items),
            Command::UpdateRole(patch) => {
                to_json(self.roles.update(patch.id, patch.changes).await?)
            }
            Command::DeleteRole(id) => to_json(self.roles.delete(id).await?),
            Command::AddPermission(grant) => to_json(
                self.roles
                    .add_permission(grant.role_id, grant.permission_id)
                    .await?,
            ),
            Command::RemovePermission(grant) => to_json(
                self.roles
                    .remove_permission(grant.role_id, grant.permission_id)
                    .await?,
            ),
            Command::Assign(input) => to_json(self.assignments.assign(input).await?),
            Command::Unassign(input) => {
                to_json(self.assignments.unassign(input.assignment_id).await?)
            }
            Command::GetUserRoles(query) => to_json(
                self.assignments
                    .get_user_roles(&query.profile_id, query.app_scope_id)
                    .await?,
            ),
            Command::CheckPermission(check) => {
                to_json(self.evaluator.check_permission(&check).await?)
            }
        }
    }
}
