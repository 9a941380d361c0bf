//! SurrealDB implementation of [`RoleAssignmentRepository`].

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::app_scope::AppScope;
use warden_core::models::role::Role;
use warden_core::models::role_assignment::{AssignRole, RoleAssignment};
use warden_core::repository::RoleAssignmentRepository;

use super::app_scope::{self, AppScopeRowWithId};
use super::permission::PermissionRowWithId;
use super::role::{self, RoleRowWithId};
use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AssignmentRowWithId {
    record_id: String,
    profile_id: String,
    role_id: Option<String>,
    app_scope_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl AssignmentRowWithId {
    fn into_assignment(
        self,
        scopes: &HashMap<String, AppScope>,
        roles: &HashMap<String, Role>,
    ) -> Result<RoleAssignment, DbError> {
        Ok(RoleAssignment {
            id: parse_uuid(&self.record_id, "role assignment")?,
            app_scope: self.app_scope_id.and_then(|id| scopes.get(&id).cloned()),
            role: self.role_id.and_then(|id| roles.get(&id).cloned()),
            profile_id: self.profile_id,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct AssignmentRow {
    profile_id: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct GrantRow {
    role_id: String,
    permission_id: String,
}

/// A profile's assignments with every relation they reach, read by one
/// statement.
#[derive(Debug, SurrealValue)]
struct HeldRoles {
    assignments: Vec<AssignmentRowWithId>,
    roles: Vec<RoleRowWithId>,
    grants: Vec<GrantRow>,
    permissions: Vec<PermissionRowWithId>,
    scopes: Vec<AppScopeRowWithId>,
}

impl HeldRoles {
    /// `held` is the `FROM ... WHERE ...` tail selecting the assignments.
    fn query(held: &str) -> String {
        format!(
            "RETURN {{ \
             assignments: (SELECT meta::id(id) AS record_id, * {held} ORDER BY created_at ASC), \
             roles: (SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE meta::id(id) IN (SELECT VALUE role_id {held})), \
             grants: (SELECT meta::id(in) AS role_id, meta::id(out) AS permission_id \
                 FROM role_permission \
                 WHERE meta::id(in) IN (SELECT VALUE role_id {held})), \
             permissions: (SELECT meta::id(id) AS record_id, * FROM permission \
                 WHERE id IN (\
                     SELECT VALUE out FROM role_permission \
                     WHERE meta::id(in) IN (SELECT VALUE role_id {held})\
                 ) \
                 ORDER BY created_at ASC), \
             scopes: (SELECT meta::id(id) AS record_id, * FROM app_scope \
                 WHERE meta::id(id) IN array::union(\
                     (SELECT VALUE app_scope_id {held}), \
                     (SELECT VALUE app_scope_id FROM role \
                         WHERE meta::id(id) IN (SELECT VALUE role_id {held}))\
                 )) \
             }};"
        )
    }

    fn assemble(self) -> Result<Vec<RoleAssignment>, DbError> {
        let scopes = self
            .scopes
            .into_iter()
            .map(|row| Ok((row.record_id.clone(), row.try_into_app_scope()?)))
            .collect::<Result<HashMap<_, _>, DbError>>()?;

        let permissions = self
            .permissions
            .into_iter()
            .map(|row| Ok((row.record_id.clone(), row.try_into_permission()?)))
            .collect::<Result<Vec<_>, DbError>>()?;

        let mut granted: HashMap<String, HashSet<String>> = HashMap::new();
        for grant in self.grants {
            granted
                .entry(grant.role_id)
                .or_default()
                .insert(grant.permission_id);
        }

        let mut roles = HashMap::with_capacity(self.roles.len());
        for row in self.roles {
            let held = granted.get(&row.record_id);
            let role = Role {
                id: parse_uuid(&row.record_id, "role")?,
                name: row.name,
                description: row.description,
                app_scope: row.app_scope_id.and_then(|id| scopes.get(&id).cloned()),
                permissions: permissions
                    .iter()
                    .filter(|(id, _)| held.is_some_and(|ids| ids.contains(id)))
                    .map(|(_, permission)| permission.clone())
                    .collect(),
                created_at: row.created_at,
                updated_at: row.updated_at,
            };
            roles.insert(row.record_id, role);
        }

        self.assignments
            .into_iter()
            .map(|row| row.into_assignment(&scopes, &roles))
            .collect()
    }
}

/// Assignments referencing a role, oldest first, with their app scope.
/// Their `role` field is left empty since the caller already holds the
/// role.
pub(crate) async fn load_for_role<C: Connection>(
    db: &Surreal<C>,
    role_id: &str,
) -> Result<Vec<RoleAssignment>, DbError> {
    let mut result = db
        .query(
            "RETURN { \
             assignments: (SELECT meta::id(id) AS record_id, * FROM role_assignment \
                 WHERE role_id = $role_id ORDER BY created_at ASC), \
             scopes: (SELECT meta::id(id) AS record_id, * FROM app_scope \
                 WHERE meta::id(id) IN (\
                     SELECT VALUE app_scope_id FROM role_assignment WHERE role_id = $role_id\
                 )) \
             };",
        )
        .bind(("role_id", role_id.to_owned()))
        .await?;

    let batch: Option<RoleAssignments> = result.take(0)?;
    let Some(batch) = batch else {
        return Ok(Vec::new());
    };
    let scopes = batch
        .scopes
        .into_iter()
        .map(|row| Ok((row.record_id.clone(), row.try_into_app_scope()?)))
        .collect::<Result<HashMap<_, _>, DbError>>()?;

    batch
        .assignments
        .into_iter()
        .map(|row| row.into_assignment(&scopes, &HashMap::new()))
        .collect()
}

#[derive(Debug, SurrealValue)]
struct RoleAssignments {
    assignments: Vec<AssignmentRowWithId>,
    scopes: Vec<AppScopeRowWithId>,
}

/// SurrealDB implementation of the RoleAssignment repository.
#[derive(Clone)]
pub struct SurrealRoleAssignmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleAssignmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleAssignmentRepository for SurrealRoleAssignmentRepository<C> {
    async fn assign(&self, input: AssignRole) -> WardenResult<RoleAssignment> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let role = role::load(&self.db, &input.role_id.to_string(), true).await?;
        let app_scope = app_scope::load(&self.db, &input.app_scope_id.to_string()).await?;
        if role.is_none() || app_scope.is_none() {
            debug!(
                role_id = %input.role_id,
                app_scope_id = %input.app_scope_id,
                role_found = role.is_some(),
                app_scope_found = app_scope.is_some(),
                "Assigning with unresolved reference"
            );
        }

        let result = self
            .db
            .query(
                "CREATE type::record('role_assignment', $id) SET \
                 profile_id = $profile_id, \
                 role_id = $role_id, app_scope_id = $app_scope_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("profile_id", input.profile_id))
            .bind(("role_id", role.as_ref().map(|r| r.id.to_string())))
            .bind(("app_scope_id", app_scope.as_ref().map(|s| s.id.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role_assignment", &id_str))?;

        debug!(assignment_id = %id, profile_id = %row.profile_id, "Assigned role");
        Ok(RoleAssignment {
            id,
            profile_id: row.profile_id,
            app_scope,
            role,
            created_at: row.created_at,
        })
    }

    async fn unassign(&self, assignment_id: Uuid) -> WardenResult<()> {
        self.db
            .query("DELETE type::record('role_assignment', $id)")
            .bind(("id", assignment_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_user_roles(
        &self,
        profile_id: &str,
        app_scope_id: Option<Uuid>,
    ) -> WardenResult<Vec<RoleAssignment>> {
        let held = if app_scope_id.is_some() {
            "FROM role_assignment \
             WHERE profile_id = $profile_id AND app_scope_id = $app_scope_id"
        } else {
            "FROM role_assignment WHERE profile_id = $profile_id"
        };

        let mut builder = self
            .db
            .query(HeldRoles::query(held))
            .bind(("profile_id", profile_id.to_owned()));
        if let Some(scope_id) = app_scope_id {
            builder = builder.bind(("app_scope_id", scope_id.to_string()));
        }
        let mut result = builder.await.map_err(DbError::from)?;

        let batch: Option<HeldRoles> = result.take(0).map_err(DbError::from)?;
        match batch {
            Some(batch) => Ok(batch.assemble()?),
            None => Ok(Vec::new()),
        }
    }
}
