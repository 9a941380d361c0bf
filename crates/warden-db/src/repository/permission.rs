//! SurrealDB implementation of [`PermissionRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::filter::{ListFilter, PermissionField};
use warden_core::models::permission::{
    CreatePermission, Permission, PermissionDetail, UpdatePermission,
};
use warden_core::repository::{PaginatedResult, PermissionRepository};

use super::{CountRow, parse_uuid, role};
use crate::error::DbError;
use crate::filter::WhereClause;

/// Grant edges first, then the record, as one unit.
const DELETE_PERMISSION: &str = "\
BEGIN TRANSACTION;
DELETE role_permission WHERE out = type::record('permission', $id);
DELETE type::record('permission', $id);
COMMIT TRANSACTION;
";

#[derive(Debug, SurrealValue)]
struct PermissionRow {
    name: String,
    description: String,
    resource: String,
    action: String,
    target_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl PermissionRow {
    fn into_permission(self, id: Uuid) -> Permission {
        Permission {
            id,
            name: self.name,
            description: self.description,
            resource: self.resource,
            action: self.action,
            target_id: self.target_id,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
pub(crate) struct PermissionRowWithId {
    pub(crate) record_id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) resource: String,
    pub(crate) action: String,
    pub(crate) target_id: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
}

impl PermissionRowWithId {
    pub(crate) fn try_into_permission(self) -> Result<Permission, DbError> {
        Ok(Permission {
            id: parse_uuid(&self.record_id, "permission")?,
            name: self.name,
            description: self.description,
            resource: self.resource,
            action: self.action,
            target_id: self.target_id,
            created_at: self.created_at,
        })
    }
}

pub(crate) async fn load<C: Connection>(
    db: &Surreal<C>,
    id: &str,
) -> Result<Option<Permission>, DbError> {
    let mut result = db
        .query("SELECT meta::id(id) AS record_id, * FROM type::record('permission', $id)")
        .bind(("id", id.to_owned()))
        .await?;

    let rows: Vec<PermissionRowWithId> = result.take(0)?;
    rows.into_iter()
        .next()
        .map(PermissionRowWithId::try_into_permission)
        .transpose()
}

/// All permissions granted to a role, oldest first.
pub(crate) async fn load_for_role<C: Connection>(
    db: &Surreal<C>,
    role_id: &str,
) -> Result<Vec<Permission>, DbError> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * FROM permission \
             WHERE id IN (\
                 SELECT VALUE out FROM role_permission \
                 WHERE in = type::record('role', $role_id)\
             ) \
             ORDER BY created_at ASC",
        )
        .bind(("role_id", role_id.to_owned()))
        .await?;

    let rows: Vec<PermissionRowWithId> = result.take(0)?;
    rows.into_iter()
        .map(PermissionRowWithId::try_into_permission)
        .collect()
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> WardenResult<Permission> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('permission', $id) SET \
                 name = $name, description = $description, \
                 resource = $resource, action = $action, \
                 target_id = $target_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("resource", input.resource))
            .bind(("action", input.action))
            .bind(("target_id", input.target_id))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("permission", &id_str))?;

        debug!(permission_id = %id, name = %row.name, "Created permission");
        Ok(row.into_permission(id))
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Option<PermissionDetail>> {
        let id_str = id.to_string();
        let Some(permission) = load(&self.db, &id_str).await? else {
            return Ok(None);
        };
        let roles = role::load_holding(&self.db, &id_str).await?;

        Ok(Some(PermissionDetail { permission, roles }))
    }

    async fn list(
        &self,
        filter: ListFilter<PermissionField>,
    ) -> WardenResult<PaginatedResult<Permission>> {
        filter.validate()?;
        let clause = WhereClause::render(&filter);

        let count_query = format!(
            "SELECT count() AS total FROM permission {} GROUP ALL",
            clause.sql
        );
        let mut count_result = clause
            .bind(self.db.query(count_query))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM permission {} \
             ORDER BY created_at ASC \
             LIMIT $limit START $offset",
            clause.sql
        );
        let mut result = clause
            .bind(self.db.query(query))
            .bind(("limit", filter.pagination.limit))
            .bind(("offset", filter.pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(PermissionRowWithId::try_into_permission)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: filter.pagination.offset,
            limit: filter.pagination.limit,
        })
    }

    async fn update(&self, id: Uuid, input: UpdatePermission) -> WardenResult<Permission> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.resource.is_some() {
            sets.push("resource = $resource");
        }
        if input.action.is_some() {
            sets.push("action = $action");
        }
        // target_id is Option<Option<String>>: Some(Some(v)) = set, Some(None) = clear
        match &input.target_id {
            Some(Some(_)) => sets.push("target_id = $target_id"),
            Some(None) => sets.push("target_id = NONE"),
            None => {}
        }

        // Permissions carry no updated_at, so a no-op update must still be
        // a valid statement.
        let query = if sets.is_empty() {
            "SELECT * FROM type::record('permission', $id)".to_owned()
        } else {
            format!(
                "UPDATE type::record('permission', $id) SET {}",
                sets.join(", ")
            )
        };

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(resource) = input.resource {
            builder = builder.bind(("resource", resource));
        }
        if let Some(action) = input.action {
            builder = builder.bind(("action", action));
        }
        if let Some(Some(target_id)) = input.target_id {
            builder = builder.bind(("target_id", target_id));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<PermissionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("permission", &id_str))?;

        Ok(row.into_permission(id))
    }

    async fn delete(&self, id: Uuid) -> WardenResult<()> {
        self.db
            .query(DELETE_PERMISSION)
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}
