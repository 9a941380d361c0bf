//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::filter::{ListFilter, RoleField};
use warden_core::models::role::{CreateRole, Role, RoleDetail, UpdateRole};
use warden_core::repository::{PaginatedResult, RoleRepository};

use super::{CountRow, app_scope, parse_uuid, permission, role_assignment};
use crate::error::DbError;
use crate::filter::WhereClause;

/// Attach a permission unless the edge already exists. The check and the
/// insert share one transaction; the unique index on `(in, out)` rejects
/// any concurrent duplicate.
const ATTACH_PERMISSION: &str = "\
BEGIN TRANSACTION;
LET $from = type::record('role', $role_id);
LET $to = type::record('permission', $permission_id);
LET $existing = (SELECT VALUE id FROM role_permission WHERE in = $from AND out = $to);
IF array::len($existing) = 0 {
    RELATE $from->role_permission->$to;
};
COMMIT TRANSACTION;
";

/// Grant edges go with the role; assignments stay and load with no role.
const DELETE_ROLE: &str = "\
BEGIN TRANSACTION;
DELETE role_permission WHERE in = type::record('role', $id);
DELETE type::record('role', $id);
COMMIT TRANSACTION;
";

#[derive(Debug, SurrealValue)]
struct RoleRow {
    name: String,
    description: String,
    app_scope_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    /// Resolve the row's relations into a [`Role`]. The permission list
    /// is left empty unless `with_permissions` is set.
    async fn hydrate<C: Connection>(
        self,
        db: &Surreal<C>,
        id: Uuid,
        with_permissions: bool,
    ) -> Result<Role, DbError> {
        let app_scope = match &self.app_scope_id {
            Some(scope_id) => app_scope::load(db, scope_id).await?,
            None => None,
        };
        let permissions = if with_permissions {
            permission::load_for_role(db, &id.to_string()).await?
        } else {
            Vec::new()
        };

        Ok(Role {
            id,
            name: self.name,
            description: self.description,
            app_scope,
            permissions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
pub(crate) struct RoleRowWithId {
    pub(crate) record_id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) app_scope_id: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl RoleRowWithId {
    fn split(self) -> Result<(Uuid, RoleRow), DbError> {
        let id = parse_uuid(&self.record_id, "role")?;
        Ok((
            id,
            RoleRow {
                name: self.name,
                description: self.description,
                app_scope_id: self.app_scope_id,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        ))
    }

    async fn hydrate<C: Connection>(
        self,
        db: &Surreal<C>,
        with_permissions: bool,
    ) -> Result<Role, DbError> {
        let (id, row) = self.split()?;
        row.hydrate(db, id, with_permissions).await
    }
}

/// Load one role by its string id, with its app scope and optionally its
/// permissions.
pub(crate) async fn load<C: Connection>(
    db: &Surreal<C>,
    id: &str,
    with_permissions: bool,
) -> Result<Option<Role>, DbError> {
    let mut result = db
        .query("SELECT meta::id(id) AS record_id, * FROM type::record('role', $id)")
        .bind(("id", id.to_owned()))
        .await?;

    let rows: Vec<RoleRowWithId> = result.take(0)?;
    match rows.into_iter().next() {
        Some(row) => Ok(Some(row.hydrate(db, with_permissions).await?)),
        None => Ok(None),
    }
}

/// All roles holding a permission, with their app scope but without their
/// own permission lists.
pub(crate) async fn load_holding<C: Connection>(
    db: &Surreal<C>,
    permission_id: &str,
) -> Result<Vec<Role>, DbError> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * FROM role \
             WHERE id IN (\
                 SELECT VALUE in FROM role_permission \
                 WHERE out = type::record('permission', $permission_id)\
             ) \
             ORDER BY created_at ASC",
        )
        .bind(("permission_id", permission_id.to_owned()))
        .await?;

    let rows: Vec<RoleRowWithId> = result.take(0)?;
    let mut roles = Vec::with_capacity(rows.len());
    for row in rows {
        roles.push(row.hydrate(db, false).await?);
    }
    Ok(roles)
}

async fn grant_exists<C: Connection>(
    db: &Surreal<C>,
    role_id: &str,
    permission_id: &str,
) -> Result<bool, DbError> {
    let mut result = db
        .query(
            "SELECT count() AS total FROM role_permission \
             WHERE in = type::record('role', $role_id) \
             AND out = type::record('permission', $permission_id) \
             GROUP ALL",
        )
        .bind(("role_id", role_id.to_owned()))
        .bind(("permission_id", permission_id.to_owned()))
        .await?;

    let rows: Vec<CountRow> = result.take(0)?;
    Ok(rows.first().is_some_and(|r| r.total > 0))
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Both ends of a grant edge must exist before it is touched.
    async fn require_pair(&self, role_id: &str, permission_id: &str) -> Result<(), DbError> {
        if load(&self.db, role_id, false).await?.is_none() {
            return Err(DbError::not_found("role", role_id));
        }
        if permission::load(&self.db, permission_id).await?.is_none() {
            return Err(DbError::not_found("permission", permission_id));
        }
        Ok(())
    }

    async fn reload(&self, role_id: &str) -> Result<Role, DbError> {
        load(&self.db, role_id, true)
            .await?
            .ok_or_else(|| DbError::not_found("role", role_id))
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> WardenResult<Role> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let app_scope = app_scope::load(&self.db, &input.app_scope_id.to_string()).await?;
        if app_scope.is_none() {
            debug!(
                app_scope_id = %input.app_scope_id,
                role = %input.name,
                "App scope not found; creating role without scope"
            );
        }
        let app_scope_id = app_scope.as_ref().map(|s| s.id.to_string());

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 name = $name, description = $description, \
                 app_scope_id = $app_scope_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("app_scope_id", app_scope_id))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role", &id_str))?;

        debug!(role_id = %id, name = %row.name, "Created role");
        Ok(Role {
            id,
            name: row.name,
            description: row.description,
            app_scope,
            permissions: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Option<RoleDetail>> {
        let id_str = id.to_string();
        let Some(role) = load(&self.db, &id_str, true).await? else {
            return Ok(None);
        };
        let assignments = role_assignment::load_for_role(&self.db, &id_str).await?;

        Ok(Some(RoleDetail { role, assignments }))
    }

    async fn get_by_name(
        &self,
        name: &str,
        app_scope_name: Option<&str>,
    ) -> WardenResult<Option<Role>> {
        let scope_id = match app_scope_name {
            Some(scope_name) => match app_scope::load_by_name(&self.db, scope_name).await? {
                Some(scope) => Some(scope.id.to_string()),
                // No such scope, so no role can be bound to it.
                None => return Ok(None),
            },
            None => None,
        };

        let query = if scope_id.is_some() {
            "SELECT meta::id(id) AS record_id, * FROM role \
             WHERE name = $name AND app_scope_id = $app_scope_id LIMIT 1"
        } else {
            "SELECT meta::id(id) AS record_id, * FROM role \
             WHERE name = $name LIMIT 1"
        };

        let mut builder = self.db.query(query).bind(("name", name.to_owned()));
        if let Some(scope_id) = scope_id {
            builder = builder.bind(("app_scope_id", scope_id));
        }
        let mut result = builder.await.map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.hydrate(&self.db, true).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: ListFilter<RoleField>) -> WardenResult<PaginatedResult<Role>> {
        filter.validate()?;
        let clause = WhereClause::render(&filter);

        let count_query = format!(
            "SELECT count() AS total FROM role {} GROUP ALL",
            clause.sql
        );
        let mut count_result = clause
            .bind(self.db.query(count_query))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM role {} \
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

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(row.hydrate(&self.db, true).await?);
        }

        Ok(PaginatedResult {
            items,
            total,
            offset: filter.pagination.offset,
            limit: filter.pagination.limit,
        })
    }

    async fn update(&self, id: Uuid, input: UpdateRole) -> WardenResult<Role> {
        let id_str = id.to_string();

        // A given scope id is re-resolved; one that does not resolve
        // unbinds the role, as on create.
        let app_scope_id = match input.app_scope_id {
            Some(scope_id) => Some(
                app_scope::load(&self.db, &scope_id.to_string())
                    .await?
                    .map(|s| s.id.to_string()),
            ),
            None => None,
        };

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        match &app_scope_id {
            Some(Some(_)) => sets.push("app_scope_id = $app_scope_id"),
            Some(None) => sets.push("app_scope_id = NONE"),
            None => {}
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('role', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(Some(scope_id)) = app_scope_id {
            builder = builder.bind(("app_scope_id", scope_id));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role", &id_str))?;

        Ok(row.hydrate(&self.db, id, true).await?)
    }

    async fn delete(&self, id: Uuid) -> WardenResult<()> {
        self.db
            .query(DELETE_ROLE)
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn add_permission(&self, role_id: Uuid, permission_id: Uuid) -> WardenResult<Role> {
        let role_id_str = role_id.to_string();
        let perm_id_str = permission_id.to_string();
        self.require_pair(&role_id_str, &perm_id_str).await?;

        let outcome = self
            .db
            .query(ATTACH_PERMISSION)
            .bind(("role_id", role_id_str.clone()))
            .bind(("permission_id", perm_id_str.clone()))
            .await
            .map_err(DbError::from)?
            .check();

        if let Err(e) = outcome {
            // Losing a race against an identical attach is still success.
            if !grant_exists(&self.db, &role_id_str, &perm_id_str).await? {
                return Err(DbError::Query(e.to_string()).into());
            }
            debug!(%role_id, %permission_id, "Permission attached concurrently");
        }

        Ok(self.reload(&role_id_str).await?)
    }

    async fn remove_permission(&self, role_id: Uuid, permission_id: Uuid) -> WardenResult<Role> {
        let role_id_str = role_id.to_string();
        let perm_id_str = permission_id.to_string();
        self.require_pair(&role_id_str, &perm_id_str).await?;

        self.db
            .query(
                "DELETE role_permission WHERE \
                 in = type::record('role', $role_id) AND \
                 out = type::record('permission', $permission_id)",
            )
            .bind(("role_id", role_id_str.clone()))
            .bind(("permission_id", perm_id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(self.reload(&role_id_str).await?)
    }
}
