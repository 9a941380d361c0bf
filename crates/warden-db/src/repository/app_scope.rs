//! SurrealDB implementation of [`AppScopeRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::filter::{AppScopeField, ListFilter};
use warden_core::models::app_scope::{AppScope, CreateAppScope, UpdateAppScope};
use warden_core::repository::{AppScopeRepository, PaginatedResult};

use super::{CountRow, parse_uuid};
use crate::error::DbError;
use crate::filter::WhereClause;

#[derive(Debug, SurrealValue)]
struct AppScopeRow {
    name: String,
    description: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AppScopeRow {
    fn into_app_scope(self, id: Uuid) -> AppScope {
        AppScope {
            id,
            name: self.name,
            description: self.description,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
pub(crate) struct AppScopeRowWithId {
    pub(crate) record_id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) active: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl AppScopeRowWithId {
    pub(crate) fn try_into_app_scope(self) -> Result<AppScope, DbError> {
        Ok(AppScope {
            id: parse_uuid(&self.record_id, "app scope")?,
            name: self.name,
            description: self.description,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Load one app scope by its string id. Shared by the role and
/// assignment repositories to populate their scope relation.
pub(crate) async fn load<C: Connection>(
    db: &Surreal<C>,
    id: &str,
) -> Result<Option<AppScope>, DbError> {
    let mut result = db
        .query("SELECT meta::id(id) AS record_id, * FROM type::record('app_scope', $id)")
        .bind(("id", id.to_owned()))
        .await?;

    let rows: Vec<AppScopeRowWithId> = result.take(0)?;
    rows.into_iter()
        .next()
        .map(AppScopeRowWithId::try_into_app_scope)
        .transpose()
}

pub(crate) async fn load_by_name<C: Connection>(
    db: &Surreal<C>,
    name: &str,
) -> Result<Option<AppScope>, DbError> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * FROM app_scope \
             WHERE name = $name LIMIT 1",
        )
        .bind(("name", name.to_owned()))
        .await?;

    let rows: Vec<AppScopeRowWithId> = result.take(0)?;
    rows.into_iter()
        .next()
        .map(AppScopeRowWithId::try_into_app_scope)
        .transpose()
}

/// SurrealDB implementation of the AppScope repository.
#[derive(Clone)]
pub struct SurrealAppScopeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAppScopeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AppScopeRepository for SurrealAppScopeRepository<C> {
    async fn create(&self, input: CreateAppScope) -> WardenResult<AppScope> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('app_scope', $id) SET \
                 name = $name, description = $description, \
                 active = $active",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("active", input.active))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AppScopeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("app_scope", &id_str))?;

        debug!(app_scope_id = %id, name = %row.name, "Created app scope");
        Ok(row.into_app_scope(id))
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Option<AppScope>> {
        Ok(load(&self.db, &id.to_string()).await?)
    }

    async fn get_by_name(&self, name: &str) -> WardenResult<Option<AppScope>> {
        Ok(load_by_name(&self.db, name).await?)
    }

    async fn list(
        &self,
        filter: ListFilter<AppScopeField>,
    ) -> WardenResult<PaginatedResult<AppScope>> {
        filter.validate()?;
        let clause = WhereClause::render(&filter);

        let count_query = format!(
            "SELECT count() AS total FROM app_scope {} GROUP ALL",
            clause.sql
        );
        let mut count_result = clause
            .bind(self.db.query(count_query))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM app_scope {} \
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

        let rows: Vec<AppScopeRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(AppScopeRowWithId::try_into_app_scope)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: filter.pagination.offset,
            limit: filter.pagination.limit,
        })
    }

    async fn update(&self, id: Uuid, input: UpdateAppScope) -> WardenResult<AppScope> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('app_scope', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(active) = input.active {
            builder = builder.bind(("active", active));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AppScopeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("app_scope", &id_str))?;

        Ok(row.into_app_scope(id))
    }

    async fn delete(&self, id: Uuid) -> WardenResult<()> {
        // Roles and assignments bound to the scope are left in place.
        self.db
            .query("DELETE type::record('app_scope', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }
}
