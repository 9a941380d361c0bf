//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. Record keys and foreign
//! keys are UUIDs stored as strings; optional relations are
//! `option<string>` so a dangling or unresolved reference is `NONE`.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "rbac_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: RBAC tables
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Application scopes
-- =======================================================================
DEFINE TABLE app_scope SCHEMAFULL;
DEFINE FIELD name ON TABLE app_scope TYPE string;
DEFINE FIELD description ON TABLE app_scope TYPE string;
DEFINE FIELD active ON TABLE app_scope TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE app_scope TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE app_scope TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_app_scope_name ON TABLE app_scope \
    COLUMNS name UNIQUE;

-- =======================================================================
-- Permissions (target_id NONE = wildcard)
-- =======================================================================
DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD name ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE string;
DEFINE FIELD resource ON TABLE permission TYPE string;
DEFINE FIELD action ON TABLE permission TYPE string;
DEFINE FIELD target_id ON TABLE permission TYPE option<string>;
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_name ON TABLE permission \
    COLUMNS name UNIQUE;
DEFINE INDEX idx_permission_resource_action ON TABLE permission \
    COLUMNS resource, action;

-- =======================================================================
-- Roles (bound to at most one app scope)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD app_scope_id ON TABLE role TYPE option<string>;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;
DEFINE INDEX idx_role_app_scope ON TABLE role COLUMNS app_scope_id;

-- =======================================================================
-- Role assignments (profile_id is an external identifier)
-- =======================================================================
DEFINE TABLE role_assignment SCHEMAFULL;
DEFINE FIELD profile_id ON TABLE role_assignment TYPE string;
DEFINE FIELD role_id ON TABLE role_assignment TYPE option<string>;
DEFINE FIELD app_scope_id ON TABLE role_assignment TYPE option<string>;
DEFINE FIELD created_at ON TABLE role_assignment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_assignment_profile ON TABLE role_assignment \
    COLUMNS profile_id, app_scope_id;
DEFINE INDEX idx_role_assignment_role ON TABLE role_assignment \
    COLUMNS role_id;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- Role -> Permission grants, at most one edge per pair
DEFINE TABLE role_permission TYPE RELATION IN role OUT permission \
    SCHEMAFULL;
DEFINE INDEX idx_role_permission_pair ON TABLE role_permission \
    COLUMNS in, out UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

async fn current_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    Ok(records.first().map(|m| m.version).unwrap_or(0))
}

/// Apply one migration and record it in the same transaction, so a failed
/// DDL statement never leaves a version marked as applied.
async fn apply<C: Connection>(db: &Surreal<C>, migration: &Migration) -> Result<(), DbError> {
    let script = format!(
        "BEGIN TRANSACTION;\n{}\nCREATE _migration SET version = $version, name = $name;\nCOMMIT TRANSACTION;",
        migration.sql
    );

    db.query(script)
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {e}",
                migration.version, migration.name
            ))
        })?;
    Ok(())
}

/// Bring the RBAC schema up to date and return the resulting version.
///
/// Safe to call on every start: versions already recorded in `_migration`
/// are skipped.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut version = current_version(db).await?;
    for migration in MIGRATIONS.iter().filter(move |m| m.version > version) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        apply(db, migration).await?;
        version = migration.version;
    }

    info!(version, "RBAC schema up to date");
    Ok(version)
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
