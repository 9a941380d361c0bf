//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    warden_db::run_migrations(&db).await.unwrap();

    // Verify that the tables exist by querying INFO FOR DB.
    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    assert!(info_str.contains("app_scope"), "missing app_scope table");
    assert!(info_str.contains("permission"), "missing permission table");
    assert!(info_str.contains("role"), "missing role table");
    assert!(
        info_str.contains("role_assignment"),
        "missing role_assignment table"
    );
    assert!(
        info_str.contains("role_permission"),
        "missing role_permission edge"
    );
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    assert_eq!(warden_db::run_migrations(&db).await.unwrap(), 1);
    // Second run must be a no-op, not a "table already exists" failure.
    assert_eq!(warden_db::run_migrations(&db).await.unwrap(), 1);

    let mut result = db
        .query("SELECT VALUE version FROM _migration")
        .await
        .unwrap();
    let versions: Vec<i64> = result.take(0).unwrap();
    assert_eq!(versions, vec![1]);
}

#[tokio::test]
async fn failed_migration_is_not_recorded() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    // A pre-existing table makes the v1 DDL fail on its first statement.
    db.query("DEFINE TABLE app_scope SCHEMALESS;")
        .await
        .unwrap()
        .check()
        .unwrap();

    let err = warden_db::run_migrations(&db).await.unwrap_err();
    assert!(matches!(err, warden_db::DbError::Migration(_)), "{err:?}");

    let mut result = db
        .query("SELECT VALUE version FROM _migration")
        .await
        .unwrap();
    let versions: Vec<i64> = result.take(0).unwrap();
    assert!(versions.is_empty());
    assert!(warden_db::run_migrations(&db).await.is_err());
}

#[tokio::test]
async fn schema_v1_applies_directly() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    db.query(warden_db::schema_v1())
        .await
        .unwrap()
        .check()
        .unwrap();
}
