//! Store-side rejections must surface as errors, never as silent success.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use warden_core::error::WardenError;
use warden_core::models::app_scope::CreateAppScope;
use warden_core::models::permission::CreatePermission;
use warden_core::models::role::CreateRole;
use warden_core::models::role_assignment::AssignRole;
use warden_core::repository::{
    AppScopeRepository, PermissionRepository, RoleAssignmentRepository, RoleRepository,
};
use warden_db::repository::{
    SurrealAppScopeRepository, SurrealPermissionRepository, SurrealRoleAssignmentRepository,
    SurrealRoleRepository,
};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();
    db
}

/// Make every DELETE on `table` fail inside the store.
async fn refuse_deletes(db: &Surreal<Db>, table: &str) {
    db.query(format!(
        "DEFINE EVENT refuse_delete ON {table} WHEN $event = 'DELETE' \
         THEN {{ THROW 'store refused delete' }};"
    ))
    .await
    .unwrap()
    .check()
    .unwrap();
}

#[tokio::test]
async fn refused_app_scope_delete_is_an_error() {
    let db = setup().await;
    let repo = SurrealAppScopeRepository::new(db.clone());
    let scope = repo
        .create(CreateAppScope {
            name: "blog".into(),
            description: String::new(),
            active: true,
        })
        .await
        .unwrap();
    refuse_deletes(&db, "app_scope").await;

    let result = repo.delete(scope.id).await;

    assert!(matches!(result, Err(WardenError::Database(_))), "{result:?}");
    assert!(repo.get_by_id(scope.id).await.unwrap().is_some());
}

#[tokio::test]
async fn refused_unassign_is_an_error() {
    let db = setup().await;
    let scopes = SurrealAppScopeRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    let assignments = SurrealRoleAssignmentRepository::new(db.clone());
    let scope = scopes
        .create(CreateAppScope {
            name: "blog".into(),
            description: String::new(),
            active: true,
        })
        .await
        .unwrap();
    let role = roles
        .create(CreateRole {
            name: "author".into(),
            description: String::new(),
            app_scope_id: scope.id,
        })
        .await
        .unwrap();
    let assignment = assignments
        .assign(AssignRole {
            profile_id: "alice".into(),
            role_id: role.id,
            app_scope_id: scope.id,
        })
        .await
        .unwrap();
    refuse_deletes(&db, "role_assignment").await;

    let result = assignments.unassign(assignment.id).await;

    assert!(matches!(result, Err(WardenError::Database(_))), "{result:?}");
    let held = assignments.get_user_roles("alice", None).await.unwrap();
    assert_eq!(held.len(), 1);
}

/// A role and a permission linked by one grant edge.
async fn granted_pair(
    db: &Surreal<Db>,
) -> (
    SurrealRoleRepository<Db>,
    SurrealPermissionRepository<Db>,
    uuid::Uuid,
    uuid::Uuid,
) {
    let scopes = SurrealAppScopeRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db.clone());
    let perms = SurrealPermissionRepository::new(db.clone());
    let scope = scopes
        .create(CreateAppScope {
            name: "blog".into(),
            description: String::new(),
            active: true,
        })
        .await
        .unwrap();
    let perm = perms
        .create(CreatePermission {
            name: "blog.post.create".into(),
            description: String::new(),
            resource: "blog".into(),
            action: "create".into(),
            target_id: None,
        })
        .await
        .unwrap();
    let role = roles
        .create(CreateRole {
            name: "author".into(),
            description: String::new(),
            app_scope_id: scope.id,
        })
        .await
        .unwrap();
    roles.add_permission(role.id, perm.id).await.unwrap();
    (roles, perms, role.id, perm.id)
}

#[tokio::test]
async fn refused_role_delete_keeps_its_grants() {
    let db = setup().await;
    let (roles, _, role_id, perm_id) = granted_pair(&db).await;
    refuse_deletes(&db, "role").await;

    let result = roles.delete(role_id).await;

    assert!(matches!(result, Err(WardenError::Database(_))), "{result:?}");
    let role = roles.get_by_id(role_id).await.unwrap().unwrap();
    assert!(role.role.has_permission(perm_id));
}

#[tokio::test]
async fn refused_permission_delete_keeps_its_grants() {
    let db = setup().await;
    let (roles, perms, role_id, perm_id) = granted_pair(&db).await;
    refuse_deletes(&db, "permission").await;

    let result = perms.delete(perm_id).await;

    assert!(matches!(result, Err(WardenError::Database(_))), "{result:?}");
    let detail = perms.get_by_id(perm_id).await.unwrap().unwrap();
    assert_eq!(detail.roles.len(), 1);
    let role = roles.get_by_id(role_id).await.unwrap().unwrap();
    assert!(role.role.has_permission(perm_id));
}
