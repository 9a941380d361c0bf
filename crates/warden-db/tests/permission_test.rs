//! Integration tests for the Permission repository using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use warden_core::error::WardenError;
use warden_core::filter::{Condition, FilterOp, ListFilter, PermissionField};
use warden_core::models::app_scope::CreateAppScope;
use warden_core::models::permission::{CreatePermission, UpdatePermission};
use warden_core::models::role::CreateRole;
use warden_core::repository::{AppScopeRepository, PermissionRepository, RoleRepository};
use warden_db::repository::{
    SurrealAppScopeRepository, SurrealPermissionRepository, SurrealRoleRepository,
};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();
    db
}

fn permission(name: &str, resource: &str, action: &str, target: Option<&str>) -> CreatePermission {
    CreatePermission {
        name: name.into(),
        description: format!("Allows {name}"),
        resource: resource.into(),
        action: action.into(),
        target_id: target.map(Into::into),
    }
}

#[tokio::test]
async fn create_and_get_permission() {
    let repo = SurrealPermissionRepository::new(setup().await);

    let perm = repo
        .create(permission("blog.post.create", "blog", "create", None))
        .await
        .unwrap();

    assert_eq!(perm.name, "blog.post.create");
    assert_eq!(perm.resource, "blog");
    assert_eq!(perm.action, "create");
    assert!(perm.is_wildcard());

    let fetched = repo.get_by_id(perm.id).await.unwrap().unwrap();
    assert_eq!(fetched.permission, perm);
    assert!(fetched.roles.is_empty());
}

#[tokio::test]
async fn item_level_permission_keeps_target() {
    let repo = SurrealPermissionRepository::new(setup().await);

    let perm = repo
        .create(permission("post:write:T1", "post", "write", Some("T1")))
        .await
        .unwrap();

    assert_eq!(perm.target_id.as_deref(), Some("T1"));
    assert!(!perm.is_wildcard());
}

#[tokio::test]
async fn missing_permission_is_none() {
    let repo = SurrealPermissionRepository::new(setup().await);
    assert!(repo.get_by_id(uuid::Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_permission_name_rejected() {
    let repo = SurrealPermissionRepository::new(setup().await);

    repo.create(permission("post:write", "post", "write", None))
        .await
        .unwrap();
    let result = repo
        .create(permission("post:write", "post", "update", None))
        .await;

    assert!(
        result.is_err(),
        "duplicate permission name should be rejected"
    );
}

#[tokio::test]
async fn get_populates_holding_roles() {
    let db = setup().await;
    let scopes = SurrealAppScopeRepository::new(db.clone());
    let perms = SurrealPermissionRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db);

    let scope = scopes
        .create(CreateAppScope {
            name: "global".into(),
            description: "Everywhere".into(),
            active: true,
        })
        .await
        .unwrap();
    let perm = perms
        .create(permission("post:read", "post", "read", None))
        .await
        .unwrap();
    for name in ["reader", "editor"] {
        let role = roles
            .create(CreateRole {
                name: name.into(),
                description: name.into(),
                app_scope_id: scope.id,
            })
            .await
            .unwrap();
        roles.add_permission(role.id, perm.id).await.unwrap();
    }

    let detail = perms.get_by_id(perm.id).await.unwrap().unwrap();
    let mut names: Vec<&str> = detail.roles.iter().map(|r| r.name.as_str()).collect();
    names.sort();
    assert_eq!(names, ["editor", "reader"]);
    assert!(
        detail
            .roles
            .iter()
            .all(|r| r.app_scope.as_ref().map(|s| s.id) == Some(scope.id))
    );
}

#[tokio::test]
async fn update_sets_and_clears_target() {
    let repo = SurrealPermissionRepository::new(setup().await);
    let perm = repo
        .create(permission("post:edit", "post", "edit", None))
        .await
        .unwrap();

    let targeted = repo
        .update(
            perm.id,
            UpdatePermission {
                target_id: Some(Some("T9".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(targeted.target_id.as_deref(), Some("T9"));
    assert_eq!(targeted.action, "edit"); // unchanged

    let cleared = repo
        .update(
            perm.id,
            UpdatePermission {
                target_id: Some(None),
                description: Some("Edit any post".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.is_wildcard());
    assert_eq!(cleared.description, "Edit any post");

    let untouched = repo
        .update(perm.id, UpdatePermission::default())
        .await
        .unwrap();
    assert_eq!(untouched, cleared);
}

#[tokio::test]
async fn update_missing_permission_is_not_found() {
    let repo = SurrealPermissionRepository::new(setup().await);

    let result = repo
        .update(
            uuid::Uuid::new_v4(),
            UpdatePermission {
                action: Some("read".into()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(WardenError::NotFound { .. })));
}

#[tokio::test]
async fn delete_detaches_from_roles() {
    let db = setup().await;
    let scopes = SurrealAppScopeRepository::new(db.clone());
    let perms = SurrealPermissionRepository::new(db.clone());
    let roles = SurrealRoleRepository::new(db);

    let scope = scopes
        .create(CreateAppScope {
            name: "blog".into(),
            description: "Blog".into(),
            active: true,
        })
        .await
        .unwrap();
    let perm = perms
        .create(permission("post:delete", "post", "delete", None))
        .await
        .unwrap();
    let role = roles
        .create(CreateRole {
            name: "moderator".into(),
            description: "Moderates".into(),
            app_scope_id: scope.id,
        })
        .await
        .unwrap();
    let role = roles.add_permission(role.id, perm.id).await.unwrap();
    assert_eq!(role.permissions.len(), 1);

    perms.delete(perm.id).await.unwrap();
    perms.delete(perm.id).await.unwrap(); // no-op

    assert!(perms.get_by_id(perm.id).await.unwrap().is_none());
    let role = roles.get_by_id(role.id).await.unwrap().unwrap();
    assert!(role.role.permissions.is_empty());
}

#[tokio::test]
async fn list_filters_by_resource_and_wildcard() {
    let repo = SurrealPermissionRepository::new(setup().await);
    repo.create(permission("blog.post.create", "blog", "create", None))
        .await
        .unwrap();
    repo.create(permission("blog.post.edit:7", "blog", "edit", Some("7")))
        .await
        .unwrap();
    repo.create(permission("feed.read", "feed", "read", None))
        .await
        .unwrap();

    let blog = repo
        .list(ListFilter::all().with(Condition::eq(PermissionField::Resource, "blog")))
        .await
        .unwrap();
    assert_eq!(blog.total, 2);

    let blog_wildcards = repo
        .list(
            ListFilter::all()
                .with(Condition::eq(PermissionField::Resource, "blog"))
                .with(Condition::eq(PermissionField::TargetId, None::<String>)),
        )
        .await
        .unwrap();
    assert_eq!(blog_wildcards.items.len(), 1);
    assert_eq!(blog_wildcards.items[0].name, "blog.post.create");

    let targeted = repo
        .list(ListFilter::all().with(Condition::new(
            PermissionField::TargetId,
            FilterOp::Ne,
            None::<String>,
        )))
        .await
        .unwrap();
    assert_eq!(targeted.items.len(), 1);
    assert_eq!(targeted.items[0].target_id.as_deref(), Some("7"));
}
