//! End-to-end scenarios through the authorization handler
//!
//! Covers scope denials, the resource lifecycle, the distinction between
//! denial and not-found, and grant administration.

use broker_authz::{
    seed, AuthManager, AuthzError, Denial, ErrorKind, GroupResolver, InMemoryPermissionStore,
    InMemoryUserStore, PermissionStore, Principal, ResourceAction, ResourceAuthScope,
    ResourceType, User,
};
use std::sync::Arc;

/// alice is an administrator, bob a guest with no mappings, carol a consumer
async fn create_manager() -> (AuthManager, Arc<InMemoryPermissionStore>) {
    let store = Arc::new(InMemoryPermissionStore::new());
    seed::bootstrap(store.as_ref(), "admin", "admin").await.unwrap();

    let users = InMemoryUserStore::from_users(&[
        User {
            name: "alice".to_string(),
            groups: vec!["admin".to_string()],
        },
        User {
            name: "bob".to_string(),
            groups: vec!["guest".to_string()],
        },
        User {
            name: "carol".to_string(),
            groups: vec!["consumers".to_string()],
        },
    ]);

    let manager = AuthManager::with_parts(
        store.clone() as Arc<dyn PermissionStore>,
        Arc::new(users) as Arc<dyn GroupResolver>,
        "admin",
        true,
    );
    (manager, store)
}

#[tokio::test]
async fn test_admin_queue_lifecycle() {
    let (manager, _) = create_manager().await;
    let alice = manager.authorization_handler(Principal::new("alice"));
    let bob = manager.authorization_handler(Principal::new("bob"));

    alice.handle_scope(ResourceAuthScope::QueuesCreate).await.unwrap();
    alice
        .create_auth_resource(ResourceType::Queue, "orders", true)
        .await
        .unwrap();

    let resource = alice
        .auth_resource(ResourceType::Queue, "orders")
        .await
        .unwrap();
    assert_eq!(resource.owner, "alice");
    assert!(resource.durable);

    // Uniqueness holds regardless of who asks
    let err = bob
        .create_auth_resource(ResourceType::Queue, "orders", true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateResource);

    alice
        .delete_auth_resource(ResourceType::Queue, "orders")
        .await
        .unwrap();

    let err = alice
        .handle_resource(ResourceType::Queue, "orders", ResourceAction::Consume)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, AuthzError::ResourceNotFound { .. }));
}

#[tokio::test]
async fn test_guest_scope_denial_names_scope() {
    let (manager, _) = create_manager().await;
    let bob = manager.authorization_handler(Principal::new("bob"));

    let err = bob
        .handle_scope(ResourceAuthScope::QueuesDelete)
        .await
        .unwrap_err();

    match &err {
        AuthzError::Unauthorized(Denial::Scope { scope }) => assert_eq!(scope, "queues:delete"),
        other => panic!("expected scope denial, got {:?}", other),
    }
    assert!(err.to_string().contains("queues:delete"));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_unknown_principal_is_denied() {
    let (manager, _) = create_manager().await;
    let mallory = manager.authorization_handler(Principal::new("mallory"));

    for scope in ResourceAuthScope::ALL {
        let err = mallory.handle_scope(scope).await.unwrap_err();
        assert!(err.is_denial());
    }
}

#[tokio::test]
async fn test_owner_has_no_implicit_permissions() {
    let (manager, _) = create_manager().await;
    let alice = manager.authorization_handler(Principal::new("alice"));
    let carol = manager.authorization_handler(Principal::new("carol"));

    // carol owns the queue but holds no grant on it
    alice
        .create_auth_resource(ResourceType::Queue, "audit", false)
        .await
        .unwrap();
    alice
        .change_owner(ResourceType::Queue, "audit", "carol")
        .await
        .unwrap();

    let resource = alice
        .auth_resource(ResourceType::Queue, "audit")
        .await
        .unwrap();
    assert_eq!(resource.owner, "carol");

    let err = carol
        .handle_resource(ResourceType::Queue, "audit", ResourceAction::Consume)
        .await
        .unwrap_err();
    assert!(err.is_denial());
}

#[tokio::test]
async fn test_grant_and_revoke_action() {
    let (manager, _) = create_manager().await;
    let alice = manager.authorization_handler(Principal::new("alice"));
    let carol = manager.authorization_handler(Principal::new("carol"));

    alice
        .create_auth_resource(ResourceType::Exchange, "events", true)
        .await
        .unwrap();
    alice
        .grant_permission(
            ResourceType::Exchange,
            "events",
            ResourceAction::Publish,
            &["consumers".to_string()],
        )
        .await
        .unwrap();

    carol
        .handle_resource(ResourceType::Exchange, "events", ResourceAction::Publish)
        .await
        .unwrap();

    // A grant covers exactly one action
    let err = carol
        .handle_resource(ResourceType::Exchange, "events", ResourceAction::Delete)
        .await
        .unwrap_err();
    match err {
        AuthzError::Unauthorized(Denial::Resource {
            resource_type,
            resource_name,
            action,
        }) => {
            assert_eq!(resource_type, "exchange");
            assert_eq!(resource_name, "events");
            assert_eq!(action, "delete");
        }
        other => panic!("expected resource denial, got {:?}", other),
    }

    alice
        .revoke_permission(ResourceType::Exchange, "events", ResourceAction::Publish, "consumers")
        .await
        .unwrap();
    let err = carol
        .handle_resource(ResourceType::Exchange, "events", ResourceAction::Publish)
        .await
        .unwrap_err();
    assert!(err.is_denial());
}

#[tokio::test]
async fn test_grant_requires_grant_permission() {
    let (manager, _) = create_manager().await;
    let alice = manager.authorization_handler(Principal::new("alice"));
    let carol = manager.authorization_handler(Principal::new("carol"));

    // carol lacks both the resources:grant scope and a grantPermission row
    alice
        .create_auth_resource(ResourceType::Queue, "jobs", false)
        .await
        .unwrap();

    let err = carol
        .grant_permission(
            ResourceType::Queue,
            "jobs",
            ResourceAction::Consume,
            &["consumers".to_string()],
        )
        .await
        .unwrap_err();
    assert!(err.is_denial());
}

#[tokio::test]
async fn test_combined_check_not_found_after_scope_passes() {
    let (manager, _) = create_manager().await;
    let alice = manager.authorization_handler(Principal::new("alice"));

    let err = alice
        .handle(
            ResourceAuthScope::QueuesGet,
            ResourceType::Queue,
            "missing",
            ResourceAction::Get,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
}

#[tokio::test]
async fn test_built_in_resources_are_usable_by_admins() {
    let (manager, _) = create_manager().await;
    let alice = manager.authorization_handler(Principal::new("alice"));

    for (resource_type, name) in seed::BUILT_IN_RESOURCES {
        for action in ResourceAction::ALL {
            alice
                .handle_resource(resource_type, name, action)
                .await
                .unwrap();
        }
    }
}

#[tokio::test]
async fn test_scope_administration() {
    let (manager, _) = create_manager().await;
    let alice = manager.authorization_handler(Principal::new("alice"));
    let bob = manager.authorization_handler(Principal::new("bob"));

    alice
        .add_scope_groups("queues:get", &["guest".to_string()])
        .await
        .unwrap();
    bob.handle_scope(ResourceAuthScope::QueuesGet).await.unwrap();

    let scope = alice.scope("queues:get").await.unwrap().unwrap();
    assert!(scope.groups.contains("guest"));
    assert!(scope.groups.contains("admin"));

    alice.remove_scope_group("queues:get", "guest").await.unwrap();
    assert!(bob
        .handle_scope(ResourceAuthScope::QueuesGet)
        .await
        .unwrap_err()
        .is_denial());

    let scopes = alice.scopes().await.unwrap();
    assert_eq!(scopes.len(), ResourceAuthScope::ALL.len());
    assert!(alice.scope("no:such-scope").await.unwrap().is_none());

    // bob cannot administer scopes
    assert!(bob.scopes().await.unwrap_err().is_denial());
}

#[tokio::test]
async fn test_deleted_resource_leaves_no_grants() {
    let (manager, store) = create_manager().await;
    let alice = manager.authorization_handler(Principal::new("alice"));
    let carol = manager.authorization_handler(Principal::new("carol"));

    alice
        .create_auth_resource(ResourceType::Queue, "transient", false)
        .await
        .unwrap();
    alice
        .grant_permission(
            ResourceType::Queue,
            "transient",
            ResourceAction::Consume,
            &["consumers".to_string()],
        )
        .await
        .unwrap();
    alice
        .delete_auth_resource(ResourceType::Queue, "transient")
        .await
        .unwrap();

    // Re-declaring under the same name starts from the admin grants only
    alice
        .create_auth_resource(ResourceType::Queue, "transient", false)
        .await
        .unwrap();
    let resource = store
        .read_resource(ResourceType::Queue, "transient")
        .await
        .unwrap()
        .unwrap();
    assert!(resource
        .action_groups
        .values()
        .all(|groups| !groups.contains("consumers")));

    assert!(carol
        .handle_resource(ResourceType::Queue, "transient", ResourceAction::Consume)
        .await
        .unwrap_err()
        .is_denial());
}

#[tokio::test]
async fn test_delete_missing_resource_is_not_found() {
    let (manager, _) = create_manager().await;
    let alice = manager.authorization_handler(Principal::new("alice"));

    let err = alice
        .delete_auth_resource(ResourceType::Exchange, "never-declared")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_declared_resource_is_managed_through_handler() {
    let (manager, _) = create_manager().await;
    let alice = manager.authorization_handler(Principal::new("alice"));
    let carol = manager.authorization_handler(Principal::new("carol"));

    alice
        .create_auth_resource(ResourceType::Queue, "invoices", true)
        .await
        .unwrap();

    let resource = alice
        .auth_resource(ResourceType::Queue, "invoices")
        .await
        .unwrap();
    assert_eq!(resource.owner, "alice");
    for action in ResourceAction::ALL {
        assert!(resource.action_groups[&action].contains("admin"));
    }

    alice
        .grant_permission(
            ResourceType::Queue,
            "invoices",
            ResourceAction::Consume,
            &["consumers".to_string()],
        )
        .await
        .unwrap();
    carol
        .handle_resource(ResourceType::Queue, "invoices", ResourceAction::Consume)
        .await
        .unwrap();

    alice
        .change_owner(ResourceType::Queue, "invoices", "carol")
        .await
        .unwrap();

    alice
        .handle(
            ResourceAuthScope::QueuesDelete,
            ResourceType::Queue,
            "invoices",
            ResourceAction::Delete,
        )
        .await
        .unwrap();
    alice
        .delete_auth_resource(ResourceType::Queue, "invoices")
        .await
        .unwrap();
    assert!(alice
        .handle_resource(ResourceType::Queue, "invoices", ResourceAction::Consume)
        .await
        .unwrap_err()
        .is_not_found());
}
