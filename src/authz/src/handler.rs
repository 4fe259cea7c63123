//! Authorization handler: the broker-facing decision façade
//!
//! One handler is bound to one authenticated principal for its lifetime.
//! It is the single translation boundary from [`StoreError`] into
//! [`AuthzError`], so callers branch on exactly two things: not-found
//! ([`AuthzError::is_not_found`]) and everything else.
//!
//! Every method reaches the permission store and may wait on I/O. Do not hold
//! broker-internal locks across these calls.

use crate::authorizer::Authorizer;
use crate::error::{AuthzError, Denial, Result, StoreError};
use crate::registry::ResourceRegistry;
use crate::store::PermissionStore;
use crate::types::{
    AuthResource, AuthScope, GroupId, Principal, ResourceAction, ResourceAuthScope, ResourceType,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AuthorizationHandler {
    principal: Principal,
    authorizer: Arc<dyn Authorizer>,
    registry: Arc<ResourceRegistry>,
    store: Arc<dyn PermissionStore>,
}

impl AuthorizationHandler {
    pub fn new(
        principal: Principal,
        authorizer: Arc<dyn Authorizer>,
        registry: Arc<ResourceRegistry>,
        store: Arc<dyn PermissionStore>,
    ) -> Self {
        Self {
            principal,
            authorizer,
            registry,
            store,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Scope check followed, only if it passes, by the resource check
    pub async fn handle(
        &self,
        scope: ResourceAuthScope,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
    ) -> Result<()> {
        self.handle_scope(scope).await?;
        self.handle_resource(resource_type, resource_name, action).await
    }

    /// Check a broker-wide capability.
    ///
    /// Scopes are a fixed catalogue, so a scope or mapping that cannot be
    /// found is a denial here, never not-found.
    pub async fn handle_scope(&self, scope: ResourceAuthScope) -> Result<()> {
        let decision = self
            .authorizer
            .authorize_scope(scope.as_str(), self.principal.name())
            .await;

        match decision {
            Ok(true) => Ok(()),
            Ok(false)
            | Err(StoreError::ScopeNotFound(_))
            | Err(StoreError::ResourceNotFound { .. }) => Err(self.deny(Denial::Scope {
                scope: scope.to_string(),
            })),
            Err(e @ StoreError::Unavailable(_)) | Err(e @ StoreError::DuplicateResource { .. }) => {
                Err(AuthzError::system(
                    format!("authorizing auth scope key: {}", scope),
                    e,
                ))
            }
        }
    }

    /// Check an action on one resource.
    ///
    /// A resource without a record yields [`AuthzError::ResourceNotFound`],
    /// not a denial.
    pub async fn handle_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
    ) -> Result<()> {
        let decision = self
            .authorizer
            .authorize_resource(resource_type, resource_name, action, self.principal.name())
            .await;

        match decision {
            Ok(true) => Ok(()),
            Ok(false) => Err(self.deny(Denial::Resource {
                resource_type: resource_type.to_string(),
                resource_name: resource_name.to_string(),
                action: action.to_string(),
            })),
            Err(StoreError::ResourceNotFound { .. }) => Err(AuthzError::ResourceNotFound {
                resource_type: resource_type.to_string(),
                resource_name: resource_name.to_string(),
            }),
            Err(e @ StoreError::Unavailable(_))
            | Err(e @ StoreError::DuplicateResource { .. })
            | Err(e @ StoreError::ScopeNotFound(_)) => Err(AuthzError::system(
                format!(
                    "authorizing on: {} resourceName: {} action: {}",
                    resource_type, resource_name, action
                ),
                e,
            )),
        }
    }

    /// Record a new broker object owned by this handler's principal
    pub async fn create_auth_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        durable: bool,
    ) -> Result<()> {
        match self
            .registry
            .create(resource_type, resource_name, durable, &self.principal)
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::DuplicateResource { .. }) => Err(AuthzError::DuplicateResource {
                resource_type: resource_type.to_string(),
                resource_name: resource_name.to_string(),
            }),
            Err(e @ StoreError::Unavailable(_))
            | Err(e @ StoreError::ResourceNotFound { .. })
            | Err(e @ StoreError::ScopeNotFound(_)) => Err(AuthzError::system(
                format!("creating {} with name: {}", resource_type, resource_name),
                e,
            )),
        }
    }

    /// Drop the record of a deleted broker object
    pub async fn delete_auth_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
    ) -> Result<()> {
        let deleted = self.registry.delete(resource_type, resource_name).await;
        self.lifecycle_result(
            deleted,
            resource_type,
            resource_name,
            format!("deleting {} with name: {}", resource_type, resource_name),
        )
    }

    /// Read a resource record with its grants, gated by the type's `get` scope
    pub async fn auth_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
    ) -> Result<AuthResource> {
        self.handle_scope(ResourceAuthScope::get_scope_for(resource_type))
            .await?;

        match self.registry.get(resource_type, resource_name).await {
            Ok(Some(resource)) => Ok(resource),
            Ok(None) => Err(AuthzError::ResourceNotFound {
                resource_type: resource_type.to_string(),
                resource_name: resource_name.to_string(),
            }),
            Err(e) => Err(AuthzError::system(
                format!("reading {} with name: {}", resource_type, resource_name),
                e,
            )),
        }
    }

    /// Grant `action` on a resource to groups
    pub async fn grant_permission(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        groups: &[GroupId],
    ) -> Result<()> {
        self.handle_grant(resource_type, resource_name).await?;
        let granted = self
            .registry
            .grant(resource_type, resource_name, action, groups)
            .await;
        self.lifecycle_result(
            granted,
            resource_type,
            resource_name,
            format!("granting {} on {} with name: {}", action, resource_type, resource_name),
        )
    }

    /// Revoke `action` on a resource from one group
    pub async fn revoke_permission(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        group: &str,
    ) -> Result<()> {
        self.handle_grant(resource_type, resource_name).await?;
        let revoked = self
            .registry
            .revoke(resource_type, resource_name, action, group)
            .await;
        self.lifecycle_result(
            revoked,
            resource_type,
            resource_name,
            format!("revoking {} on {} with name: {}", action, resource_type, resource_name),
        )
    }

    /// Hand a resource to another owner
    pub async fn change_owner(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        owner: &str,
    ) -> Result<()> {
        self.handle_grant(resource_type, resource_name).await?;
        let changed = self
            .registry
            .change_owner(resource_type, resource_name, owner)
            .await;
        self.lifecycle_result(
            changed,
            resource_type,
            resource_name,
            format!("changing owner of {} with name: {}", resource_type, resource_name),
        )
    }

    pub async fn scopes(&self) -> Result<Vec<AuthScope>> {
        self.handle_scope(ResourceAuthScope::ScopesGet).await?;
        self.store
            .list_scopes()
            .await
            .map_err(|e| AuthzError::system("listing auth scopes", e))
    }

    /// Read one catalogue entry; `None` if the scope is not in the catalogue
    pub async fn scope(&self, name: &str) -> Result<Option<AuthScope>> {
        self.handle_scope(ResourceAuthScope::ScopesGet).await?;
        self.store
            .read_scope(name)
            .await
            .map_err(|e| AuthzError::system(format!("reading auth scope key: {}", name), e))
    }

    pub async fn add_scope_groups(&self, name: &str, groups: &[GroupId]) -> Result<()> {
        self.handle_scope(ResourceAuthScope::ScopesUpdate).await?;
        self.store
            .add_scope_groups(name, groups)
            .await
            .map_err(|e| AuthzError::system(format!("updating auth scope key: {}", name), e))
    }

    pub async fn remove_scope_group(&self, name: &str, group: &str) -> Result<()> {
        self.handle_scope(ResourceAuthScope::ScopesUpdate).await?;
        self.store
            .remove_scope_group(name, group)
            .await
            .map_err(|e| AuthzError::system(format!("updating auth scope key: {}", name), e))
    }

    async fn handle_grant(&self, resource_type: ResourceType, resource_name: &str) -> Result<()> {
        self.handle(
            ResourceAuthScope::ResourcesGrant,
            resource_type,
            resource_name,
            ResourceAction::GrantPermission,
        )
        .await
    }

    fn lifecycle_result(
        &self,
        result: std::result::Result<(), StoreError>,
        resource_type: ResourceType,
        resource_name: &str,
        context: String,
    ) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(StoreError::ResourceNotFound { .. }) => Err(AuthzError::ResourceNotFound {
                resource_type: resource_type.to_string(),
                resource_name: resource_name.to_string(),
            }),
            Err(e @ StoreError::Unavailable(_))
            | Err(e @ StoreError::DuplicateResource { .. })
            | Err(e @ StoreError::ScopeNotFound(_)) => Err(AuthzError::system(context, e)),
        }
    }

    fn deny(&self, denial: Denial) -> AuthzError {
        warn!(
            target: "broker_authz::audit",
            principal = %self.principal,
            denied = %denial,
            "Unauthorized action"
        );
        AuthzError::Unauthorized(denial)
    }
}
