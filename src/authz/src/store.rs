//! Permission store: durable scope, resource and grant records

use crate::error::StoreResult;
use crate::types::{
    AuthResource, AuthScope, GroupId, NewAuthResource, ResourceAction, ResourceId, ResourceType,
    ScopeId,
};
use async_trait::async_trait;
use std::collections::BTreeSet;

pub mod memory;

pub use memory::InMemoryPermissionStore;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresPermissionStore;

/// Transactional CRUD over scopes, scope grants, resources and resource grants.
///
/// Implementations enforce `(resource_type, resource_name)` uniqueness and
/// delete grant rows together with their parent scope or resource. Every
/// method may fail with [`StoreError::Unavailable`](crate::error::StoreError::Unavailable).
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Insert a scope into the catalogue, returning the existing id if present
    async fn ensure_scope(&self, name: &str) -> StoreResult<ScopeId>;

    /// Insert a scope mapped to `groups` in one step.
    ///
    /// Returns `None` without touching anything when the scope already
    /// exists, so mappings removed since are not brought back.
    async fn create_scope(&self, name: &str, groups: &[GroupId]) -> StoreResult<Option<ScopeId>>;

    /// Remove a scope and its group mappings
    async fn delete_scope(&self, name: &str) -> StoreResult<()>;

    async fn read_scope(&self, name: &str) -> StoreResult<Option<AuthScope>>;

    async fn list_scopes(&self) -> StoreResult<Vec<AuthScope>>;

    /// Grant a scope to groups; existing mappings are left untouched
    async fn add_scope_groups(&self, name: &str, groups: &[GroupId]) -> StoreResult<()>;

    async fn remove_scope_group(&self, name: &str, group: &str) -> StoreResult<()>;

    /// True iff any of `groups` is mapped to the scope. Unknown scopes grant nothing.
    async fn is_scope_granted_to_any_group(
        &self,
        scope: &str,
        groups: &BTreeSet<GroupId>,
    ) -> StoreResult<bool>;

    /// Register a resource together with its initial grants; fails with
    /// `DuplicateResource` if (type, name) exists
    async fn create_resource(&self, resource: &NewAuthResource) -> StoreResult<ResourceId>;

    /// Remove a resource and its grants; fails with `ResourceNotFound` if absent
    async fn delete_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
    ) -> StoreResult<()>;

    async fn read_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
    ) -> StoreResult<Option<AuthResource>>;

    async fn update_owner(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        owner: &str,
    ) -> StoreResult<()>;

    async fn add_resource_grant(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        groups: &[GroupId],
    ) -> StoreResult<()>;

    async fn remove_resource_grant(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        group: &str,
    ) -> StoreResult<()>;

    /// True iff any of `groups` holds `action` on the resource.
    ///
    /// Fails with `ResourceNotFound` when the resource has no record, which is
    /// distinct from a record with no matching grant (`Ok(false)`).
    async fn is_action_granted_on_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        groups: &BTreeSet<GroupId>,
    ) -> StoreResult<bool>;

    async fn health_check(&self) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}
