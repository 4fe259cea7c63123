//! Resource registry: the only writer of resource records
//!
//! Turns broker-level objects (exchange "foo", queue "bar") into stored
//! [`AuthResource`] records. Nothing is cached; every call goes to the store,
//! because exchanges and queues are created and removed by independent
//! connections at any time.

use crate::error::StoreResult;
use crate::store::PermissionStore;
use crate::types::{
    AuthResource, GroupId, NewAuthResource, Principal, ResourceAction, ResourceId, ResourceType,
};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ResourceRegistry {
    store: Arc<dyn PermissionStore>,
    admin_group: GroupId,
}

impl ResourceRegistry {
    /// Every resource created through this registry grants all actions to
    /// `admin_group`, so administrators can manage it afterwards.
    pub fn new(store: Arc<dyn PermissionStore>, admin_group: impl Into<GroupId>) -> Self {
        Self {
            store,
            admin_group: admin_group.into(),
        }
    }

    /// Record a newly created broker object owned by `owner`.
    ///
    /// The owner gets no grant of its own; ownership is bookkeeping.
    pub async fn create(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        durable: bool,
        owner: &Principal,
    ) -> StoreResult<ResourceId> {
        let resource = NewAuthResource::new(resource_type, resource_name, durable, owner.name())
            .granting_all_to(self.admin_group.as_str());
        let id = self.store.create_resource(&resource).await?;

        info!(
            resource_type = %resource_type,
            resource_name,
            owner = %owner,
            durable,
            admin_group = %self.admin_group,
            "Auth resource created"
        );
        Ok(id)
    }

    /// Drop the record of a deleted broker object, grants included
    pub async fn delete(&self, resource_type: ResourceType, resource_name: &str) -> StoreResult<()> {
        self.store.delete_resource(resource_type, resource_name).await?;
        info!(resource_type = %resource_type, resource_name, "Auth resource deleted");
        Ok(())
    }

    pub async fn get(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
    ) -> StoreResult<Option<AuthResource>> {
        debug!(resource_type = %resource_type, resource_name, "Reading auth resource");
        self.store.read_resource(resource_type, resource_name).await
    }

    pub async fn grant(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        groups: &[GroupId],
    ) -> StoreResult<()> {
        self.store
            .add_resource_grant(resource_type, resource_name, action, groups)
            .await?;
        info!(
            resource_type = %resource_type,
            resource_name,
            action = %action,
            ?groups,
            "Resource action granted"
        );
        Ok(())
    }

    pub async fn revoke(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        group: &str,
    ) -> StoreResult<()> {
        self.store
            .remove_resource_grant(resource_type, resource_name, action, group)
            .await?;
        info!(
            resource_type = %resource_type,
            resource_name,
            action = %action,
            group,
            "Resource action revoked"
        );
        Ok(())
    }

    pub async fn change_owner(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        owner: &str,
    ) -> StoreResult<()> {
        self.store
            .update_owner(resource_type, resource_name, owner)
            .await?;
        info!(resource_type = %resource_type, resource_name, owner, "Resource owner changed");
        Ok(())
    }
}
