//! Bootstrap data: scope catalogue, admin grants and built-in resources
//!
//! Safe to run on every start. Admin mappings and grants are written only
//! together with the scope or resource they belong to, so rows that already
//! exist are left as they are and operator revocations survive a restart.

use crate::error::{StoreError, StoreResult};
use crate::store::PermissionStore;
use crate::types::{NewAuthResource, ResourceAuthScope, ResourceType};
use tracing::{debug, info};

/// Exchanges and queues every broker starts with
pub const BUILT_IN_RESOURCES: [(ResourceType, &str); 5] = [
    (ResourceType::Exchange, "<<default>>"),
    (ResourceType::Exchange, "amq.direct"),
    (ResourceType::Exchange, "amq.topic"),
    (ResourceType::Exchange, "amq.dlx"),
    (ResourceType::Queue, "amq.dlq"),
];

/// Provision the scope catalogue and built-in resources.
///
/// A newly inserted scope is granted to `admin_group`; a newly registered
/// built-in is owned by `admin_principal` with every action granted to
/// `admin_group`.
pub async fn bootstrap(
    store: &dyn PermissionStore,
    admin_group: &str,
    admin_principal: &str,
) -> StoreResult<()> {
    let admin = [admin_group.to_string()];
    let mut scopes_created = 0;
    let mut resources_created = 0;

    for scope in ResourceAuthScope::ALL {
        match store.create_scope(scope.as_str(), &admin).await? {
            Some(_) => scopes_created += 1,
            None => debug!(scope = %scope, "Scope already provisioned"),
        }
    }

    for (resource_type, resource_name) in BUILT_IN_RESOURCES {
        let resource = NewAuthResource::new(resource_type, resource_name, true, admin_principal)
            .granting_all_to(admin_group);

        match store.create_resource(&resource).await {
            Ok(_) => resources_created += 1,
            Err(StoreError::DuplicateResource { .. }) => {
                debug!(resource_type = %resource_type, resource_name, "Built-in resource already registered");
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        scopes_created,
        resources_created,
        admin_group,
        backend = store.backend_name(),
        "Permission store bootstrapped"
    );
    Ok(())
}
