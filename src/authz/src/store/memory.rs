//! In-memory permission store

use crate::error::{StoreError, StoreResult};
use crate::store::PermissionStore;
use crate::types::{
    AuthResource, AuthScope, GroupId, NewAuthResource, ResourceAction, ResourceId, ResourceType,
    ScopeId,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct ResourceRow {
    id: ResourceId,
    durable: bool,
    owner: String,
}

/// Normalized tables, mirroring the relational schema
#[derive(Debug, Default)]
struct Tables {
    next_scope_id: ScopeId,
    next_resource_id: ResourceId,
    scopes: HashMap<String, ScopeId>,
    scope_groups: BTreeSet<(ScopeId, GroupId)>,
    resources: HashMap<(ResourceType, String), ResourceRow>,
    resource_groups: BTreeSet<(ResourceId, ResourceAction, GroupId)>,
}

impl Tables {
    fn scope_id(&self, name: &str) -> StoreResult<ScopeId> {
        self.scopes
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::ScopeNotFound(name.to_string()))
    }

    fn resource(&self, resource_type: ResourceType, resource_name: &str) -> StoreResult<&ResourceRow> {
        self.resources
            .get(&(resource_type, resource_name.to_string()))
            .ok_or_else(|| StoreError::not_found(resource_type, resource_name))
    }

    fn scope_view(&self, name: &str, id: ScopeId) -> AuthScope {
        let groups = self
            .scope_groups
            .iter()
            .filter(|(scope_id, _)| *scope_id == id)
            .map(|(_, group)| group.clone())
            .collect();
        AuthScope {
            id,
            name: name.to_string(),
            groups,
        }
    }
}

/// In-memory permission store.
///
/// All tables sit behind one lock, so a cascade and its parent-row delete are
/// a single critical section and no reader observes orphaned grants.
pub struct InMemoryPermissionStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables {
                next_scope_id: 1,
                next_resource_id: 1,
                ..Default::default()
            })),
        }
    }
}

impl Default for InMemoryPermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn ensure_scope(&self, name: &str) -> StoreResult<ScopeId> {
        let mut tables = self.tables.write().await;
        if let Some(id) = tables.scopes.get(name) {
            return Ok(*id);
        }
        let id = tables.next_scope_id;
        tables.next_scope_id += 1;
        tables.scopes.insert(name.to_string(), id);
        Ok(id)
    }

    async fn create_scope(&self, name: &str, groups: &[GroupId]) -> StoreResult<Option<ScopeId>> {
        let mut tables = self.tables.write().await;
        if tables.scopes.contains_key(name) {
            return Ok(None);
        }
        let id = tables.next_scope_id;
        tables.next_scope_id += 1;
        tables.scopes.insert(name.to_string(), id);
        for group in groups {
            tables.scope_groups.insert((id, group.clone()));
        }
        Ok(Some(id))
    }

    async fn delete_scope(&self, name: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let id = tables.scope_id(name)?;
        tables.scopes.remove(name);
        tables.scope_groups.retain(|(scope_id, _)| *scope_id != id);
        Ok(())
    }

    async fn read_scope(&self, name: &str) -> StoreResult<Option<AuthScope>> {
        let tables = self.tables.read().await;
        Ok(tables.scopes.get(name).map(|id| tables.scope_view(name, *id)))
    }

    async fn list_scopes(&self) -> StoreResult<Vec<AuthScope>> {
        let tables = self.tables.read().await;
        let mut scopes: Vec<AuthScope> = tables
            .scopes
            .iter()
            .map(|(name, id)| tables.scope_view(name, *id))
            .collect();
        scopes.sort_by_key(|scope| scope.id);
        Ok(scopes)
    }

    async fn add_scope_groups(&self, name: &str, groups: &[GroupId]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let id = tables.scope_id(name)?;
        for group in groups {
            tables.scope_groups.insert((id, group.clone()));
        }
        Ok(())
    }

    async fn remove_scope_group(&self, name: &str, group: &str) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let id = tables.scope_id(name)?;
        tables.scope_groups.remove(&(id, group.to_string()));
        Ok(())
    }

    async fn is_scope_granted_to_any_group(
        &self,
        scope: &str,
        groups: &BTreeSet<GroupId>,
    ) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        let Some(id) = tables.scopes.get(scope).copied() else {
            return Ok(false);
        };
        Ok(groups
            .iter()
            .any(|group| tables.scope_groups.contains(&(id, group.clone()))))
    }

    async fn create_resource(&self, resource: &NewAuthResource) -> StoreResult<ResourceId> {
        let mut tables = self.tables.write().await;
        let key = (resource.resource_type, resource.resource_name.clone());
        if tables.resources.contains_key(&key) {
            return Err(StoreError::duplicate(
                resource.resource_type,
                resource.resource_name.as_str(),
            ));
        }
        let id = tables.next_resource_id;
        tables.next_resource_id += 1;
        tables.resources.insert(
            key,
            ResourceRow {
                id,
                durable: resource.durable,
                owner: resource.owner.clone(),
            },
        );
        for (action, groups) in &resource.action_groups {
            for group in groups {
                tables.resource_groups.insert((id, *action, group.clone()));
            }
        }
        Ok(id)
    }

    async fn delete_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .resources
            .remove(&(resource_type, resource_name.to_string()))
            .ok_or_else(|| StoreError::not_found(resource_type, resource_name))?;
        tables
            .resource_groups
            .retain(|(resource_id, _, _)| *resource_id != row.id);
        Ok(())
    }

    async fn read_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
    ) -> StoreResult<Option<AuthResource>> {
        let tables = self.tables.read().await;
        let Some(row) = tables
            .resources
            .get(&(resource_type, resource_name.to_string()))
        else {
            return Ok(None);
        };

        let mut action_groups: BTreeMap<ResourceAction, BTreeSet<GroupId>> = BTreeMap::new();
        for (_, action, group) in tables
            .resource_groups
            .iter()
            .filter(|(resource_id, _, _)| *resource_id == row.id)
        {
            action_groups.entry(*action).or_default().insert(group.clone());
        }

        Ok(Some(AuthResource {
            id: row.id,
            resource_type,
            resource_name: resource_name.to_string(),
            durable: row.durable,
            owner: row.owner.clone(),
            action_groups,
        }))
    }

    async fn update_owner(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        owner: &str,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let row = tables
            .resources
            .get_mut(&(resource_type, resource_name.to_string()))
            .ok_or_else(|| StoreError::not_found(resource_type, resource_name))?;
        row.owner = owner.to_string();
        Ok(())
    }

    async fn add_resource_grant(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        groups: &[GroupId],
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let id = tables.resource(resource_type, resource_name)?.id;
        for group in groups {
            tables.resource_groups.insert((id, action, group.clone()));
        }
        Ok(())
    }

    async fn remove_resource_grant(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        group: &str,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let id = tables.resource(resource_type, resource_name)?.id;
        tables.resource_groups.remove(&(id, action, group.to_string()));
        Ok(())
    }

    async fn is_action_granted_on_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        groups: &BTreeSet<GroupId>,
    ) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        let id = tables.resource(resource_type, resource_name)?.id;
        Ok(groups
            .iter()
            .any(|group| tables.resource_groups.contains(&(id, action, group.clone()))))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
