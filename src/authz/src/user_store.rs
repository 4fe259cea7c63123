//! Principal → group membership resolution
//!
//! The authorizer never assumes where memberships come from. Production
//! deployments can back [`GroupResolver`] with a directory or a cache; the
//! broker ships [`InMemoryUserStore`], filled from the configured user list.

use crate::error::StoreResult;
use crate::types::GroupId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Resolves a principal's effective group memberships
#[async_trait]
pub trait GroupResolver: Send + Sync {
    /// Groups of `principal`; unknown principals belong to no group
    async fn groups_for(&self, principal: &str) -> StoreResult<BTreeSet<GroupId>>;
}

/// A configured broker user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<GroupId>,
}

/// User directory held in memory
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<String, BTreeSet<GroupId>>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_users(users: &[User]) -> Self {
        let map = users
            .iter()
            .map(|user| (user.name.clone(), user.groups.iter().cloned().collect()))
            .collect();
        Self {
            users: Arc::new(RwLock::new(map)),
        }
    }

    /// Add or replace a user's memberships
    pub async fn upsert(&self, name: impl Into<String>, groups: impl IntoIterator<Item = GroupId>) {
        let mut users = self.users.write().await;
        users.insert(name.into(), groups.into_iter().collect());
    }

    pub async fn remove(&self, name: &str) -> bool {
        self.users.write().await.remove(name).is_some()
    }
}

#[async_trait]
impl GroupResolver for InMemoryUserStore {
    async fn groups_for(&self, principal: &str) -> StoreResult<BTreeSet<GroupId>> {
        let users = self.users.read().await;
        Ok(users.get(principal).cloned().unwrap_or_default())
    }
}
