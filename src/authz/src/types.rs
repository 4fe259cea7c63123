//! Core access-control types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Group identifier, the unit permissions are granted to
pub type GroupId = String;

/// Store-assigned resource identifier
pub type ResourceId = i64;

/// Store-assigned scope identifier
pub type ScopeId = i64;

/// Unrecognized enum value in a path, header or config
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct ParseError {
    kind: &'static str,
    value: String,
}

impl ParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Kind of protected broker object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Exchange,
    Queue,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exchange => "exchange",
            Self::Queue => "queue",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exchange" => Ok(Self::Exchange),
            "queue" => Ok(Self::Queue),
            other => Err(ParseError::new("resource type", other)),
        }
    }
}

/// Fine-grained operation on a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceAction {
    Consume,
    Publish,
    Get,
    Delete,
    GrantPermission,
}

impl ResourceAction {
    pub const ALL: [ResourceAction; 5] = [
        Self::Consume,
        Self::Publish,
        Self::Get,
        Self::Delete,
        Self::GrantPermission,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consume => "consume",
            Self::Publish => "publish",
            Self::Get => "get",
            Self::Delete => "delete",
            Self::GrantPermission => "grantPermission",
        }
    }
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceAction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ParseError::new("resource action", s))
    }
}

/// Catalogue of broker-wide administrative capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceAuthScope {
    #[serde(rename = "exchanges:create")]
    ExchangesCreate,
    #[serde(rename = "exchanges:delete")]
    ExchangesDelete,
    #[serde(rename = "exchanges:get")]
    ExchangesGet,
    #[serde(rename = "exchanges:publish")]
    ExchangesPublish,
    #[serde(rename = "queues:create")]
    QueuesCreate,
    #[serde(rename = "queues:delete")]
    QueuesDelete,
    #[serde(rename = "queues:get")]
    QueuesGet,
    #[serde(rename = "queues:consume")]
    QueuesConsume,
    #[serde(rename = "resources:grant")]
    ResourcesGrant,
    #[serde(rename = "scopes:update")]
    ScopesUpdate,
    #[serde(rename = "scopes:get")]
    ScopesGet,
    #[serde(rename = "connections:get")]
    ConnectionsGet,
    #[serde(rename = "connections:close")]
    ConnectionsClose,
    #[serde(rename = "channels:get")]
    ChannelsGet,
}

impl ResourceAuthScope {
    pub const ALL: [ResourceAuthScope; 14] = [
        Self::ExchangesCreate,
        Self::ExchangesDelete,
        Self::ExchangesGet,
        Self::ExchangesPublish,
        Self::QueuesCreate,
        Self::QueuesDelete,
        Self::QueuesGet,
        Self::QueuesConsume,
        Self::ResourcesGrant,
        Self::ScopesUpdate,
        Self::ScopesGet,
        Self::ConnectionsGet,
        Self::ConnectionsClose,
        Self::ChannelsGet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExchangesCreate => "exchanges:create",
            Self::ExchangesDelete => "exchanges:delete",
            Self::ExchangesGet => "exchanges:get",
            Self::ExchangesPublish => "exchanges:publish",
            Self::QueuesCreate => "queues:create",
            Self::QueuesDelete => "queues:delete",
            Self::QueuesGet => "queues:get",
            Self::QueuesConsume => "queues:consume",
            Self::ResourcesGrant => "resources:grant",
            Self::ScopesUpdate => "scopes:update",
            Self::ScopesGet => "scopes:get",
            Self::ConnectionsGet => "connections:get",
            Self::ConnectionsClose => "connections:close",
            Self::ChannelsGet => "channels:get",
        }
    }

    /// The `*:get` scope guarding reads of a resource type
    pub fn get_scope_for(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Exchange => Self::ExchangesGet,
            ResourceType::Queue => Self::QueuesGet,
        }
    }

    /// The `*:create` scope guarding declaration of a resource type
    pub fn create_scope_for(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Exchange => Self::ExchangesCreate,
            ResourceType::Queue => Self::QueuesCreate,
        }
    }

    /// The `*:delete` scope guarding removal of a resource type
    pub fn delete_scope_for(resource_type: ResourceType) -> Self {
        match resource_type {
            ResourceType::Exchange => Self::ExchangesDelete,
            ResourceType::Queue => Self::QueuesDelete,
        }
    }
}

impl fmt::Display for ResourceAuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceAuthScope {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| ParseError::new("auth scope", s))
    }
}

/// Authenticated identity making a request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    name: String,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Request to register a protected resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthResource {
    pub resource_type: ResourceType,
    pub resource_name: String,
    pub durable: bool,
    pub owner: String,

    /// Grants written in the same step as the resource row
    pub action_groups: BTreeMap<ResourceAction, BTreeSet<GroupId>>,
}

impl NewAuthResource {
    pub fn new(
        resource_type: ResourceType,
        resource_name: impl Into<String>,
        durable: bool,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            resource_type,
            resource_name: resource_name.into(),
            durable,
            owner: owner.into(),
            action_groups: BTreeMap::new(),
        }
    }

    /// Grant every action to `group` on creation
    pub fn granting_all_to(mut self, group: impl Into<GroupId>) -> Self {
        let group = group.into();
        for action in ResourceAction::ALL {
            self.action_groups
                .entry(action)
                .or_default()
                .insert(group.clone());
        }
        self
    }
}

/// Permission record of a protected broker object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResource {
    pub id: ResourceId,

    #[serde(rename = "type")]
    pub resource_type: ResourceType,

    #[serde(rename = "name")]
    pub resource_name: String,

    /// Mirrors the broker object's durability, bookkeeping only
    pub durable: bool,

    /// Principal that created the resource
    pub owner: String,

    /// Groups granted each action
    #[serde(default)]
    pub action_groups: BTreeMap<ResourceAction, BTreeSet<GroupId>>,
}

/// Catalogue entry for a scope and the groups it is granted to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthScope {
    pub id: ScopeId,
    pub name: String,
    #[serde(default)]
    pub groups: BTreeSet<GroupId>,
}
