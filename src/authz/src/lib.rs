//! # Broker Authorization Core
//!
//! Access-control core of a clustered message broker: decides whether an
//! authenticated principal may act on an exchange or queue, or use a
//! broker-wide capability ("scope"), and keeps the ownership and grant
//! records those decisions rest on.
//!
//! ## Features
//!
//! - **Two-tier checks**: scope-level capabilities and per-resource actions
//! - **Allow-list evaluation** over group grants, no implicit owner access
//! - **Distinct outcomes** for denial, missing resource and store failure
//! - **Async-first design** using Tokio runtime
//! - **Pluggable storage**: in-memory or PostgreSQL with cascading grants
//!
//! ## Example
//!
//! ```rust
//! use broker_authz::{AuthConfig, AuthManager, Principal, ResourceAction, ResourceAuthScope, ResourceType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = AuthManager::from_config(&AuthConfig::default()).await?;
//!     let handler = manager.authorization_handler(Principal::new("admin"));
//!
//!     handler.handle_scope(ResourceAuthScope::QueuesCreate).await?;
//!     handler.create_auth_resource(ResourceType::Queue, "orders", true).await?;
//!
//!     match handler.handle_resource(ResourceType::Queue, "orders", ResourceAction::Consume).await {
//!         Ok(()) => println!("consume allowed"),
//!         Err(e) if e.is_not_found() => println!("queue is gone"),
//!         Err(e) => println!("refused: {}", e),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod authorizer;
pub mod config;
pub mod error;
pub mod handler;
pub mod manager;
pub mod metrics;
pub mod registry;
pub mod seed;
pub mod store;
pub mod types;
pub mod user_store;

// Re-export commonly used types
pub use authorizer::{Authorizer, GroupAuthorizer, PermitAllAuthorizer};
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthzError, Denial, ErrorKind, Result, StoreError, StoreResult};
pub use handler::AuthorizationHandler;
pub use manager::AuthManager;
pub use metrics::{DecisionMetrics, DecisionSnapshot};
pub use registry::ResourceRegistry;
pub use store::{InMemoryPermissionStore, PermissionStore};
pub use types::{
    AuthResource, AuthScope, GroupId, NewAuthResource, Principal, ResourceAction,
    ResourceAuthScope, ResourceId, ResourceType, ScopeId,
};
pub use user_store::{GroupResolver, InMemoryUserStore, User};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
