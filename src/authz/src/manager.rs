//! Wiring of store, group resolution and authorizer
//!
//! [`AuthManager`] is built once at broker start. Connection and management
//! handlers then ask it for an [`AuthorizationHandler`] bound to their
//! authenticated principal.

use crate::authorizer::{Authorizer, GroupAuthorizer, PermitAllAuthorizer};
use crate::config::AuthConfig;
use crate::error::StoreResult;
use crate::handler::AuthorizationHandler;
use crate::metrics::DecisionMetrics;
use crate::registry::ResourceRegistry;
use crate::seed;
use crate::store::{InMemoryPermissionStore, PermissionStore};
use crate::types::Principal;
use crate::user_store::{GroupResolver, InMemoryUserStore};
use std::sync::Arc;
use tracing::{info, warn};

#[cfg(feature = "postgres")]
use crate::store::PostgresPermissionStore;

pub struct AuthManager {
    store: Arc<dyn PermissionStore>,
    authorizer: Arc<dyn Authorizer>,
    registry: Arc<ResourceRegistry>,
    metrics: Arc<DecisionMetrics>,
}

impl AuthManager {
    /// Build from configuration, connecting the store and seeding it
    pub async fn from_config(config: &AuthConfig) -> StoreResult<Self> {
        let store = Self::open_store(config).await?;
        let groups: Arc<dyn GroupResolver> = Arc::new(InMemoryUserStore::from_users(&config.users));

        seed::bootstrap(store.as_ref(), &config.admin_group, &config.admin_principal).await?;

        Ok(Self::with_parts(
            store,
            groups,
            &config.admin_group,
            config.authorization_enabled,
        ))
    }

    /// Assemble from already-built parts; resources created later grant
    /// every action to `admin_group`
    pub fn with_parts(
        store: Arc<dyn PermissionStore>,
        groups: Arc<dyn GroupResolver>,
        admin_group: &str,
        authorization_enabled: bool,
    ) -> Self {
        let metrics = Arc::new(DecisionMetrics::new());

        let authorizer: Arc<dyn Authorizer> = if authorization_enabled {
            Arc::new(GroupAuthorizer::new(store.clone(), groups).with_metrics(metrics.clone()))
        } else {
            warn!("Authorization disabled, every check will be approved");
            Arc::new(PermitAllAuthorizer::new(store.clone()))
        };

        info!(
            backend = store.backend_name(),
            admin_group,
            authorization_enabled,
            "AuthManager initialized"
        );

        Self {
            registry: Arc::new(ResourceRegistry::new(store.clone(), admin_group)),
            store,
            authorizer,
            metrics,
        }
    }

    async fn open_store(config: &AuthConfig) -> StoreResult<Arc<dyn PermissionStore>> {
        match &config.database_url {
            #[cfg(feature = "postgres")]
            Some(url) => {
                let store = PostgresPermissionStore::new(url).await?;
                store.run_migrations().await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "postgres"))]
            Some(_) => Err(crate::error::StoreError::Unavailable(
                "database_url set but the postgres feature is disabled".to_string(),
            )),
            None => Ok(Arc::new(InMemoryPermissionStore::new())),
        }
    }

    /// Handler bound to `principal`
    pub fn authorization_handler(&self, principal: Principal) -> AuthorizationHandler {
        AuthorizationHandler::new(
            principal,
            self.authorizer.clone(),
            self.registry.clone(),
            self.store.clone(),
        )
    }

    pub fn metrics(&self) -> Arc<DecisionMetrics> {
        self.metrics.clone()
    }

    pub async fn health_check(&self) -> StoreResult<()> {
        self.store.health_check().await
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}
