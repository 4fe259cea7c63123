//! Policy evaluation over group grants
//!
//! Evaluation is allow-list only: a check passes iff one of the principal's
//! groups holds a grant. There are no deny rules and the resource owner gets
//! nothing implicitly.
//!
//! ```text
//! principal → GroupResolver → groups → PermissionStore grant lookup → bool
//!                                                     ↓
//!                                              [DecisionMetrics]
//! ```

use crate::error::{StoreError, StoreResult};
use crate::metrics::{DecisionMetrics, Outcome};
use crate::store::PermissionStore;
use crate::types::{ResourceAction, ResourceType};
use crate::user_store::GroupResolver;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Decides scope and resource-action checks.
///
/// `Ok(false)` is a denial and nothing else: store failures come back as
/// `StoreError::Unavailable` and missing resources as
/// `StoreError::ResourceNotFound`.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Does any group of `principal` hold `scope`?
    async fn authorize_scope(&self, scope: &str, principal: &str) -> StoreResult<bool>;

    /// Does any group of `principal` hold `action` on the resource?
    async fn authorize_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        principal: &str,
    ) -> StoreResult<bool>;
}

/// Store-backed authorizer resolving principals to groups
pub struct GroupAuthorizer {
    store: Arc<dyn PermissionStore>,
    groups: Arc<dyn GroupResolver>,
    metrics: Option<Arc<DecisionMetrics>>,
}

impl GroupAuthorizer {
    pub fn new(store: Arc<dyn PermissionStore>, groups: Arc<dyn GroupResolver>) -> Self {
        Self {
            store,
            groups,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<DecisionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn finish(&self, result: &StoreResult<bool>, start: Instant) {
        let outcome = match result {
            Ok(true) => Outcome::Allowed,
            Ok(false) => Outcome::Denied,
            Err(StoreError::ResourceNotFound { .. }) => Outcome::NotFound,
            Err(e) => {
                error!("Permission store failure during authorization: {}", e);
                Outcome::Error
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record(outcome, start.elapsed()).await;
        }
    }
}

#[async_trait]
impl Authorizer for GroupAuthorizer {
    async fn authorize_scope(&self, scope: &str, principal: &str) -> StoreResult<bool> {
        let start = Instant::now();

        let result: StoreResult<bool> = async {
            let groups = self.groups.groups_for(principal).await?;
            debug!(principal, scope, ?groups, "Evaluating scope check");
            if groups.is_empty() {
                return Ok(false);
            }
            self.store.is_scope_granted_to_any_group(scope, &groups).await
        }
        .await;

        self.finish(&result, start).await;
        result
    }

    async fn authorize_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        principal: &str,
    ) -> StoreResult<bool> {
        let start = Instant::now();

        // Groups may be empty; the store is still asked so a missing resource
        // surfaces as not-found rather than a denial
        let result: StoreResult<bool> = async {
            let groups = self.groups.groups_for(principal).await?;
            debug!(
                principal,
                resource_type = %resource_type,
                resource_name,
                action = %action,
                ?groups,
                "Evaluating resource check"
            );
            self.store
                .is_action_granted_on_resource(resource_type, resource_name, action, &groups)
                .await
        }
        .await;

        self.finish(&result, start).await;
        result
    }
}

/// Approves every check; used when authorization is disabled.
///
/// Resource checks still consult the store so a missing resource is
/// reported as not-found rather than approved.
pub struct PermitAllAuthorizer {
    store: Arc<dyn PermissionStore>,
}

impl PermitAllAuthorizer {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Authorizer for PermitAllAuthorizer {
    async fn authorize_scope(&self, _scope: &str, _principal: &str) -> StoreResult<bool> {
        Ok(true)
    }

    async fn authorize_resource(
        &self,
        resource_type: ResourceType,
        resource_name: &str,
        action: ResourceAction,
        _principal: &str,
    ) -> StoreResult<bool> {
        // Empty group set: only existence matters here
        self.store
            .is_action_granted_on_resource(resource_type, resource_name, action, &BTreeSet::new())
            .await
            .map(|_| true)
    }
}
