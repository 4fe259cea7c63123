//! Error types for the broker access-control core
//!
//! Two layers of errors exist. [`StoreError`] is what the permission store,
//! the resource registry and the authorizer produce. [`AuthzError`] is the
//! only error the [`AuthorizationHandler`](crate::handler::AuthorizationHandler)
//! hands back to the rest of the broker.

use std::fmt;
use thiserror::Error;

/// Permission store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A resource with the same (type, name) already exists
    #[error("Duplicate resource: {resource_type} '{resource_name}' already exists")]
    DuplicateResource {
        resource_type: String,
        resource_name: String,
    },

    /// No resource record for the given (type, name)
    #[error("Resource not found: {resource_type} '{resource_name}'")]
    ResourceNotFound {
        resource_type: String,
        resource_name: String,
    },

    /// Scope is not part of the catalogue
    #[error("Scope not found: {0}")]
    ScopeNotFound(String),

    /// Connectivity, transaction or constraint failure
    #[error("Permission store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn duplicate(resource_type: impl fmt::Display, resource_name: impl Into<String>) -> Self {
        Self::DuplicateResource {
            resource_type: resource_type.to_string(),
            resource_name: resource_name.into(),
        }
    }

    pub fn not_found(resource_type: impl fmt::Display, resource_name: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.to_string(),
            resource_name: resource_name.into(),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Result type for permission store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// What a policy denial was about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The principal lacks the scope
    Scope { scope: String },

    /// The principal lacks the action on the resource
    Resource {
        resource_type: String,
        resource_name: String,
        action: String,
    },
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scope { scope } => write!(f, "auth scope key: {}", scope),
            Self::Resource {
                resource_type,
                resource_name,
                action,
            } => write!(
                f,
                "{} resourceName: {} action: {}",
                resource_type, resource_name, action
            ),
        }
    }
}

/// Coarse classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Denial,
    ResourceNotFound,
    DuplicateResource,
    StoreUnavailable,
}

/// Authorization errors surfaced by the handler
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Policy said no
    #[error("Unauthorized action on {0}")]
    Unauthorized(Denial),

    /// The subject of the request does not exist
    #[error("Resource not found: {resource_type} '{resource_name}'")]
    ResourceNotFound {
        resource_type: String,
        resource_name: String,
    },

    /// Lost a create race, or the resource was already registered
    #[error("Duplicate resource found for resource type: {resource_type} with name: {resource_name}")]
    DuplicateResource {
        resource_type: String,
        resource_name: String,
    },

    /// The authorization system itself failed
    #[error("Error occurred while {context}: {source}")]
    System {
        context: String,
        #[source]
        source: StoreError,
    },
}

impl AuthzError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Denial,
            Self::ResourceNotFound { .. } => ErrorKind::ResourceNotFound,
            Self::DuplicateResource { .. } => ErrorKind::DuplicateResource,
            Self::System { .. } => ErrorKind::StoreUnavailable,
        }
    }

    /// The "thing you asked about doesn't exist" family
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }

    pub fn is_denial(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    pub(crate) fn system(context: impl Into<String>, source: StoreError) -> Self {
        Self::System {
            context: context.into(),
            source,
        }
    }
}

/// Result type for handler operations
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_names_scope() {
        let err = AuthzError::Unauthorized(Denial::Scope {
            scope: "queues:delete".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::Denial);
        assert!(err.to_string().contains("queues:delete"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_system_error_keeps_source() {
        let err = AuthzError::system(
            "authorizing auth scope key: queues:get",
            StoreError::Unavailable("connection refused".to_string()),
        );
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("Permission store unavailable: connection refused")
        );
    }
}
