//! Call-time error types
//!
//! [`InvocationError`] is the single error flowing through an interception
//! chain. Business variants are carried as-is so callers and the transaction
//! coordinator see the original failure.

use bridge_meta::{ClassName, MethodSignature};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Boxed cause carried by lifecycle failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classification of persistence failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceErrorKind {
    /// Query expected one result, found several
    NonUniqueResult,
    /// Query expected one result, found none
    NoResult,
    /// Query exceeded its timeout
    QueryTimeout,
    /// Pessimistic lock could not be acquired in time
    LockTimeout,
    /// Concurrent modification detected
    OptimisticLock,
    /// Entity already exists
    EntityExists,
    /// Entity does not exist
    EntityNotFound,
    /// Operation needs an active unit of work
    TransactionRequired,
    /// Commit failed and the unit of work was rolled back
    Rollback,
    /// Anything else reported by the persistence provider
    Other,
}

impl PersistenceErrorKind {
    /// Benign query-result failures that never mark a unit of work rollback-only
    pub const NON_ROLLBACK: [Self; 4] = [
        Self::NonUniqueResult,
        Self::NoResult,
        Self::QueryTimeout,
        Self::LockTimeout,
    ];
}

/// Failure reported by the persistence layer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("persistence failure ({kind:?}): {message}")]
pub struct PersistenceError {
    /// Failure class
    pub kind: PersistenceErrorKind,
    /// Provider message
    pub message: String,
}

impl PersistenceError {
    /// Create persistence error
    #[must_use]
    pub fn new(kind: PersistenceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Business exception raised by a component or interceptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApplicationError {
    /// Exception identity, e.g. the business exception type name
    pub kind: String,
    /// Message
    pub message: String,
}

impl ApplicationError {
    /// Create application error
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Step of an auxiliary instance's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// Bare allocation
    Produce,
    /// Dependency injection
    Inject,
    /// Post-construction callback
    PostConstruct,
    /// Pre-destruction callback
    PreDestroy,
    /// Release from container bookkeeping
    Dispose,
}

impl Display for LifecyclePhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Produce => "produce",
            Self::Inject => "inject",
            Self::PostConstruct => "post-construct",
            Self::PreDestroy => "pre-destroy",
            Self::Dispose => "dispose",
        };
        f.write_str(name)
    }
}

/// Failure creating, injecting or destroying an auxiliary instance
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed for {class}: {source}")]
pub struct LifecycleError {
    /// Instance class
    pub class: ClassName,
    /// Failed step
    pub phase: LifecyclePhase,
    /// Underlying cause
    #[source]
    pub source: BoxError,
}

impl LifecycleError {
    /// Create lifecycle error
    #[must_use]
    pub fn new(class: ClassName, phase: LifecyclePhase, source: impl Into<BoxError>) -> Self {
        Self {
            class,
            phase,
            source: source.into(),
        }
    }
}

/// Error propagated out of an intercepted call
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    /// Persistence failure
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Business exception
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// Auxiliary instance lifecycle failure
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Chain member has no around-invoke entry point
    #[error("interceptor {class} declares no around-invoke entry point")]
    MissingEntryPoint {
        /// Interceptor class
        class: ClassName,
    },

    /// Parameters replaced with the wrong arity
    #[error("{method} takes {expected} parameters, got {actual}")]
    ParameterMismatch {
        /// Intercepted method
        method: MethodSignature,
        /// Declared arity
        expected: usize,
        /// Supplied arity
        actual: usize,
    },

    /// Any other failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InvocationError {
    /// Persistence failure class, if this is a persistence error
    #[inline]
    #[must_use]
    pub fn persistence_kind(&self) -> Option<PersistenceErrorKind> {
        match self {
            Self::Persistence(err) => Some(err.kind),
            _ => None,
        }
    }

    /// Business exception identity, if this is an application error
    #[inline]
    #[must_use]
    pub fn application_kind(&self) -> Option<&str> {
        match self {
            Self::Application(err) => Some(&err.kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_rollback_set_is_fixed() {
        assert_eq!(PersistenceErrorKind::NON_ROLLBACK.len(), 4);
        assert!(PersistenceErrorKind::NON_ROLLBACK.contains(&PersistenceErrorKind::NoResult));
        assert!(!PersistenceErrorKind::NON_ROLLBACK.contains(&PersistenceErrorKind::OptimisticLock));
    }

    #[test]
    fn business_errors_are_transparent() {
        let err = InvocationError::from(ApplicationError::new("InsufficientFunds", "balance too low"));
        assert_eq!(err.to_string(), "InsufficientFunds: balance too low");
        assert_eq!(err.application_kind(), Some("InsufficientFunds"));
        assert_eq!(err.persistence_kind(), None);
    }

    #[test]
    fn lifecycle_error_names_phase_and_class() {
        let err = LifecycleError::new(
            ClassName::new("demo.Audit"),
            LifecyclePhase::PostConstruct,
            anyhow::anyhow!("init failed"),
        );
        assert_eq!(err.to_string(), "post-construct failed for demo.Audit: init failed");
    }
}
