//! Load-time error types
//!
//! Every error here aborts processing of the offending type; no partially
//! rewritten descriptor is ever handed back to the host.

use bridge_meta::{ClassName, PatchError};

/// Invalid legacy metadata found while rewriting a type
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A dependency is declared on both a field and its setter
    #[error(
        "invalid dependency definition in declaring class {class}: \
         found duplicate injection points for method {method} and corresponding field"
    )]
    DuplicateInjectionPoint {
        /// Declaring class
        class: ClassName,
        /// Setter method name
        method: String,
    },

    /// A legacy interceptor list names a class the host does not know
    #[error("interceptor {interceptor} declared on {intercepted} is not a known type")]
    UnknownInterceptor {
        /// Class declaring the interceptor list
        intercepted: ClassName,
        /// The unresolvable interceptor class
        interceptor: ClassName,
    },

    /// A hook replaced the processed descriptor more than once
    #[error("hook '{hook}' replaced the descriptor of {class} more than once")]
    DescriptorReplacedTwice {
        /// Processed class
        class: ClassName,
        /// Offending hook
        hook: &'static str,
    },

    /// Computed patch could not be applied
    #[error("patch failed: {0}")]
    Patch(#[from] PatchError),
}

impl ConfigurationError {
    /// Class whose deployment this error aborts
    #[must_use]
    pub fn class(&self) -> &ClassName {
        match self {
            Self::DuplicateInjectionPoint { class, .. } | Self::DescriptorReplacedTwice { class, .. } => {
                class
            }
            Self::UnknownInterceptor { intercepted, .. } => intercepted,
            Self::Patch(PatchError::ClassMismatch { expected, .. }) => expected,
            Self::Patch(PatchError::MemberNotFound { class, .. }) => class,
        }
    }
}
