//! Class identities
//!
//! Provides [`ClassName`], the key every load-time registry is indexed by.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// Fully qualified name of a component or interceptor class
///
/// Cheap to clone; equality and hashing are by name.
///
/// # Examples
/// - `demo.ejb.MyEjbService`
/// - `demo.interceptors.AuditInterceptor`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassName(Arc<str>);

impl ClassName {
    /// Create class name
    #[inline]
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Full name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without the package/module prefix
    #[inline]
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.0.rsplit(['.', ':']).next().unwrap_or(&self.0)
    }
}

impl Display for ClassName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ClassName {
    type Err = ClassNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ClassNameError::Empty);
        }
        if let Some(bad) = s
            .split('.')
            .find(|seg| seg.is_empty() || seg.contains(|c: char| !c.is_alphanumeric() && c != '_' && c != '$'))
        {
            return Err(ClassNameError::InvalidSegment(bad.to_string()));
        }
        Ok(Self::new(s))
    }
}

impl From<&str> for ClassName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ClassName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Borrow<str> for ClassName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Errors parsing a class name
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClassNameError {
    /// Empty input
    #[error("class name is empty")]
    Empty,

    /// Invalid segment characters
    #[error("invalid class name segment: '{0}'")]
    InvalidSegment(String),
}
