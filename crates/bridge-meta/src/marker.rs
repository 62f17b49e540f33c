//! Declarative markers
//!
//! Every annotation the bridge reads or writes is one variant of the closed
//! [`Marker`] enum. Markers the bridge does not interpret are kept verbatim in
//! [`Marker::Other`].

use crate::class::ClassName;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Legacy resource-binding markers
///
/// All three kinds are treated uniformly by the injection rewriter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceKind {
    /// Reference to another legacy component
    Ejb,

    /// Reference to a persistence context
    PersistenceContext {
        /// Named persistence unit, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },

    /// Generic container resource
    Resource {
        /// Lookup name, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

/// Declarative metadata attached to a type, field or method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "marker", content = "value", rename_all = "snake_case")]
pub enum Marker {
    /// Modern injection point
    Inject,

    /// Legacy resource binding
    Legacy(ResourceKind),

    /// Legacy interceptor list, in declaration order
    Interceptors(Vec<ClassName>),

    /// Replacement marker standing in for a legacy interceptor list
    InterceptorWrapper,

    /// Method opts out of class-level interception
    ExcludeClassInterceptors,

    /// Around-call entry point of an interceptor
    AroundInvoke,

    /// Post-construction callback
    PostConstruct,

    /// Pre-destruction callback
    PreDestroy,

    /// Legacy stateless component
    Stateless,

    /// Legacy message-driven component
    MessageDriven,

    /// Modern interceptor type
    Interceptor,

    /// Calls run inside a unit of work
    Transactional,

    /// Request-scoped lifetime
    RequestScoped,

    /// Uninterpreted marker, kept verbatim
    Other(String),
}

/// Field-less discriminant of [`Marker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// [`Marker::Inject`]
    Inject,
    /// [`Marker::Legacy`]
    Legacy,
    /// [`Marker::Interceptors`]
    Interceptors,
    /// [`Marker::InterceptorWrapper`]
    InterceptorWrapper,
    /// [`Marker::ExcludeClassInterceptors`]
    ExcludeClassInterceptors,
    /// [`Marker::AroundInvoke`]
    AroundInvoke,
    /// [`Marker::PostConstruct`]
    PostConstruct,
    /// [`Marker::PreDestroy`]
    PreDestroy,
    /// [`Marker::Stateless`]
    Stateless,
    /// [`Marker::MessageDriven`]
    MessageDriven,
    /// [`Marker::Interceptor`]
    Interceptor,
    /// [`Marker::Transactional`]
    Transactional,
    /// [`Marker::RequestScoped`]
    RequestScoped,
    /// [`Marker::Other`]
    Other,
}

impl Marker {
    /// Discriminant of this marker
    #[must_use]
    pub fn kind(&self) -> MarkerKind {
        match self {
            Self::Inject => MarkerKind::Inject,
            Self::Legacy(_) => MarkerKind::Legacy,
            Self::Interceptors(_) => MarkerKind::Interceptors,
            Self::InterceptorWrapper => MarkerKind::InterceptorWrapper,
            Self::ExcludeClassInterceptors => MarkerKind::ExcludeClassInterceptors,
            Self::AroundInvoke => MarkerKind::AroundInvoke,
            Self::PostConstruct => MarkerKind::PostConstruct,
            Self::PreDestroy => MarkerKind::PreDestroy,
            Self::Stateless => MarkerKind::Stateless,
            Self::MessageDriven => MarkerKind::MessageDriven,
            Self::Interceptor => MarkerKind::Interceptor,
            Self::Transactional => MarkerKind::Transactional,
            Self::RequestScoped => MarkerKind::RequestScoped,
            Self::Other(_) => MarkerKind::Other,
        }
    }

    /// Shorthand for a legacy component reference
    #[inline]
    #[must_use]
    pub fn ejb() -> Self {
        Self::Legacy(ResourceKind::Ejb)
    }

    /// Shorthand for a legacy persistence-context reference
    #[inline]
    #[must_use]
    pub fn persistence_context() -> Self {
        Self::Legacy(ResourceKind::PersistenceContext { unit: None })
    }

    /// Shorthand for a legacy generic resource reference
    #[inline]
    #[must_use]
    pub fn resource() -> Self {
        Self::Legacy(ResourceKind::Resource { name: None })
    }

    /// Legacy interceptor list from class names
    #[must_use]
    pub fn interceptors<I, C>(classes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ClassName>,
    {
        Self::Interceptors(classes.into_iter().map(Into::into).collect())
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy(ResourceKind::Ejb) => f.write_str("@Ejb"),
            Self::Legacy(ResourceKind::PersistenceContext { .. }) => {
                f.write_str("@PersistenceContext")
            }
            Self::Legacy(ResourceKind::Resource { .. }) => f.write_str("@Resource"),
            Self::Interceptors(classes) => {
                f.write_str("@Interceptors(")?;
                for (i, class) in classes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{class}")?;
                }
                f.write_str(")")
            }
            Self::Other(name) => write!(f, "@{name}"),
            other => write!(f, "@{:?}", other.kind()),
        }
    }
}

/// Insertion-ordered set of markers
///
/// Adding a marker that is already present is a no-op; removal is by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerSet(IndexSet<Marker>);

impl MarkerSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(IndexSet::new())
    }

    /// Add marker, returning whether it was newly inserted
    #[inline]
    pub fn insert(&mut self, marker: Marker) -> bool {
        self.0.insert(marker)
    }

    /// Remove every marker of the given kind, returning how many were removed
    pub fn remove_kind(&mut self, kind: MarkerKind) -> usize {
        let before = self.0.len();
        self.0.retain(|m| m.kind() != kind);
        before - self.0.len()
    }

    /// Check presence by kind
    #[inline]
    #[must_use]
    pub fn contains_kind(&self, kind: MarkerKind) -> bool {
        self.0.iter().any(|m| m.kind() == kind)
    }

    /// Check presence of any of the given kinds
    #[inline]
    #[must_use]
    pub fn contains_any(&self, kinds: &[MarkerKind]) -> bool {
        self.0.iter().any(|m| kinds.contains(&m.kind()))
    }

    /// First marker of the given kind
    #[inline]
    #[must_use]
    pub fn get(&self, kind: MarkerKind) -> Option<&Marker> {
        self.0.iter().find(|m| m.kind() == kind)
    }

    /// Legacy resource kind, if any legacy marker is present
    #[must_use]
    pub fn legacy_resource(&self) -> Option<&ResourceKind> {
        self.0.iter().find_map(|m| match m {
            Marker::Legacy(kind) => Some(kind),
            _ => None,
        })
    }

    /// Classes listed by the legacy interceptor marker, if present
    #[must_use]
    pub fn legacy_interceptors(&self) -> Option<&[ClassName]> {
        self.0.iter().find_map(|m| match m {
            Marker::Interceptors(classes) => Some(classes.as_slice()),
            _ => None,
        })
    }

    /// Iterate in insertion order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.0.iter()
    }

    /// Number of markers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Marker> for MarkerSet {
    fn from_iter<I: IntoIterator<Item = Marker>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MarkerSet {
    type Item = &'a Marker;
    type IntoIter = indexmap::set::Iter<'a, Marker>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
