//! Process-lifetime registries
//!
//! Provides the two load-time stores consulted at call time:
//! - [`BindingRegistry`]: intercepted class to its resolved interceptor chains
//! - [`ModifiedInterceptorCache`]: interceptor class to its rewritten descriptor
//!
//! Both are populate-once-per-key, read-many and safe for concurrent access.
//! Neither evicts; the set of component types is fixed once loading completes.

use bridge_meta::{ClassName, MethodSignature, TypeDescriptor};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Resolved chain member: a rewritten interceptor descriptor
pub type ChainMember = Arc<TypeDescriptor>;

/// Interceptor chains registered for one intercepted class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptorBinding {
    class_level: Vec<ChainMember>,
    method_level: HashMap<MethodSignature, Vec<ChainMember>>,
}

impl InterceptorBinding {
    /// Create binding from resolved chains
    #[must_use]
    pub fn new(
        class_level: Vec<ChainMember>,
        method_level: HashMap<MethodSignature, Vec<ChainMember>>,
    ) -> Self {
        Self {
            class_level,
            method_level,
        }
    }

    /// Class-level chain, in declaration order
    #[inline]
    #[must_use]
    pub fn class_level(&self) -> &[ChainMember] {
        &self.class_level
    }

    /// Method-level chain for one method (empty if none registered)
    #[must_use]
    pub fn method_level(&self, method: &MethodSignature) -> &[ChainMember] {
        self.method_level.get(method).map_or(&[], Vec::as_slice)
    }

    /// Methods with their own chain
    pub fn intercepted_methods(&self) -> impl Iterator<Item = &MethodSignature> {
        self.method_level.keys()
    }

    /// Ordered chain for a call: class-level (unless excluded) then method-level
    #[must_use]
    pub fn chain_for(&self, method: &MethodSignature, exclude_class_level: bool) -> Vec<ChainMember> {
        let class_level: &[ChainMember] = if exclude_class_level {
            &[]
        } else {
            &self.class_level
        };
        class_level
            .iter()
            .chain(self.method_level(method))
            .cloned()
            .collect()
    }

    /// Check if neither chain has members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.class_level.is_empty() && self.method_level.values().all(Vec::is_empty)
    }
}

/// Registry of interceptor bindings keyed by intercepted class
///
/// # Invariants
/// - An entry, once inserted, is never replaced or removed
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    inner: Arc<DashMap<ClassName, Arc<InterceptorBinding>>>,
}

impl BindingRegistry {
    /// Create empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register binding unless the class already has one
    ///
    /// Returns the binding now stored for the class and whether it was inserted.
    pub fn register(
        &self,
        class: ClassName,
        binding: InterceptorBinding,
    ) -> (Arc<InterceptorBinding>, bool) {
        match self.inner.entry(class) {
            Entry::Occupied(existing) => (Arc::clone(existing.get()), false),
            Entry::Vacant(slot) => {
                info!(
                    class = %slot.key(),
                    class_level = binding.class_level.len(),
                    methods = binding.method_level.len(),
                    "registered interceptor binding"
                );
                let binding = Arc::new(binding);
                slot.insert(Arc::clone(&binding));
                (binding, true)
            }
        }
    }

    /// Binding for an intercepted class
    #[must_use]
    pub fn get(&self, class: &ClassName) -> Option<Arc<InterceptorBinding>> {
        self.inner.get(class).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if class has a binding
    #[inline]
    #[must_use]
    pub fn contains(&self, class: &ClassName) -> bool {
        self.inner.contains_key(class)
    }

    /// Number of registered classes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Statistics for the modified-interceptor cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of rewritten interceptors held
    pub entry_count: usize,
}

/// Rewritten interceptor descriptors keyed by original interceptor class
///
/// The deduplication point: an interceptor referenced by many components is
/// rewritten once and every component shares the same `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ModifiedInterceptorCache {
    inner: Arc<DashMap<ClassName, ChainMember>>,
}

impl ModifiedInterceptorCache {
    /// Create empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get rewritten descriptor
    #[must_use]
    pub fn get(&self, class: &ClassName) -> Option<ChainMember> {
        self.inner.get(class).map(|entry| Arc::clone(entry.value()))
    }

    /// Get or compute rewritten descriptor
    ///
    /// `f` runs outside the map lock. If two loaders race on the same class the
    /// first insertion wins and both receive it.
    ///
    /// # Errors
    /// Propagates the error from `f`; nothing is cached in that case
    pub fn try_get_or_insert_with<E, F>(&self, class: &ClassName, f: F) -> Result<ChainMember, E>
    where
        F: FnOnce() -> Result<TypeDescriptor, E>,
    {
        if let Some(cached) = self.get(class) {
            return Ok(cached);
        }

        let rewritten = Arc::new(f()?);
        let stored = self
            .inner
            .entry(class.clone())
            .or_insert(rewritten)
            .value()
            .clone();
        Ok(stored)
    }

    /// Check if class was rewritten already
    #[inline]
    #[must_use]
    pub fn contains(&self, class: &ClassName) -> bool {
        self.inner.contains_key(class)
    }

    /// Cache statistics
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.len(),
        }
    }
}
