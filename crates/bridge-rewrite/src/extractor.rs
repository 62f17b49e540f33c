//! Interceptor binding extraction
//!
//! Replaces legacy interceptor lists with the wrapper marker and records, per
//! intercepted class, the rewritten interceptors the wrapper must drive.

use crate::error::ConfigurationError;
use crate::injection::InjectionRewriter;
use crate::registry::{BindingRegistry, ChainMember, InterceptorBinding, ModifiedInterceptorCache};
use crate::source::TypeSource;
use bridge_meta::{ClassName, DescriptorPatch, Marker, MarkerKind, TypeDescriptor};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Extracts legacy interceptor bindings into the registry
///
/// Registry, cache and type source are injected so callers can share or
/// replace them.
#[derive(Clone)]
pub struct BindingExtractor {
    rewriter: InjectionRewriter,
    registry: BindingRegistry,
    cache: ModifiedInterceptorCache,
    source: Arc<dyn TypeSource>,
}

impl fmt::Debug for BindingExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingExtractor")
            .field("registered", &self.registry.len())
            .field("cached_interceptors", &self.cache.stats().entry_count)
            .finish_non_exhaustive()
    }
}

impl BindingExtractor {
    /// Create extractor over shared stores
    #[must_use]
    pub fn new(
        registry: BindingRegistry,
        cache: ModifiedInterceptorCache,
        source: Arc<dyn TypeSource>,
    ) -> Self {
        Self {
            rewriter: InjectionRewriter::new(),
            registry,
            cache,
            source,
        }
    }

    /// Registry this extractor writes to
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Cache of rewritten interceptors
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ModifiedInterceptorCache {
        &self.cache
    }

    /// Replace legacy interceptor lists and register the resolved chains
    ///
    /// Returns an empty patch for a type without legacy lists. The class-level
    /// entry is only registered if the class has none yet.
    ///
    /// # Errors
    /// - `ConfigurationError::UnknownInterceptor` if a listed class cannot be resolved
    /// - `ConfigurationError::DuplicateInjectionPoint` from rewriting an interceptor
    pub fn extract_and_register(
        &self,
        descriptor: &TypeDescriptor,
    ) -> Result<DescriptorPatch, ConfigurationError> {
        let class = descriptor.class();
        let mut patch = DescriptorPatch::for_type(descriptor);

        let class_level = match descriptor.legacy_interceptors() {
            Some(list) => {
                patch.remove_from_type(MarkerKind::Interceptors);
                patch.add_to_type(Marker::InterceptorWrapper);
                self.resolve_chain(class, list)?
            }
            None => Vec::new(),
        };

        let mut method_level = HashMap::new();
        for (method, list) in descriptor.methods_with_legacy_interceptors() {
            patch.remove_from_method(method.signature.clone(), MarkerKind::Interceptors);
            patch.add_to_method(method.signature.clone(), Marker::InterceptorWrapper);
            method_level.insert(method.signature.clone(), self.resolve_chain(class, list)?);
        }

        if patch.is_empty() {
            return Ok(patch);
        }

        debug!(
            class = %class,
            class_level = class_level.len(),
            methods = method_level.len(),
            "extracted legacy interceptor bindings"
        );
        let (_, inserted) = self
            .registry
            .register(class.clone(), InterceptorBinding::new(class_level, method_level));
        if !inserted {
            debug!(class = %class, "binding already registered, keeping existing entry");
        }

        Ok(patch)
    }

    /// Resolve a legacy list into rewritten interceptors, first occurrence wins
    fn resolve_chain(
        &self,
        intercepted: &ClassName,
        list: &[ClassName],
    ) -> Result<Vec<ChainMember>, ConfigurationError> {
        let mut seen = HashSet::with_capacity(list.len());
        list.iter()
            .filter(|interceptor| seen.insert(*interceptor))
            .map(|interceptor| self.resolve(intercepted, interceptor))
            .collect()
    }

    fn resolve(
        &self,
        intercepted: &ClassName,
        interceptor: &ClassName,
    ) -> Result<ChainMember, ConfigurationError> {
        self.cache.try_get_or_insert_with(interceptor, || {
            let original = self.source.descriptor_of(interceptor).ok_or_else(|| {
                ConfigurationError::UnknownInterceptor {
                    intercepted: intercepted.clone(),
                    interceptor: interceptor.clone(),
                }
            })?;
            debug!(interceptor = %interceptor, "rewriting interceptor dependencies");
            self.rewriter.rewritten(&original)
        })
    }
}
