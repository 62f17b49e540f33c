//! Bridge facade
//!
//! Wires the load-time half (hook pipeline, extractor, registry, cache) and the
//! call-time half (dispatcher, instance lifecycle, coordinator) over one shared
//! registry.
//!
//! # Deployment
//! The host calls [`Bridge::process_type`] once per discovered type and keeps
//! the returned descriptor as the effective one. Any error aborts deployment.
//! Afterwards every call on a wrapped component goes through [`Bridge::dispatch`].

use crate::config::BridgeConfig;
use crate::error::Result;
use bridge_dispatch::{
    InstanceFactory, InstanceLifecycle, InterceptionDispatcher, InvocationError, ManagedInstance,
    TransactionContext,
};
use bridge_meta::{MethodSignature, TypeDescriptor};
use bridge_rewrite::{
    BindingExtractor, BindingRegistry, CacheStats, HookPipeline, ModifiedInterceptorCache,
    TypeSource,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Legacy component bridge
pub struct Bridge {
    config: BridgeConfig,
    registry: BindingRegistry,
    cache: ModifiedInterceptorCache,
    pipeline: HookPipeline,
    dispatcher: InterceptionDispatcher,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .field("registered", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Create bridge over the host's type lookup and instance factory
    #[must_use]
    pub fn new(
        config: BridgeConfig,
        source: Arc<dyn TypeSource>,
        factory: Arc<dyn InstanceFactory>,
    ) -> Self {
        let registry = BindingRegistry::new();
        let cache = ModifiedInterceptorCache::new();
        let extractor = BindingExtractor::new(registry.clone(), cache.clone(), source);
        let pipeline = HookPipeline::standard(extractor, config.hook_options());
        let dispatcher = InterceptionDispatcher::new(registry.clone(), InstanceLifecycle::new(factory))
            .with_transactions(config.dispatch.transactions);

        info!(hooks = ?pipeline.hook_names(), transactions = config.dispatch.transactions, "bridge ready");
        Self {
            config,
            registry,
            cache,
            pipeline,
            dispatcher,
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Bindings extracted so far
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Rewritten interceptor cache statistics
    #[inline]
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Call-time dispatcher
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &InterceptionDispatcher {
        &self.dispatcher
    }

    /// Run the hook pipeline over one discovered type
    ///
    /// # Errors
    /// Returns `BridgeError::Configuration` for invalid legacy metadata
    pub fn process_type(&self, descriptor: Arc<TypeDescriptor>) -> Result<Arc<TypeDescriptor>> {
        Ok(self.pipeline.process(descriptor)?)
    }

    /// Process every discovered type, in order
    ///
    /// # Errors
    /// The first type that fails; later types are not processed
    pub fn deploy<I>(&self, types: I) -> Result<Vec<Arc<TypeDescriptor>>>
    where
        I: IntoIterator<Item = Arc<TypeDescriptor>>,
    {
        let processed = types
            .into_iter()
            .map(|descriptor| self.process_type(descriptor))
            .collect::<Result<Vec<_>>>()?;
        info!(
            types = processed.len(),
            intercepted = self.registry.len(),
            interceptors = self.cache.stats().entry_count,
            "deployment processed"
        );
        Ok(processed)
    }

    /// Dispatch one intercepted call
    ///
    /// # Errors
    /// See [`InterceptionDispatcher::dispatch`]
    pub fn dispatch(
        &self,
        target: &mut dyn ManagedInstance,
        declaring: &TypeDescriptor,
        method: &MethodSignature,
        parameters: Vec<Value>,
        tx: &TransactionContext,
    ) -> std::result::Result<Value, InvocationError> {
        self.dispatcher
            .dispatch(target, declaring, method, parameters, tx)
    }
}
