//! Bridge Load-Time Rewriting
//!
//! Rewrites legacy component metadata into the form the modern container
//! understands, without mutating the descriptors the host hands out.
//!
//! # Core Concepts
//!
//! - [`InjectionRewriter`]: Adds modern injection markers to legacy resource bindings
//! - [`BindingExtractor`]: Replaces legacy interceptor lists with the wrapper marker
//! - [`BindingRegistry`]: Intercepted class to resolved interceptor chains
//! - [`ModifiedInterceptorCache`]: Rewrites each interceptor class at most once
//! - [`HookPipeline`]: Per-type callbacks the host drives during discovery
//!
//! # Example
//!
//! ```rust
//! use bridge_meta::{Marker, MarkerKind, TypeDescriptor};
//! use bridge_rewrite::{
//!     BindingExtractor, BindingRegistry, HookOptions, HookPipeline, MapTypeSource,
//!     ModifiedInterceptorCache,
//! };
//! use std::sync::Arc;
//!
//! let source = MapTypeSource::new();
//! source.insert(
//!     TypeDescriptor::builder("demo.Audit")
//!         .method("around", [Marker::AroundInvoke])
//!         .build(),
//! );
//!
//! let registry = BindingRegistry::new();
//! let extractor = BindingExtractor::new(
//!     registry.clone(),
//!     ModifiedInterceptorCache::new(),
//!     Arc::new(source),
//! );
//! let pipeline = HookPipeline::standard(extractor, HookOptions::default());
//!
//! let service = TypeDescriptor::builder("demo.Service")
//!     .marker(Marker::Stateless)
//!     .marker(Marker::interceptors(["demo.Audit"]))
//!     .build();
//! let processed = pipeline.process(Arc::new(service)).unwrap();
//!
//! assert!(processed.is_marked(MarkerKind::InterceptorWrapper));
//! assert_eq!(registry.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod extractor;
pub mod hooks;
pub mod injection;
pub mod registry;
pub mod source;

pub use error::ConfigurationError;
pub use extractor::BindingExtractor;
pub use hooks::{
    HookOptions, HookPipeline, InterceptorTypeHook, LegacyInterceptorsHook, ProcessType,
    SessionComponentHook, TypeHook,
};
pub use injection::{InjectionRewriter, SETTER_PREFIX};
pub use registry::{BindingRegistry, CacheStats, ChainMember, InterceptorBinding, ModifiedInterceptorCache};
pub use source::{MapTypeSource, TypeSource};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
