//! Type-processing hooks
//!
//! The host calls [`HookPipeline::process`] once per discovered type, before it
//! finalizes component definitions. Each registered [`TypeHook`] whose filter
//! matches the original descriptor gets a [`ProcessType`] event and may replace
//! the effective descriptor once.

use crate::error::ConfigurationError;
use crate::extractor::BindingExtractor;
use crate::injection::InjectionRewriter;
use bridge_meta::{ClassName, DescriptorPatch, Marker, MarkerKind, PatchError, TypeDescriptor};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Callback invoked for each discovered type matching its filter
pub trait TypeHook: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    /// Hook fires if the original descriptor carries any of these kinds
    /// on the type or any member
    fn filter(&self) -> &[MarkerKind];

    /// Process one type
    ///
    /// # Errors
    /// Any error aborts processing of the type
    fn process(&self, event: &mut ProcessType) -> Result<(), ConfigurationError>;
}

/// Per-type processing event
#[derive(Debug)]
pub struct ProcessType {
    original: Arc<TypeDescriptor>,
    effective: Arc<TypeDescriptor>,
    hook: &'static str,
    replaced: bool,
}

impl ProcessType {
    fn new(original: Arc<TypeDescriptor>) -> Self {
        Self {
            effective: Arc::clone(&original),
            original,
            hook: "",
            replaced: false,
        }
    }

    fn begin_pass(&mut self, hook: &'static str) {
        self.hook = hook;
        self.replaced = false;
    }

    /// Descriptor as discovered by the host
    #[inline]
    #[must_use]
    pub fn original(&self) -> &TypeDescriptor {
        &self.original
    }

    /// Descriptor after the hooks that ran so far
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.effective
    }

    /// Processed class
    #[inline]
    #[must_use]
    pub fn class(&self) -> &ClassName {
        self.original.class()
    }

    /// Replace the effective descriptor
    ///
    /// # Errors
    /// - `ConfigurationError::DescriptorReplacedTwice` on a second call within one hook
    /// - `ConfigurationError::Patch` if the descriptor belongs to another class
    pub fn set_descriptor(&mut self, descriptor: TypeDescriptor) -> Result<(), ConfigurationError> {
        if self.replaced {
            return Err(ConfigurationError::DescriptorReplacedTwice {
                class: self.class().clone(),
                hook: self.hook,
            });
        }
        if descriptor.class() != self.class() {
            return Err(PatchError::ClassMismatch {
                expected: self.class().clone(),
                actual: descriptor.class().clone(),
            }
            .into());
        }
        self.effective = Arc::new(descriptor);
        self.replaced = true;
        Ok(())
    }

    /// Apply a patch to the effective descriptor and install the result
    ///
    /// An empty patch leaves the descriptor alone and does not count as a replacement.
    ///
    /// # Errors
    /// Same as [`ProcessType::set_descriptor`], plus patch application errors
    pub fn apply(&mut self, patch: &DescriptorPatch) -> Result<(), ConfigurationError> {
        if patch.is_empty() {
            return Ok(());
        }
        let next = self.effective.apply(patch)?;
        self.set_descriptor(next)
    }

    fn finish(self) -> Arc<TypeDescriptor> {
        self.effective
    }
}

/// Ordered set of type hooks
pub struct HookPipeline {
    hooks: Vec<Box<dyn TypeHook>>,
}

impl Default for HookPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookPipeline")
            .field("hooks", &self.hook_names())
            .finish()
    }
}

/// Switches for the built-in hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookOptions {
    /// Session components gain `Transactional` and `RequestScoped`
    pub promote_session_components: bool,

    /// Register the hook rewriting modern interceptor types
    pub rewrite_interceptor_types: bool,
}

impl Default for HookOptions {
    fn default() -> Self {
        Self {
            promote_session_components: true,
            rewrite_interceptor_types: true,
        }
    }
}

impl HookPipeline {
    /// Create empty pipeline
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Pipeline with the built-in hooks, in their fixed order
    #[must_use]
    pub fn standard(extractor: BindingExtractor, options: HookOptions) -> Self {
        let mut pipeline = Self::new();
        pipeline.register(SessionComponentHook {
            extractor: extractor.clone(),
            promote: options.promote_session_components,
        });
        if options.rewrite_interceptor_types {
            pipeline.register(InterceptorTypeHook);
        }
        pipeline.register(LegacyInterceptorsHook { extractor });
        pipeline
    }

    /// Append hook; hooks run in registration order
    pub fn register<H: TypeHook + 'static>(&mut self, hook: H) {
        self.hooks.push(Box::new(hook));
    }

    /// Names of registered hooks, in order
    #[must_use]
    pub fn hook_names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Run every matching hook against one type
    ///
    /// Returns the final effective descriptor; if no hook replaced it, the
    /// returned `Arc` is the one passed in.
    ///
    /// # Errors
    /// The first hook error; no partially processed descriptor is returned
    pub fn process(
        &self,
        descriptor: Arc<TypeDescriptor>,
    ) -> Result<Arc<TypeDescriptor>, ConfigurationError> {
        let mut event = ProcessType::new(descriptor);
        for hook in &self.hooks {
            if !event.original().mentions_any(hook.filter()) {
                trace!(class = %event.class(), hook = hook.name(), "hook filter did not match");
                continue;
            }
            debug!(class = %event.class(), hook = hook.name(), "running type hook");
            event.begin_pass(hook.name());
            hook.process(&mut event)?;
        }
        Ok(event.finish())
    }
}

/// Rewrites legacy session components
///
/// Promotes them to transactional request-scoped components, rewrites their
/// injection points and extracts their interceptor bindings.
#[derive(Debug)]
pub struct SessionComponentHook {
    extractor: BindingExtractor,
    promote: bool,
}

impl TypeHook for SessionComponentHook {
    fn name(&self) -> &'static str {
        "session-component"
    }

    fn filter(&self) -> &[MarkerKind] {
        &[MarkerKind::Stateless, MarkerKind::MessageDriven]
    }

    fn process(&self, event: &mut ProcessType) -> Result<(), ConfigurationError> {
        let descriptor = event.descriptor();
        let mut patch = DescriptorPatch::for_type(descriptor);
        if self.promote {
            patch.add_to_type(Marker::Transactional);
            patch.add_to_type(Marker::RequestScoped);
        }
        let patch = patch
            .merge(InjectionRewriter::new().rewrite(descriptor)?)?
            .merge(self.extractor.extract_and_register(descriptor)?)?;
        event.apply(&patch)
    }
}

/// Rewrites injection points of modern interceptor types
#[derive(Debug, Clone, Copy, Default)]
pub struct InterceptorTypeHook;

impl TypeHook for InterceptorTypeHook {
    fn name(&self) -> &'static str {
        "interceptor-type"
    }

    fn filter(&self) -> &[MarkerKind] {
        &[MarkerKind::Interceptor]
    }

    fn process(&self, event: &mut ProcessType) -> Result<(), ConfigurationError> {
        let patch = InjectionRewriter::new().rewrite(event.descriptor())?;
        event.apply(&patch)
    }
}

/// Extracts legacy interceptor lists from any type declaring them
#[derive(Debug)]
pub struct LegacyInterceptorsHook {
    extractor: BindingExtractor,
}

impl TypeHook for LegacyInterceptorsHook {
    fn name(&self) -> &'static str {
        "legacy-interceptors"
    }

    fn filter(&self) -> &[MarkerKind] {
        &[MarkerKind::Interceptors]
    }

    fn process(&self, event: &mut ProcessType) -> Result<(), ConfigurationError> {
        let patch = self.extractor.extract_and_register(event.descriptor())?;
        event.apply(&patch)
    }
}
