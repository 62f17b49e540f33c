//! Injection point rewriting
//!
//! Provides [`InjectionRewriter`], which turns legacy resource bindings into
//! modern injection points.
//!
//! # Rules
//! - A field or method carrying a legacy resource marker and no [`Marker::Inject`]
//!   gets [`Marker::Inject`] added.
//! - All fields are processed before any method. Fields rewritten in this pass
//!   are remembered by name.
//! - A rewritten method whose name starts with [`SETTER_PREFIX`] must not imply
//!   a remembered field (suffix compared case-insensitively). A field that
//!   already carries [`Marker::Inject`] is not remembered, so its setter passes.

use crate::error::ConfigurationError;
use bridge_meta::{DescriptorPatch, Marker, MarkerKind, MarkerSet, MethodDescriptor, TypeDescriptor};
use tracing::debug;

/// Prefix stripped from setter names to derive the implied field name
pub const SETTER_PREFIX: &str = "set";

/// Stateless rewriter for legacy injection points
///
/// Pure: the same descriptor always yields the same patch and no I/O happens.
#[derive(Debug, Clone, Copy, Default)]
pub struct InjectionRewriter;

impl InjectionRewriter {
    /// Create rewriter
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compute the injection patch for a type
    ///
    /// # Errors
    /// Returns `ConfigurationError::DuplicateInjectionPoint` if a setter
    /// re-declares a dependency already declared on its field
    pub fn rewrite(&self, descriptor: &TypeDescriptor) -> Result<DescriptorPatch, ConfigurationError> {
        let mut patch = DescriptorPatch::for_type(descriptor);
        let mut processed_fields: Vec<&str> = Vec::new();

        for field in descriptor.fields() {
            if needs_injection(&field.markers) {
                debug!(class = %descriptor.class(), field = %field.name, "adding injection marker to field");
                patch.add_to_field(field.name.clone(), Marker::Inject);
                processed_fields.push(&field.name);
            }
        }

        for method in descriptor.methods() {
            if needs_injection(&method.markers) {
                validate_dependency_configuration(descriptor, method, &processed_fields)?;
                debug!(class = %descriptor.class(), method = %method.signature, "adding injection marker to method");
                patch.add_to_method(method.signature.clone(), Marker::Inject);
            }
        }

        Ok(patch)
    }

    /// Compute and apply the injection patch
    ///
    /// # Errors
    /// Same as [`InjectionRewriter::rewrite`]
    pub fn rewritten(&self, descriptor: &TypeDescriptor) -> Result<TypeDescriptor, ConfigurationError> {
        let patch = self.rewrite(descriptor)?;
        Ok(descriptor.apply(&patch)?)
    }
}

fn needs_injection(markers: &MarkerSet) -> bool {
    !markers.contains_kind(MarkerKind::Inject) && markers.legacy_resource().is_some()
}

fn validate_dependency_configuration(
    descriptor: &TypeDescriptor,
    method: &MethodDescriptor,
    processed_fields: &[&str],
) -> Result<(), ConfigurationError> {
    let Some(suffix) = method.name().strip_prefix(SETTER_PREFIX) else {
        return Ok(());
    };

    let suffix = suffix.to_lowercase();
    if processed_fields.iter().any(|field| field.to_lowercase() == suffix) {
        return Err(ConfigurationError::DuplicateInjectionPoint {
            class: descriptor.class().clone(),
            method: method.name().to_string(),
        });
    }
    Ok(())
}
