//! Host type lookup
//!
//! The extractor resolves interceptor classes named in legacy lists through a
//! [`TypeSource`]. Hosts implement it over their own metadata; [`MapTypeSource`]
//! covers manifest-driven hosts and tests.

use bridge_meta::{ClassName, TypeDescriptor};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Lookup of original descriptors by class
pub trait TypeSource: Send + Sync {
    /// Original (unrewritten) descriptor of a class, if known
    fn descriptor_of(&self, class: &ClassName) -> Option<Arc<TypeDescriptor>>;
}

impl<S: TypeSource + ?Sized> TypeSource for Arc<S> {
    fn descriptor_of(&self, class: &ClassName) -> Option<Arc<TypeDescriptor>> {
        (**self).descriptor_of(class)
    }
}

impl TypeSource for HashMap<ClassName, Arc<TypeDescriptor>> {
    fn descriptor_of(&self, class: &ClassName) -> Option<Arc<TypeDescriptor>> {
        self.get(class).cloned()
    }
}

/// Concurrent in-memory type source
///
/// Types can be registered while other threads resolve.
#[derive(Debug, Default)]
pub struct MapTypeSource {
    types: DashMap<ClassName, Arc<TypeDescriptor>>,
}

impl MapTypeSource {
    /// Create empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register descriptor, replacing any previous one for the class
    pub fn insert(&self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.types
            .insert(descriptor.class().clone(), Arc::clone(&descriptor));
        descriptor
    }

    /// Number of known types
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if no type is known
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<TypeDescriptor> for MapTypeSource {
    fn from_iter<I: IntoIterator<Item = TypeDescriptor>>(iter: I) -> Self {
        let source = Self::new();
        for descriptor in iter {
            source.insert(descriptor);
        }
        source
    }
}

impl TypeSource for MapTypeSource {
    fn descriptor_of(&self, class: &ClassName) -> Option<Arc<TypeDescriptor>> {
        self.types.get(class).map(|entry| Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_source_resolves_registered_types() {
        let source: MapTypeSource = [
            TypeDescriptor::builder("demo.A").build(),
            TypeDescriptor::builder("demo.B").build(),
        ]
        .into_iter()
        .collect();

        assert_eq!(source.len(), 2);
        assert!(source.descriptor_of(&ClassName::new("demo.A")).is_some());
        assert!(source.descriptor_of(&ClassName::new("demo.C")).is_none());
    }

    #[test]
    fn hash_map_is_a_source() {
        let ty = Arc::new(TypeDescriptor::builder("demo.A").build());
        let mut map = HashMap::new();
        map.insert(ty.class().clone(), Arc::clone(&ty));

        let found = map.descriptor_of(&ClassName::new("demo.A")).unwrap();
        assert!(Arc::ptr_eq(&found, &ty));
    }
}
