//! Immutable type descriptors
//!
//! A [`TypeDescriptor`] is the snapshot of a component's declared members and
//! markers handed out by the host container. It is never mutated; rewriting
//! produces a new descriptor by applying a [`DescriptorPatch`](crate::DescriptorPatch).

use crate::class::ClassName;
use crate::marker::{Marker, MarkerKind, MarkerSet};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Declared field and its markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,

    /// Markers on the field
    #[serde(default)]
    pub markers: MarkerSet,
}

impl FieldDescriptor {
    /// Create field with markers
    #[must_use]
    pub fn new(name: impl Into<String>, markers: impl IntoIterator<Item = Marker>) -> Self {
        Self {
            name: name.into(),
            markers: markers.into_iter().collect(),
        }
    }
}

/// Identity of a method within its declaring type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Method name
    pub name: String,

    /// Parameter type names, in order
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl MethodSignature {
    /// Create signature
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    /// Signature of a method without parameters
    #[inline]
    #[must_use]
    pub fn nullary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }
}

impl Display for MethodSignature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameters.join(", "))
    }
}

/// Declared method and its markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Method identity
    #[serde(flatten)]
    pub signature: MethodSignature,

    /// Markers on the method
    #[serde(default)]
    pub markers: MarkerSet,
}

impl MethodDescriptor {
    /// Create method with markers
    #[must_use]
    pub fn new(signature: MethodSignature, markers: impl IntoIterator<Item = Marker>) -> Self {
        Self {
            signature,
            markers: markers.into_iter().collect(),
        }
    }

    /// Method name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// Check marker presence
    #[inline]
    #[must_use]
    pub fn is_marked(&self, kind: MarkerKind) -> bool {
        self.markers.contains_kind(kind)
    }
}

/// Immutable snapshot of a type's declared metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    class: ClassName,
    #[serde(default)]
    markers: MarkerSet,
    #[serde(default)]
    fields: Vec<FieldDescriptor>,
    #[serde(default)]
    methods: Vec<MethodDescriptor>,
}

impl TypeDescriptor {
    /// Start building a descriptor
    #[inline]
    #[must_use]
    pub fn builder(class: impl Into<ClassName>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(class.into())
    }

    /// Owning class
    #[inline]
    #[must_use]
    pub fn class(&self) -> &ClassName {
        &self.class
    }

    /// Class-level markers
    #[inline]
    #[must_use]
    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    /// Fields in declaration order
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Methods in declaration order
    #[inline]
    #[must_use]
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Find field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Find method by signature
    #[must_use]
    pub fn method(&self, signature: &MethodSignature) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| &m.signature == signature)
    }

    /// Check class-level marker presence
    #[inline]
    #[must_use]
    pub fn is_marked(&self, kind: MarkerKind) -> bool {
        self.markers.contains_kind(kind)
    }

    /// Class-level marker of the given kind
    #[inline]
    #[must_use]
    pub fn marker(&self, kind: MarkerKind) -> Option<&Marker> {
        self.markers.get(kind)
    }

    /// Check whether any of the kinds appears on the type or any of its members
    #[must_use]
    pub fn mentions_any(&self, kinds: &[MarkerKind]) -> bool {
        self.markers.contains_any(kinds)
            || self.fields.iter().any(|f| f.markers.contains_any(kinds))
            || self.methods.iter().any(|m| m.markers.contains_any(kinds))
    }

    /// Class-level legacy interceptor list, if declared
    #[inline]
    #[must_use]
    pub fn legacy_interceptors(&self) -> Option<&[ClassName]> {
        self.markers.legacy_interceptors()
    }

    /// Methods declaring their own legacy interceptor list
    pub fn methods_with_legacy_interceptors(
        &self,
    ) -> impl Iterator<Item = (&MethodDescriptor, &[ClassName])> {
        self.methods
            .iter()
            .filter_map(|m| m.markers.legacy_interceptors().map(|list| (m, list)))
    }

    /// Around-call entry points, in declaration order
    pub fn around_invoke_methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods
            .iter()
            .filter(|m| m.is_marked(MarkerKind::AroundInvoke))
    }

    /// Calls on this type run inside a unit of work
    #[inline]
    #[must_use]
    pub fn is_transactional(&self) -> bool {
        self.is_marked(MarkerKind::Transactional)
    }

    pub(crate) fn markers_mut(&mut self) -> &mut MarkerSet {
        &mut self.markers
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut FieldDescriptor> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub(crate) fn method_mut(&mut self, signature: &MethodSignature) -> Option<&mut MethodDescriptor> {
        self.methods.iter_mut().find(|m| &m.signature == signature)
    }
}

/// Builder for [`TypeDescriptor`]
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    descriptor: TypeDescriptor,
}

impl TypeDescriptorBuilder {
    fn new(class: ClassName) -> Self {
        Self {
            descriptor: TypeDescriptor {
                class,
                markers: MarkerSet::new(),
                fields: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    /// Add class-level marker
    #[must_use]
    pub fn marker(mut self, marker: Marker) -> Self {
        self.descriptor.markers.insert(marker);
        self
    }

    /// Add field
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, markers: impl IntoIterator<Item = Marker>) -> Self {
        self.descriptor.fields.push(FieldDescriptor::new(name, markers));
        self
    }

    /// Add method without parameters
    #[must_use]
    pub fn method(self, name: impl Into<String>, markers: impl IntoIterator<Item = Marker>) -> Self {
        self.method_with(MethodSignature::nullary(name), markers)
    }

    /// Add method with explicit signature
    #[must_use]
    pub fn method_with(
        mut self,
        signature: MethodSignature,
        markers: impl IntoIterator<Item = Marker>,
    ) -> Self {
        self.descriptor
            .methods
            .push(MethodDescriptor::new(signature, markers));
        self
    }

    /// Add single-argument setter
    #[must_use]
    pub fn setter(
        self,
        name: impl Into<String>,
        parameter: impl Into<String>,
        markers: impl IntoIterator<Item = Marker>,
    ) -> Self {
        self.method_with(MethodSignature::new(name, [parameter.into()]), markers)
    }

    /// Finish building
    #[inline]
    #[must_use]
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TypeDescriptor {
        TypeDescriptor::builder("demo.Service")
            .marker(Marker::Stateless)
            .field("repo", [Marker::ejb()])
            .setter("setClock", "demo.Clock", [Marker::resource()])
            .method("audit", [Marker::AroundInvoke])
            .method("business", [Marker::ExcludeClassInterceptors])
            .build()
    }

    #[test]
    fn builder_keeps_declaration_order() {
        let ty = service();
        assert_eq!(ty.class().as_str(), "demo.Service");
        assert_eq!(ty.fields().len(), 1);
        let names: Vec<_> = ty.methods().iter().map(MethodDescriptor::name).collect();
        assert_eq!(names, vec!["setClock", "audit", "business"]);
    }

    #[test]
    fn class_marker_lookup_by_kind() {
        let ty = service();
        assert_eq!(ty.marker(MarkerKind::Stateless), Some(&Marker::Stateless));
        assert_eq!(ty.marker(MarkerKind::Transactional), None);
    }

    #[test]
    fn lookup_by_signature() {
        let ty = service();
        let setter = MethodSignature::new("setClock", ["demo.Clock"]);
        assert!(ty.method(&setter).is_some());
        assert!(ty.method(&MethodSignature::nullary("setClock")).is_none());
    }

    #[test]
    fn mentions_any_looks_at_members() {
        let ty = service();
        assert!(ty.mentions_any(&[MarkerKind::ExcludeClassInterceptors]));
        assert!(ty.mentions_any(&[MarkerKind::Stateless]));
        assert!(!ty.mentions_any(&[MarkerKind::Interceptors]));
    }

    #[test]
    fn around_invoke_methods_are_scanned() {
        let ty = service();
        let entry: Vec<_> = ty.around_invoke_methods().map(MethodDescriptor::name).collect();
        assert_eq!(entry, vec!["audit"]);
    }

    #[test]
    fn signature_display() {
        let sig = MethodSignature::new("save", ["demo.Entity", "bool"]);
        assert_eq!(sig.to_string(), "save(demo.Entity, bool)");
    }

    #[test]
    fn descriptor_deserializes_from_json_manifest() {
        let json = serde_json::json!({
            "class": "demo.Audit",
            "markers": [{ "marker": "interceptor" }],
            "fields": [{ "name": "em", "markers": [{ "marker": "legacy", "value": { "kind": "persistence_context" } }] }],
            "methods": [{ "name": "around", "parameters": ["Ctx"], "markers": [{ "marker": "around_invoke" }] }]
        });
        let ty: TypeDescriptor = serde_json::from_value(json).unwrap();

        assert!(ty.is_marked(MarkerKind::Interceptor));
        assert!(ty.field("em").unwrap().markers.contains_kind(MarkerKind::Legacy));
        assert_eq!(ty.around_invoke_methods().count(), 1);
    }
}
