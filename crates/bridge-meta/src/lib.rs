//! Bridge Metadata Model
//!
//! Immutable type descriptors and the patches that rewrite them.
//!
//! # Core Concepts
//!
//! - [`TypeDescriptor`]: Snapshot of a type's declared fields, methods and markers
//! - [`Marker`]: Closed set of declarative markers (legacy and modern)
//! - [`ResourceKind`]: The three legacy resource-binding kinds
//! - [`DescriptorPatch`]: Ordered marker additions/removals for one type
//! - [`ClassName`]: Identity every registry is keyed by
//!
//! # Example
//!
//! ```rust
//! use bridge_meta::{DescriptorPatch, Marker, MarkerKind, TypeDescriptor};
//!
//! let bean = TypeDescriptor::builder("demo.Service")
//!     .field("repository", [Marker::ejb()])
//!     .build();
//!
//! let mut patch = DescriptorPatch::for_type(&bean);
//! patch.add_to_field("repository", Marker::Inject);
//!
//! let rewritten = bean.apply(&patch).unwrap();
//! assert!(rewritten.field("repository").unwrap().markers.contains_kind(MarkerKind::Inject));
//! assert!(!bean.field("repository").unwrap().markers.contains_kind(MarkerKind::Inject));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod class;
mod descriptor;
mod marker;
mod patch;

pub use class::{ClassName, ClassNameError};
pub use descriptor::{
    FieldDescriptor, MethodDescriptor, MethodSignature, TypeDescriptor, TypeDescriptorBuilder,
};
pub use marker::{Marker, MarkerKind, MarkerSet, ResourceKind};
pub use patch::{DescriptorPatch, MemberPath, PatchEntry, PatchError, PatchOp};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use proptest::prelude::*;

    fn marker_strategy() -> impl Strategy<Value = Marker> {
        prop_oneof![
            Just(Marker::Inject),
            Just(Marker::ejb()),
            Just(Marker::persistence_context()),
            Just(Marker::resource()),
            Just(Marker::Transactional),
            Just(Marker::AroundInvoke),
        ]
    }

    proptest! {
        #[test]
        fn applying_a_patch_never_mutates_the_source(
            field_markers in proptest::collection::vec(marker_strategy(), 0..4),
            added in marker_strategy(),
        ) {
            let source = TypeDescriptor::builder("demo.Prop")
                .field("value", field_markers)
                .build();
            let before = source.clone();

            let mut patch = DescriptorPatch::for_type(&source);
            patch.add_to_field("value", added.clone());
            patch.remove_from_type(MarkerKind::Legacy);

            let after = source.apply(&patch).unwrap();

            prop_assert_eq!(&source, &before);
            prop_assert!(after.field("value").unwrap().markers.iter().any(|m| m == &added));
        }
    }

    #[test]
    fn descriptor_patch_roundtrip_through_json() {
        let bean = TypeDescriptor::builder("demo.Bean")
            .method("run", [Marker::interceptors(["demo.A", "demo.B"])])
            .build();
        let mut patch = DescriptorPatch::for_type(&bean);
        patch.remove_from_method(MethodSignature::nullary("run"), MarkerKind::Interceptors);
        patch.add_to_method(MethodSignature::nullary("run"), Marker::InterceptorWrapper);

        let json = serde_json::to_string(&patch).unwrap();
        let back: DescriptorPatch = serde_json::from_str(&json).unwrap();
        assert_eq!(bean.apply(&back).unwrap(), bean.apply(&patch).unwrap());
    }
}
