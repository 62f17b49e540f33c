//! Property tests for injection rewriting and binding extraction

use bridge_meta::{Marker, MarkerKind, PatchOp, TypeDescriptor};
use bridge_rewrite::{
    BindingExtractor, BindingRegistry, ConfigurationError, InjectionRewriter, MapTypeSource,
    ModifiedInterceptorCache,
};
use bridge_test_utils::fixtures;
use proptest::prelude::*;
use std::sync::Arc;

fn legacy_marker() -> impl Strategy<Value = Marker> {
    prop_oneof![
        Just(Marker::ejb()),
        Just(Marker::persistence_context()),
        Just(Marker::resource()),
    ]
}

fn member_name() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z]{0,10}"
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

fn added_inject_count(descriptor: &TypeDescriptor) -> usize {
    InjectionRewriter::new()
        .rewrite(descriptor)
        .unwrap()
        .entries()
        .iter()
        .filter(|e| e.op == PatchOp::Add(Marker::Inject))
        .count()
}

proptest! {
    #[test]
    fn single_field_declaration_is_rewritten(name in member_name(), marker in legacy_marker()) {
        prop_assume!(name != "untouched");
        let ty = TypeDescriptor::builder("demo.Bean")
            .field(name.clone(), [marker])
            .field("untouched", [])
            .build();

        let rewritten = InjectionRewriter::new().rewritten(&ty).unwrap();
        prop_assert_eq!(added_inject_count(&ty), 1);
        prop_assert!(rewritten.field(&name).unwrap().markers.contains_kind(MarkerKind::Inject));
        prop_assert!(!rewritten.field("untouched").unwrap().markers.contains_kind(MarkerKind::Inject));
    }

    #[test]
    fn single_setter_declaration_is_rewritten(name in member_name(), marker in legacy_marker()) {
        let setter = format!("set{}", capitalize(&name));
        let ty = TypeDescriptor::builder("demo.Bean")
            .field(name, [])
            .setter(setter, "Dependency", [marker])
            .build();

        prop_assert_eq!(added_inject_count(&ty), 1);
    }

    #[test]
    fn differently_named_setter_is_not_a_duplicate(
        field in member_name(),
        other in member_name(),
        field_marker in legacy_marker(),
        setter_marker in legacy_marker(),
    ) {
        prop_assume!(field.to_lowercase() != other.to_lowercase());
        let ty = TypeDescriptor::builder("demo.Bean")
            .field(field, [field_marker])
            .setter(format!("set{}", capitalize(&other)), "Dependency", [setter_marker])
            .build();

        prop_assert_eq!(added_inject_count(&ty), 2);
    }

    #[test]
    fn setter_for_declared_field_is_rejected(
        name in member_name(),
        field_marker in legacy_marker(),
        setter_marker in legacy_marker(),
    ) {
        let setter = format!("set{}", capitalize(&name));
        let ty = TypeDescriptor::builder("demo.Bean")
            .field(name, [field_marker])
            .setter(setter.clone(), "Dependency", [setter_marker])
            .build();

        let err = InjectionRewriter::new().rewrite(&ty).unwrap_err();
        prop_assert_eq!(
            err,
            ConfigurationError::DuplicateInjectionPoint {
                class: ty.class().clone(),
                method: setter,
            }
        );
    }

    #[test]
    fn chain_order_follows_declaration_order(order in Just(vec!["demo.A", "demo.B", "demo.C"]).prop_shuffle()) {
        let source: MapTypeSource = order
            .iter()
            .map(|name| fixtures::interceptor(name))
            .collect();
        let registry = BindingRegistry::new();
        let extractor = BindingExtractor::new(
            registry.clone(),
            ModifiedInterceptorCache::new(),
            Arc::new(source),
        );
        let bean = TypeDescriptor::builder("demo.Bean")
            .marker(Marker::interceptors(order.iter().copied()))
            .build();

        extractor.extract_and_register(&bean).unwrap();

        let binding = registry.get(bean.class()).unwrap();
        let names: Vec<_> = binding.class_level().iter().map(|d| d.class().as_str()).collect();
        prop_assert_eq!(names, order.clone());
    }
}

#[test]
fn setter_declared_before_its_field_is_still_caught() {
    // fields are always processed first, so source order does not matter
    let ty = fixtures::setter_then_field_bean();
    assert!(InjectionRewriter::new().rewrite(&ty).is_err());
}

#[test]
fn already_injected_field_does_not_shadow_legacy_setter() {
    let ty = fixtures::injected_field_with_legacy_setter();
    assert_eq!(added_inject_count(&ty), 1);
}

#[test]
fn invalid_bean_fixture_is_rejected() {
    let err = InjectionRewriter::new()
        .rewrite(&fixtures::invalid_bean())
        .unwrap_err();
    assert!(err.to_string().contains("setEntityManager"));
}
