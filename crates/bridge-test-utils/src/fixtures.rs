//! Descriptor fixtures shared by the workspace test suites

use bridge_dispatch::TransactionalInterceptor;
use bridge_meta::{Marker, MethodSignature, TypeDescriptor};

/// Interceptor with a single `around` entry point
pub fn interceptor(class: &str) -> TypeDescriptor {
    TypeDescriptor::builder(class)
        .marker(Marker::Interceptor)
        .method_with(
            MethodSignature::new("around", ["InvocationContext"]),
            [Marker::AroundInvoke],
        )
        .build()
}

/// Interceptor whose own body declares a legacy resource
pub fn interceptor_with_legacy_resource(class: &str) -> TypeDescriptor {
    TypeDescriptor::builder(class)
        .marker(Marker::Interceptor)
        .field("em", [Marker::persistence_context()])
        .method_with(
            MethodSignature::new("around", ["InvocationContext"]),
            [Marker::AroundInvoke],
        )
        .build()
}

/// Interceptor with no around-invoke entry point
pub fn interceptor_without_entry_point(class: &str) -> TypeDescriptor {
    TypeDescriptor::builder(class)
        .marker(Marker::Interceptor)
        .method("helper", [])
        .build()
}

/// Built-in transactional interceptor descriptor
pub fn transactional_interceptor() -> TypeDescriptor {
    TransactionalInterceptor::descriptor()
}

/// Interceptor marked transactional, with a single `around` entry point
pub fn transactional(class: &str) -> TypeDescriptor {
    TypeDescriptor::builder(class)
        .marker(Marker::Interceptor)
        .marker(Marker::Transactional)
        .method_with(
            MethodSignature::new("around", ["InvocationContext"]),
            [Marker::AroundInvoke],
        )
        .build()
}

/// Plain component listing legacy interceptors, not a session component
pub fn intercepted_bean(class_level: &[&str]) -> TypeDescriptor {
    TypeDescriptor::builder("demo.Ledger")
        .marker(Marker::interceptors(class_level.iter().copied()))
        .method_with(transfer(), [])
        .build()
}

/// Plain component without any interceptor list
pub fn plain_bean() -> TypeDescriptor {
    TypeDescriptor::builder("demo.Plain")
        .method_with(transfer(), [])
        .build()
}

/// Business method taking one string
pub fn transfer() -> MethodSignature {
    MethodSignature::new("transfer", ["String"])
}

/// Legacy session component with class-level `interceptors` and one method
/// opting out of them
///
/// `report` additionally lists `method_level`.
pub fn legacy_service(class_level: &[&str], method_level: &[&str]) -> TypeDescriptor {
    TypeDescriptor::builder("demo.AccountService")
        .marker(Marker::Stateless)
        .marker(Marker::interceptors(class_level.iter().copied()))
        .field("repository", [Marker::ejb()])
        .method_with(transfer(), [])
        .method(
            "report",
            [
                Marker::ExcludeClassInterceptors,
                Marker::interceptors(method_level.iter().copied()),
            ],
        )
        .method("balance", [Marker::Transactional])
        .build()
}

/// Setter `setX` declared ahead of its field `x`, both legacy
pub fn setter_then_field_bean() -> TypeDescriptor {
    TypeDescriptor::builder("demo.OutOfOrder")
        .setter("setX", "Dependency", [Marker::ejb()])
        .field("x", [Marker::ejb()])
        .build()
}

/// Field already carrying `Inject`, plus a legacy setter for it
pub fn injected_field_with_legacy_setter() -> TypeDescriptor {
    TypeDescriptor::builder("demo.HalfMigrated")
        .field("clock", [Marker::Inject, Marker::resource()])
        .setter("setClock", "Clock", [Marker::resource()])
        .build()
}

/// Persistence context declared on both field and setter
pub fn invalid_bean() -> TypeDescriptor {
    TypeDescriptor::builder("demo.InvalidBean")
        .field("entityManager", [Marker::persistence_context()])
        .setter(
            "setEntityManager",
            "EntityManager",
            [Marker::persistence_context()],
        )
        .build()
}
