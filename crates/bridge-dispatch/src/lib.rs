//! Bridge Call-Time Dispatch
//!
//! Executes the interceptor chains recorded at load time around intercepted
//! calls.
//!
//! # Core Concepts
//!
//! - [`InterceptionDispatcher`]: Single entry point for intercepted calls
//! - [`InvocationContext`]: What an around-invoke entry point sees; `proceed()` continues the chain
//! - [`InstanceLifecycle`]: Fresh, non-contextual chain member instances per call
//! - [`TransactionCoordinator`]: Reentrant begin/commit/rollback keyed on nesting depth
//! - [`ManagedInstance`] / [`InstanceFactory`] / [`UnitOfWork`]: Host container seams
//!
//! # Threading
//!
//! Dispatch is synchronous. The registry may be read from any thread, but one
//! [`TransactionContext`] must only ever serve one call chain at a time.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod instance;
pub mod lifecycle;
pub mod transaction;

pub use context::{ContextData, InvocationContext};
pub use dispatcher::InterceptionDispatcher;
pub use error::{
    ApplicationError, BoxError, InvocationError, LifecycleError, LifecyclePhase, PersistenceError,
    PersistenceErrorKind,
};
pub use instance::{InstanceFactory, ManagedInstance};
pub use lifecycle::{InstanceLifecycle, InstanceScope, MaterializedMember};
pub use transaction::{
    RollbackPolicy, TransactionContext, TransactionCoordinator, TransactionalInterceptor, UnitOfWork,
    TRANSACTIONAL_INTERCEPTOR,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    //! Chain semantics against minimal in-crate fakes

    use super::*;
    use bridge_meta::{Marker, MethodSignature, TypeDescriptor};
    use bridge_rewrite::{BindingRegistry, ChainMember, InterceptorBinding};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use parking_lot::Mutex;
    use std::sync::Arc;

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Interceptor behaviour keyed by class name
    #[derive(Clone, Copy)]
    enum Behaviour {
        Proceed,
        ReturnNull,
        Answer(i64),
    }

    struct Interceptor {
        name: String,
        behaviour: Behaviour,
        journal: Journal,
    }

    impl ManagedInstance for Interceptor {
        fn around_invoke(
            &mut self,
            _entry_point: &MethodSignature,
            ctx: &mut InvocationContext<'_>,
        ) -> Result<Value, InvocationError> {
            self.journal.lock().push(format!("around:{}", self.name));
            match self.behaviour {
                Behaviour::Proceed => ctx.proceed(),
                Behaviour::ReturnNull => Ok(Value::Null),
                Behaviour::Answer(n) => Ok(json!(n)),
            }
        }
    }

    struct Target {
        journal: Journal,
    }

    impl ManagedInstance for Target {
        fn invoke(
            &mut self,
            method: &MethodSignature,
            _arguments: &[Value],
            _tx: &TransactionContext,
        ) -> Result<Value, InvocationError> {
            self.journal.lock().push(format!("invoke:{}", method.name));
            Ok(json!("original"))
        }
    }

    struct Factory {
        behaviours: HashMap<String, Behaviour>,
        journal: Journal,
    }

    impl InstanceFactory for Factory {
        fn produce(&self, descriptor: &TypeDescriptor) -> Result<Box<dyn ManagedInstance>, LifecycleError> {
            let name = descriptor.class().simple_name().to_string();
            let behaviour = self.behaviours.get(&name).copied().unwrap_or(Behaviour::Proceed);
            Ok(Box::new(Interceptor {
                name,
                behaviour,
                journal: Arc::clone(&self.journal),
            }))
        }

        fn inject(&self, _: &TypeDescriptor, _: &mut dyn ManagedInstance) -> Result<(), LifecycleError> {
            Ok(())
        }

        fn post_construct(&self, _: &TypeDescriptor, _: &mut dyn ManagedInstance) -> Result<(), LifecycleError> {
            Ok(())
        }

        fn pre_destroy(&self, descriptor: &TypeDescriptor, _: &mut dyn ManagedInstance) -> Result<(), LifecycleError> {
            self.journal
                .lock()
                .push(format!("destroy:{}", descriptor.class().simple_name()));
            Ok(())
        }

        fn dispose(&self, _: &TypeDescriptor, _: Box<dyn ManagedInstance>) -> Result<(), LifecycleError> {
            Ok(())
        }
    }

    struct NoUnit;

    impl UnitOfWork for NoUnit {
        fn is_open(&self) -> bool {
            false
        }
        fn is_active(&self) -> bool {
            false
        }
        fn begin(&mut self) -> Result<(), PersistenceError> {
            Ok(())
        }
        fn commit(&mut self) -> Result<(), PersistenceError> {
            Ok(())
        }
        fn rollback(&mut self) -> Result<(), PersistenceError> {
            Ok(())
        }
        fn set_rollback_only(&mut self) {}
        fn is_rollback_only(&self) -> bool {
            false
        }
        fn clear(&mut self) {}
    }

    fn interceptor(name: &str) -> ChainMember {
        Arc::new(
            TypeDescriptor::builder(name)
                .marker(Marker::Interceptor)
                .method("around", [Marker::AroundInvoke])
                .build(),
        )
    }

    fn run(behaviours: &[(&str, Behaviour)]) -> (Value, Vec<String>) {
        let journal = Journal::default();
        let registry = BindingRegistry::new();
        let class_level = behaviours
            .iter()
            .map(|(name, _)| interceptor(&format!("demo.{name}")))
            .collect();
        registry.register("demo.Bean".into(), InterceptorBinding::new(class_level, HashMap::new()));

        let factory = Factory {
            behaviours: behaviours.iter().map(|(n, b)| ((*n).to_string(), *b)).collect(),
            journal: Arc::clone(&journal),
        };
        let dispatcher = InterceptionDispatcher::new(registry, InstanceLifecycle::new(Arc::new(factory)));
        let bean = TypeDescriptor::builder("demo.Bean")
            .marker(Marker::InterceptorWrapper)
            .method("business", [])
            .build();
        let mut target = Target {
            journal: Arc::clone(&journal),
        };

        let value = dispatcher
            .dispatch(
                &mut target,
                &bean,
                &MethodSignature::nullary("business"),
                Vec::new(),
                &TransactionContext::new(NoUnit),
            )
            .unwrap();
        let entries = journal.lock().clone();
        (value, entries)
    }

    #[test]
    fn null_returning_members_fall_through_to_original_once() {
        let (value, journal) = run(&[("A", Behaviour::ReturnNull), ("B", Behaviour::ReturnNull)]);
        assert_eq!(value, json!("original"));
        assert_eq!(
            journal,
            vec!["around:A", "around:B", "invoke:business", "destroy:A", "destroy:B"]
        );
    }

    #[test]
    fn proceeding_members_nest() {
        let (value, journal) = run(&[("A", Behaviour::Proceed), ("B", Behaviour::Proceed)]);
        assert_eq!(value, json!("original"));
        assert_eq!(
            journal,
            vec!["around:A", "around:B", "invoke:business", "destroy:A", "destroy:B"]
        );
    }

    #[test]
    fn non_null_result_short_circuits() {
        let (value, journal) = run(&[("A", Behaviour::Answer(42)), ("B", Behaviour::Proceed)]);
        assert_eq!(value, json!(42));
        assert_eq!(journal, vec!["around:A", "destroy:A", "destroy:B"]);
    }
}
