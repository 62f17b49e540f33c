//! Interception dispatch
//!
//! [`InterceptionDispatcher::dispatch`] is the runtime entry point the host
//! calls whenever the wrapper marker fires.
//!
//! # Dispatch
//! 1. No binding registered for the declaring class: invoke the original call
//! 2. Build the chain: class-level members (unless the method opts out) then
//!    method-level members for the exact method
//! 3. Materialize every member, in order
//! 4. Drive the chain, wrapped in a unit of work if anything involved is transactional
//! 5. Tear every member down, whatever the outcome

use crate::context::{run_chain, ContextData};
use crate::error::InvocationError;
use crate::instance::ManagedInstance;
use crate::lifecycle::InstanceLifecycle;
use crate::transaction::{TransactionContext, TransactionCoordinator};
use bridge_meta::{MarkerKind, MethodSignature, TypeDescriptor};
use bridge_rewrite::{BindingRegistry, ChainMember};
use serde_json::Value;
use tracing::{debug, debug_span, warn};
use uuid::Uuid;

/// Runtime entry point for intercepted calls
#[derive(Debug, Clone)]
pub struct InterceptionDispatcher {
    registry: BindingRegistry,
    lifecycle: InstanceLifecycle,
    coordinator: TransactionCoordinator,
    transactions: bool,
}

impl InterceptionDispatcher {
    /// Create dispatcher reading `registry`
    #[must_use]
    pub fn new(registry: BindingRegistry, lifecycle: InstanceLifecycle) -> Self {
        Self {
            registry,
            lifecycle,
            coordinator: TransactionCoordinator::new(),
            transactions: true,
        }
    }

    /// Enable or disable unit-of-work wrapping
    #[must_use]
    pub fn with_transactions(mut self, enabled: bool) -> Self {
        self.transactions = enabled;
        self
    }

    /// Replace the transaction coordinator
    #[must_use]
    pub fn with_coordinator(mut self, coordinator: TransactionCoordinator) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Registry consulted on every call
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Dispatch one intercepted call
    ///
    /// `declaring` is the effective (rewritten) descriptor of the class
    /// declaring `method`.
    ///
    /// # Errors
    /// - Any error raised by a chain member or the original call, unchanged
    /// - `InvocationError::MissingEntryPoint` if a member has no around-invoke method
    /// - `InvocationError::Lifecycle` if materialization fails, or if teardown
    ///   fails after an otherwise successful call
    pub fn dispatch(
        &self,
        target: &mut dyn ManagedInstance,
        declaring: &TypeDescriptor,
        method: &MethodSignature,
        parameters: Vec<Value>,
        tx: &TransactionContext,
    ) -> Result<Value, InvocationError> {
        let class = declaring.class();
        let span = debug_span!("dispatch", invocation = %Uuid::new_v4(), class = %class, method = %method);
        let _entered = span.enter();

        let Some(binding) = self.registry.get(class) else {
            debug!("no interceptor binding, passing through");
            return target.invoke(method, &parameters, tx);
        };
        let excluded = declaring
            .method(method)
            .is_some_and(|m| m.is_marked(MarkerKind::ExcludeClassInterceptors));
        let chain = binding.chain_for(method, excluded);

        if let Some(member) = chain.iter().find(|m| m.around_invoke_methods().next().is_none()) {
            return Err(InvocationError::MissingEntryPoint {
                class: member.class().clone(),
            });
        }

        let transactional = self.transactions && is_transactional(declaring, method, &chain);
        debug!(members = chain.len(), transactional, "built interception chain");

        let mut scope = self.lifecycle.acquire_all(&chain)?;
        let mut parameters = parameters;
        let mut context_data = ContextData::new();

        let members = scope.members_mut();
        let result = if transactional {
            self.coordinator.around(tx, || {
                run_chain(target, class, method, &mut parameters, &mut context_data, members, tx)
            })
        } else {
            run_chain(target, class, method, &mut parameters, &mut context_data, members, tx)
        };

        match (result, scope.release()) {
            (result, Ok(())) => result,
            (Ok(_), Err(teardown)) => Err(teardown.into()),
            (Err(err), Err(teardown)) => {
                warn!(error = %teardown, "teardown failed after failed call");
                Err(err)
            }
        }
    }
}

fn is_transactional(declaring: &TypeDescriptor, method: &MethodSignature, chain: &[ChainMember]) -> bool {
    declaring.is_transactional()
        || declaring
            .method(method)
            .is_some_and(|m| m.is_marked(MarkerKind::Transactional))
        || chain.iter().any(|member| member.is_transactional())
}
