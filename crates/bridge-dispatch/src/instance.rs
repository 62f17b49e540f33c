//! Host container interfaces for live instances

use crate::context::InvocationContext;
use crate::error::{InvocationError, LifecycleError};
use crate::transaction::TransactionContext;
use bridge_meta::{MethodSignature, TypeDescriptor};
use serde_json::Value;

/// Live component or interceptor instance, invoked by signature
pub trait ManagedInstance: Send {
    /// Invoke a business method
    ///
    /// # Errors
    /// Whatever the method raises, unchanged
    fn invoke(
        &mut self,
        method: &MethodSignature,
        arguments: &[Value],
        tx: &TransactionContext,
    ) -> Result<Value, InvocationError> {
        let _ = (arguments, tx);
        Err(anyhow::anyhow!("{method} is not invocable on this instance").into())
    }

    /// Run an around-invoke entry point of an interceptor
    ///
    /// `Value::Null` without calling [`InvocationContext::proceed`] hands the
    /// call on to the rest of the chain.
    ///
    /// # Errors
    /// Whatever the entry point or the rest of the chain raises, unchanged
    fn around_invoke(
        &mut self,
        entry_point: &MethodSignature,
        ctx: &mut InvocationContext<'_>,
    ) -> Result<Value, InvocationError> {
        let _ = ctx;
        Err(anyhow::anyhow!("{entry_point} is not an around-invoke entry point").into())
    }
}

/// Creates and releases non-contextual instances for a descriptor
///
/// Every method receives the rewritten descriptor the instance was produced
/// from, so injection sees the rewritten injection points.
pub trait InstanceFactory: Send + Sync {
    /// Allocate a bare instance
    ///
    /// # Errors
    /// Allocation failure
    fn produce(&self, descriptor: &TypeDescriptor) -> Result<Box<dyn ManagedInstance>, LifecycleError>;

    /// Inject dependencies into the instance's injection points
    ///
    /// # Errors
    /// Unsatisfied dependency
    fn inject(
        &self,
        descriptor: &TypeDescriptor,
        instance: &mut dyn ManagedInstance,
    ) -> Result<(), LifecycleError>;

    /// Run post-construction callbacks
    ///
    /// # Errors
    /// Callback failure
    fn post_construct(
        &self,
        descriptor: &TypeDescriptor,
        instance: &mut dyn ManagedInstance,
    ) -> Result<(), LifecycleError>;

    /// Run pre-destruction callbacks
    ///
    /// # Errors
    /// Callback failure
    fn pre_destroy(
        &self,
        descriptor: &TypeDescriptor,
        instance: &mut dyn ManagedInstance,
    ) -> Result<(), LifecycleError>;

    /// Release the instance from container bookkeeping
    ///
    /// # Errors
    /// Release failure
    fn dispose(
        &self,
        descriptor: &TypeDescriptor,
        instance: Box<dyn ManagedInstance>,
    ) -> Result<(), LifecycleError>;
}
