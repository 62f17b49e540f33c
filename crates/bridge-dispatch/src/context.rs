//! Invocation context handed to around-invoke entry points

use crate::error::InvocationError;
use crate::instance::ManagedInstance;
use crate::lifecycle::MaterializedMember;
use crate::transaction::TransactionContext;
use bridge_meta::{ClassName, MethodSignature};
use serde_json::Value;
use std::collections::HashMap;
use tracing::trace;

/// Per-invocation data shared by every member of a chain
pub type ContextData = HashMap<String, Value>;

/// View of an intercepted call from one chain position
///
/// [`InvocationContext::proceed`] continues with the next chain member, or with
/// the original call at the end of the chain.
pub struct InvocationContext<'a> {
    target: &'a mut dyn ManagedInstance,
    class: &'a ClassName,
    method: &'a MethodSignature,
    parameters: &'a mut Vec<Value>,
    context_data: &'a mut ContextData,
    rest: &'a mut [MaterializedMember],
    tx: &'a TransactionContext,
    proceeded: bool,
}

impl<'a> InvocationContext<'a> {
    /// Intercepted class
    #[inline]
    #[must_use]
    pub fn target_class(&self) -> &ClassName {
        self.class
    }

    /// Intercepted method
    #[inline]
    #[must_use]
    pub fn method(&self) -> &MethodSignature {
        self.method
    }

    /// Current call parameters
    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[Value] {
        self.parameters.as_slice()
    }

    /// Replace call parameters for the rest of the chain
    ///
    /// # Errors
    /// Returns `InvocationError::ParameterMismatch` if the arity differs from
    /// the intercepted method's
    pub fn set_parameters(&mut self, parameters: Vec<Value>) -> Result<(), InvocationError> {
        let expected = self.method.parameters.len();
        if parameters.len() != expected {
            return Err(InvocationError::ParameterMismatch {
                method: self.method.clone(),
                expected,
                actual: parameters.len(),
            });
        }
        *self.parameters = parameters;
        Ok(())
    }

    /// Data shared by every member of this invocation
    #[inline]
    #[must_use]
    pub fn context_data(&self) -> &ContextData {
        &*self.context_data
    }

    /// Mutable shared data
    #[inline]
    pub fn context_data_mut(&mut self) -> &mut ContextData {
        &mut *self.context_data
    }

    /// Unit-of-work context of this call chain
    ///
    /// Borrowed for the whole invocation, so it can be held across `proceed`.
    #[inline]
    #[must_use]
    pub fn transaction(&self) -> &'a TransactionContext {
        self.tx
    }

    /// Check whether this member already proceeded
    #[inline]
    #[must_use]
    pub fn has_proceeded(&self) -> bool {
        self.proceeded
    }

    /// Continue with the next chain member, or the original call
    ///
    /// # Errors
    /// Whatever the rest of the chain raises, unchanged
    pub fn proceed(&mut self) -> Result<Value, InvocationError> {
        self.proceeded = true;
        run_chain(
            &mut *self.target,
            self.class,
            self.method,
            &mut *self.parameters,
            &mut *self.context_data,
            &mut *self.rest,
            self.tx,
        )
    }
}

/// Drive `chain` around the original call on `target`
///
/// A member returning non-null, or one that proceeded, ends the chain with its
/// result. A member returning null without proceeding hands on to the rest.
pub(crate) fn run_chain(
    target: &mut dyn ManagedInstance,
    class: &ClassName,
    method: &MethodSignature,
    parameters: &mut Vec<Value>,
    context_data: &mut ContextData,
    chain: &mut [MaterializedMember],
    tx: &TransactionContext,
) -> Result<Value, InvocationError> {
    let Some((member, rest)) = chain.split_first_mut() else {
        trace!(class = %class, method = %method, "invoking original call");
        return target.invoke(method, parameters.as_slice(), tx);
    };

    let member_class = member.descriptor().class().clone();
    let (entry_points, instance) = member.split_mut();
    for entry_point in entry_points {
        let mut ctx = InvocationContext {
            target: &mut *target,
            class,
            method,
            parameters: &mut *parameters,
            context_data: &mut *context_data,
            rest: &mut *rest,
            tx,
            proceeded: false,
        };
        let result = instance.around_invoke(entry_point, &mut ctx)?;
        if !result.is_null() || ctx.proceeded {
            trace!(interceptor = %member_class, entry_point = %entry_point, "chain ended by interceptor");
            return Ok(result);
        }
    }

    run_chain(target, class, method, parameters, context_data, rest, tx)
}
