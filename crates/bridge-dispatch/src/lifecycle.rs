//! Auxiliary instance lifecycle
//!
//! Every invocation gets fresh, non-contextual instances of its chain members.
//! [`InstanceScope`] owns them for exactly one invocation and tears them down
//! on release or, as a fallback, on drop.

use crate::error::LifecycleError;
use crate::instance::{InstanceFactory, ManagedInstance};
use bridge_meta::MethodSignature;
use bridge_rewrite::ChainMember;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Chain member instance living for one invocation
pub struct MaterializedMember {
    id: Uuid,
    descriptor: ChainMember,
    entry_points: SmallVec<[MethodSignature; 1]>,
    instance: Box<dyn ManagedInstance>,
}

impl fmt::Debug for MaterializedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedMember")
            .field("id", &self.id)
            .field("class", self.descriptor.class())
            .field("entry_points", &self.entry_points)
            .finish_non_exhaustive()
    }
}

impl MaterializedMember {
    /// Instance id used in logs
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Rewritten descriptor the instance was produced from
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &ChainMember {
        &self.descriptor
    }

    /// Around-invoke entry points, in declaration order
    #[inline]
    #[must_use]
    pub fn entry_points(&self) -> &[MethodSignature] {
        &self.entry_points
    }

    pub(crate) fn split_mut(&mut self) -> (&[MethodSignature], &mut dyn ManagedInstance) {
        (&self.entry_points, &mut *self.instance)
    }
}

/// Creates and destroys chain member instances through the host factory
#[derive(Clone)]
pub struct InstanceLifecycle {
    factory: Arc<dyn InstanceFactory>,
}

impl fmt::Debug for InstanceLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceLifecycle").finish_non_exhaustive()
    }
}

impl InstanceLifecycle {
    /// Create lifecycle manager over a host factory
    #[must_use]
    pub fn new(factory: Arc<dyn InstanceFactory>) -> Self {
        Self { factory }
    }

    /// Produce, inject and initialize a fresh instance
    ///
    /// If injection or initialization fails, the bare instance is released
    /// before the error is returned.
    ///
    /// # Errors
    /// The first failing lifecycle step
    pub fn materialize(&self, descriptor: &ChainMember) -> Result<MaterializedMember, LifecycleError> {
        let mut instance = self.factory.produce(descriptor)?;

        let initialized = self
            .factory
            .inject(descriptor, &mut *instance)
            .and_then(|()| self.factory.post_construct(descriptor, &mut *instance));
        if let Err(err) = initialized {
            if let Err(dispose_err) = self.factory.dispose(descriptor, instance) {
                warn!(class = %descriptor.class(), error = %dispose_err, "failed to release half-built instance");
            }
            return Err(err);
        }

        let member = MaterializedMember {
            id: Uuid::new_v4(),
            descriptor: Arc::clone(descriptor),
            entry_points: descriptor
                .around_invoke_methods()
                .map(|m| m.signature.clone())
                .collect(),
            instance,
        };
        debug!(class = %descriptor.class(), instance = %member.id, "materialized chain member");
        Ok(member)
    }

    /// Run pre-destruction and release the instance
    ///
    /// Release runs even if pre-destruction failed.
    ///
    /// # Errors
    /// The pre-destruction failure, else the release failure
    pub fn destroy(&self, member: MaterializedMember) -> Result<(), LifecycleError> {
        let MaterializedMember {
            id,
            descriptor,
            mut instance,
            ..
        } = member;

        let pre_destroy = self.factory.pre_destroy(&descriptor, &mut *instance);
        let dispose = self.factory.dispose(&descriptor, instance);
        debug!(class = %descriptor.class(), instance = %id, "destroyed chain member");

        match (pre_destroy, dispose) {
            (Err(err), Err(dispose_err)) => {
                warn!(class = %descriptor.class(), error = %dispose_err, "release failed after pre-destroy failure");
                Err(err)
            }
            (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    /// Materialize a whole chain, in order
    ///
    /// # Errors
    /// The first materialization failure; instances built so far are torn down
    pub fn acquire_all(&self, chain: &[ChainMember]) -> Result<InstanceScope<'_>, LifecycleError> {
        let mut scope = InstanceScope::new(self);
        for descriptor in chain {
            scope.acquire(descriptor)?;
        }
        Ok(scope)
    }
}

/// Instances owned by one invocation
///
/// Call [`InstanceScope::release`] to observe teardown errors. A scope dropped
/// without release still tears its instances down and logs failures.
#[derive(Debug)]
pub struct InstanceScope<'l> {
    lifecycle: &'l InstanceLifecycle,
    members: SmallVec<[MaterializedMember; 4]>,
}

impl<'l> InstanceScope<'l> {
    /// Create empty scope
    #[must_use]
    pub fn new(lifecycle: &'l InstanceLifecycle) -> Self {
        Self {
            lifecycle,
            members: SmallVec::new(),
        }
    }

    /// Materialize one more member at the end of the chain
    ///
    /// # Errors
    /// Materialization failure
    pub fn acquire(&mut self, descriptor: &ChainMember) -> Result<(), LifecycleError> {
        let member = self.lifecycle.materialize(descriptor)?;
        self.members.push(member);
        Ok(())
    }

    /// Members in chain order
    #[inline]
    #[must_use]
    pub fn members(&self) -> &[MaterializedMember] {
        &self.members
    }

    /// Members in chain order, mutably
    #[inline]
    pub fn members_mut(&mut self) -> &mut [MaterializedMember] {
        &mut self.members
    }

    /// Number of live members
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if no member is live
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Tear down every member in chain order
    ///
    /// All members are destroyed even if some teardown fails.
    ///
    /// # Errors
    /// The first teardown failure; later ones are logged
    pub fn release(mut self) -> Result<(), LifecycleError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), LifecycleError> {
        let mut first_error = None;
        for member in self.members.drain(..) {
            if let Err(err) = self.lifecycle.destroy(member) {
                if first_error.is_none() {
                    first_error = Some(err);
                } else {
                    warn!(error = %err, "additional teardown failure");
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for InstanceScope<'_> {
    fn drop(&mut self) {
        if self.members.is_empty() {
            return;
        }
        if let Err(err) = self.teardown() {
            warn!(error = %err, "teardown failed while dropping instance scope");
        }
    }
}
