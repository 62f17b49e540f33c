//! Reentrant transaction coordination
//!
//! [`TransactionCoordinator::around`] wraps a call in a unit of work. Nested
//! frames sharing one [`TransactionContext`] join the outermost frame: any
//! frame that finds the unit inactive begins it, only the outermost frame may
//! mark it rollback-only, commit it or roll it back.
//!
//! # Concurrency
//! A [`TransactionContext`] belongs to one call chain. It is `!Sync` and must
//! not be shared between concurrently running chains.

use crate::context::InvocationContext;
use crate::error::{InvocationError, PersistenceError, PersistenceErrorKind};
use crate::instance::ManagedInstance;
use bridge_meta::{Marker, MethodSignature, TypeDescriptor};
use serde_json::Value;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use tracing::{debug, info, warn};

/// Handle to the host's unit of work
#[cfg_attr(test, mockall::automock)]
pub trait UnitOfWork {
    /// Underlying session is still usable
    fn is_open(&self) -> bool;

    /// A unit of work is in progress
    fn is_active(&self) -> bool;

    /// Start a unit of work
    ///
    /// # Errors
    /// Provider failure
    fn begin(&mut self) -> Result<(), PersistenceError>;

    /// Commit the active unit of work
    ///
    /// # Errors
    /// Provider failure
    fn commit(&mut self) -> Result<(), PersistenceError>;

    /// Roll back the active unit of work
    ///
    /// # Errors
    /// Provider failure
    fn rollback(&mut self) -> Result<(), PersistenceError>;

    /// Mark the active unit of work so that it can only roll back
    fn set_rollback_only(&mut self);

    /// Check rollback-only mark
    fn is_rollback_only(&self) -> bool;

    /// Drop accumulated session state
    fn clear(&mut self);
}

/// Per-chain nesting counter plus the unit of work it guards
pub struct TransactionContext {
    depth: Cell<usize>,
    unit: RefCell<Box<dyn UnitOfWork>>,
}

impl fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionContext")
            .field("depth", &self.depth.get())
            .finish_non_exhaustive()
    }
}

impl TransactionContext {
    /// Create context over a unit of work
    #[must_use]
    pub fn new(unit: impl UnitOfWork + 'static) -> Self {
        Self::from_boxed(Box::new(unit))
    }

    /// Create context over a boxed unit of work
    #[must_use]
    pub fn from_boxed(unit: Box<dyn UnitOfWork>) -> Self {
        Self {
            depth: Cell::new(0),
            unit: RefCell::new(unit),
        }
    }

    /// Current coordinator nesting depth
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Run `f` against the unit of work
    ///
    /// # Panics
    /// If called re-entrantly from within another `with_unit` closure
    pub fn with_unit<R>(&self, f: impl FnOnce(&mut dyn UnitOfWork) -> R) -> R {
        let mut unit = self.unit.borrow_mut();
        f(&mut **unit)
    }

    /// Check whether a unit of work is in progress
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.unit.borrow().is_active()
    }

    fn enter(&self) -> usize {
        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        depth
    }

    fn exit(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// Which failures mark a unit of work rollback-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackPolicy {
    no_rollback: SmallVec<[PersistenceErrorKind; 4]>,
}

impl Default for RollbackPolicy {
    fn default() -> Self {
        Self {
            no_rollback: PersistenceErrorKind::NON_ROLLBACK.into_iter().collect(),
        }
    }
}

impl RollbackPolicy {
    /// Check whether `error` forces a rollback
    #[must_use]
    pub fn causes_rollback(&self, error: &InvocationError) -> bool {
        error
            .persistence_kind()
            .map_or(true, |kind| !self.no_rollback.contains(&kind))
    }
}

/// Reentrant begin/commit/rollback around intercepted calls
#[derive(Debug, Clone, Default)]
pub struct TransactionCoordinator {
    policy: RollbackPolicy,
}

impl TransactionCoordinator {
    /// Create coordinator with the default rollback policy
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rollback policy in use
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &RollbackPolicy {
        &self.policy
    }

    /// Run `call` inside the context's unit of work
    ///
    /// # Errors
    /// - The error of `call`, unchanged, even if completing the unit of work also failed
    /// - A begin failure, before `call` runs
    /// - A commit or rollback failure after `call` succeeded
    pub fn around<F>(&self, tx: &TransactionContext, call: F) -> Result<Value, InvocationError>
    where
        F: FnOnce() -> Result<Value, InvocationError>,
    {
        let depth = tx.enter();
        if let Err(err) = begin_if_inactive(tx, depth) {
            tx.exit();
            return Err(err.into());
        }

        let result = call();

        if let Err(err) = &result {
            if depth == 1 && self.policy.causes_rollback(err) {
                mark_rollback_only(tx);
            }
        }

        tx.exit();
        if depth == 1 {
            complete(tx, result)
        } else {
            debug!(depth, "joined outer unit of work");
            result
        }
    }
}

/// Class name of the built-in transactional interceptor
pub const TRANSACTIONAL_INTERCEPTOR: &str = "bridge.transactions.TransactionalInterceptor";

/// Chain member running the rest of the chain inside a unit of work
///
/// Registered ahead of business interceptors; several of them in one chain
/// join the outermost one.
#[derive(Debug, Clone, Default)]
pub struct TransactionalInterceptor {
    coordinator: TransactionCoordinator,
}

impl TransactionalInterceptor {
    /// Create interceptor over a coordinator
    #[must_use]
    pub fn new(coordinator: TransactionCoordinator) -> Self {
        Self { coordinator }
    }

    /// Descriptor hosts register for this interceptor
    #[must_use]
    pub fn descriptor() -> TypeDescriptor {
        TypeDescriptor::builder(TRANSACTIONAL_INTERCEPTOR)
            .marker(Marker::Interceptor)
            .marker(Marker::Transactional)
            .method_with(
                MethodSignature::new("manage_transaction", ["InvocationContext"]),
                [Marker::AroundInvoke],
            )
            .build()
    }
}

impl ManagedInstance for TransactionalInterceptor {
    fn around_invoke(
        &mut self,
        _entry_point: &MethodSignature,
        ctx: &mut InvocationContext<'_>,
    ) -> Result<Value, InvocationError> {
        let tx = ctx.transaction();
        self.coordinator.around(tx, || ctx.proceed())
    }
}

fn begin_if_inactive(tx: &TransactionContext, depth: usize) -> Result<(), PersistenceError> {
    tx.with_unit(|unit| {
        if unit.is_active() {
            return Ok(());
        }
        unit.begin()?;
        debug!(depth, "unit of work started");
        Ok(())
    })
}

fn mark_rollback_only(tx: &TransactionContext) {
    tx.with_unit(|unit| {
        if unit.is_open() && unit.is_active() {
            unit.set_rollback_only();
        }
    });
}

fn complete(
    tx: &TransactionContext,
    result: Result<Value, InvocationError>,
) -> Result<Value, InvocationError> {
    let outcome = tx.with_unit(|unit| {
        if !unit.is_open() || !unit.is_active() {
            return Ok(());
        }
        let outcome = if unit.is_rollback_only() {
            unit.rollback().map(|()| info!("unit of work rolled back"))
        } else {
            unit.commit().map(|()| info!("unit of work committed"))
        };
        unit.clear();
        outcome
    });

    match (result, outcome) {
        (result, Ok(())) => result,
        (Ok(_), Err(err)) => {
            warn!(error = %err, "error completing unit of work");
            Err(err.into())
        }
        (Err(business), Err(err)) => {
            warn!(error = %err, business = %business, "error completing unit of work after failed call");
            Err(business)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApplicationError;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn persistence(kind: PersistenceErrorKind) -> InvocationError {
        PersistenceError::new(kind, "query failed").into()
    }

    #[test]
    fn policy_spares_benign_query_failures() {
        let policy = RollbackPolicy::default();
        for kind in PersistenceErrorKind::NON_ROLLBACK {
            assert!(!policy.causes_rollback(&persistence(kind)));
        }
        assert!(policy.causes_rollback(&persistence(PersistenceErrorKind::OptimisticLock)));
        assert!(policy.causes_rollback(&ApplicationError::new("Boom", "x").into()));
    }

    #[test]
    fn outermost_success_begins_and_commits() {
        let mut unit = MockUnitOfWork::new();
        let active = Arc::new(AtomicBool::new(false));
        let (began, read) = (active.clone(), active.clone());

        unit.expect_is_active().returning(move || read.load(Ordering::SeqCst));
        unit.expect_begin()
            .times(1)
            .returning(move || {
                began.store(true, Ordering::SeqCst);
                Ok(())
            });
        unit.expect_is_open().return_const(true);
        unit.expect_is_rollback_only().return_const(false);
        unit.expect_commit().times(1).returning(|| Ok(()));
        unit.expect_rollback().never();
        unit.expect_clear().times(1).return_const(());

        let tx = TransactionContext::new(unit);
        let result = TransactionCoordinator::new().around(&tx, || Ok(json!("done")));

        assert_eq!(result.unwrap(), json!("done"));
        assert_eq!(tx.depth(), 0);
    }

    #[test]
    fn outermost_failure_marks_and_rolls_back() {
        let mut unit = MockUnitOfWork::new();
        let rollback_only = Arc::new(AtomicBool::new(false));
        let flag = rollback_only.clone();
        let read = rollback_only.clone();

        unit.expect_is_active().return_const(true);
        unit.expect_is_open().return_const(true);
        unit.expect_begin().never();
        unit.expect_set_rollback_only()
            .times(1)
            .returning(move || flag.store(true, Ordering::SeqCst));
        unit.expect_is_rollback_only()
            .returning(move || read.load(Ordering::SeqCst));
        unit.expect_rollback().times(1).returning(|| Ok(()));
        unit.expect_commit().never();
        unit.expect_clear().times(1).return_const(());

        let tx = TransactionContext::new(unit);
        let err = TransactionCoordinator::new()
            .around(&tx, || Err(persistence(PersistenceErrorKind::OptimisticLock)))
            .unwrap_err();

        assert_eq!(err.persistence_kind(), Some(PersistenceErrorKind::OptimisticLock));
    }

    #[test]
    fn benign_failure_still_commits() {
        let mut unit = MockUnitOfWork::new();
        unit.expect_is_active().return_const(true);
        unit.expect_is_open().return_const(true);
        unit.expect_set_rollback_only().never();
        unit.expect_is_rollback_only().return_const(false);
        unit.expect_commit().times(1).returning(|| Ok(()));
        unit.expect_rollback().never();
        unit.expect_clear().times(1).return_const(());

        let tx = TransactionContext::new(unit);
        let err = TransactionCoordinator::new()
            .around(&tx, || Err(persistence(PersistenceErrorKind::NoResult)))
            .unwrap_err();

        assert_eq!(err.persistence_kind(), Some(PersistenceErrorKind::NoResult));
    }

    #[test]
    fn commit_failure_after_success_is_returned() {
        let mut unit = MockUnitOfWork::new();
        unit.expect_is_active().return_const(true);
        unit.expect_is_open().return_const(true);
        unit.expect_is_rollback_only().return_const(false);
        unit.expect_commit()
            .times(1)
            .returning(|| Err(PersistenceError::new(PersistenceErrorKind::Rollback, "constraint violated")));
        unit.expect_clear().times(1).return_const(());

        let tx = TransactionContext::new(unit);
        let err = TransactionCoordinator::new()
            .around(&tx, || Ok(Value::Null))
            .unwrap_err();

        assert_eq!(err.persistence_kind(), Some(PersistenceErrorKind::Rollback));
    }

    #[test]
    fn rollback_failure_does_not_mask_business_error() {
        let mut unit = MockUnitOfWork::new();
        unit.expect_is_active().return_const(true);
        unit.expect_is_open().return_const(true);
        unit.expect_set_rollback_only().return_const(());
        unit.expect_is_rollback_only().return_const(true);
        unit.expect_rollback()
            .times(1)
            .returning(|| Err(PersistenceError::new(PersistenceErrorKind::Other, "connection lost")));
        unit.expect_clear().return_const(());

        let tx = TransactionContext::new(unit);
        let err = TransactionCoordinator::new()
            .around(&tx, || Err(ApplicationError::new("Boom", "bad input").into()))
            .unwrap_err();

        assert_eq!(err.application_kind(), Some("Boom"));
    }

    #[test]
    fn begin_failure_skips_call_and_resets_depth() {
        let mut unit = MockUnitOfWork::new();
        unit.expect_is_active().return_const(false);
        unit.expect_begin()
            .times(1)
            .returning(|| Err(PersistenceError::new(PersistenceErrorKind::Other, "no connection")));
        unit.expect_commit().never();
        unit.expect_rollback().never();

        let tx = TransactionContext::new(unit);
        let mut called = false;
        let result = TransactionCoordinator::new().around(&tx, || {
            called = true;
            Ok(Value::Null)
        });

        assert!(result.is_err());
        assert!(!called);
        assert_eq!(tx.depth(), 0);
    }

    #[test]
    fn nested_frames_only_track_depth() {
        let mut unit = MockUnitOfWork::new();
        unit.expect_is_active().return_const(true);
        unit.expect_is_open().return_const(true);
        unit.expect_is_rollback_only().return_const(false);
        unit.expect_commit().times(1).returning(|| Ok(()));
        unit.expect_clear().times(1).return_const(());

        let tx = TransactionContext::new(unit);
        let coordinator = TransactionCoordinator::new();
        let result = coordinator.around(&tx, || {
            assert_eq!(tx.depth(), 1);
            coordinator.around(&tx, || {
                assert_eq!(tx.depth(), 2);
                Ok(json!(7))
            })
        });

        assert_eq!(result.unwrap(), json!(7));
    }

    #[test]
    fn unit_ended_by_the_call_is_not_cleared() {
        let mut unit = MockUnitOfWork::new();
        let active = Arc::new(AtomicBool::new(false));
        let (began, read) = (active.clone(), active.clone());

        unit.expect_is_active().returning(move || read.load(Ordering::SeqCst));
        unit.expect_begin().times(1).returning(move || {
            began.store(true, Ordering::SeqCst);
            Ok(())
        });
        unit.expect_is_open().return_const(true);
        unit.expect_commit().never();
        unit.expect_rollback().never();
        unit.expect_clear().never();

        let tx = TransactionContext::new(unit);
        let result = TransactionCoordinator::new().around(&tx, || {
            active.store(false, Ordering::SeqCst);
            Ok(json!("done"))
        });

        assert_eq!(result.unwrap(), json!("done"));
        assert_eq!(tx.depth(), 0);
    }

    #[test]
    fn closed_session_is_left_alone() {
        let mut unit = MockUnitOfWork::new();
        unit.expect_is_active().return_const(true);
        unit.expect_is_open().return_const(false);
        unit.expect_commit().never();
        unit.expect_rollback().never();
        unit.expect_clear().never();

        let tx = TransactionContext::new(unit);
        let result = TransactionCoordinator::new().around(&tx, || Ok(Value::Null));
        assert!(result.is_ok());
    }
}
