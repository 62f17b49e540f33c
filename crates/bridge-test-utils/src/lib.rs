//! Testing utilities for the legacy bridge workspace
//!
//! Shared fixtures, recording fakes of the host container seams, and an
//! in-memory unit of work.

#![allow(missing_docs)]

pub mod fixtures;

use bridge_dispatch::{
    ApplicationError, InstanceFactory, InvocationContext, InvocationError, LifecycleError,
    LifecyclePhase, ManagedInstance, PersistenceError, TransactionContext, TransactionCoordinator,
    TransactionalInterceptor, UnitOfWork, TRANSACTIONAL_INTERCEPTOR,
};
use bridge_meta::{ClassName, MethodSignature, TypeDescriptor};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Something observable that happened during a test
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Produced(String),
    Injected(String),
    PostConstructed(String),
    AroundInvoke(String),
    Invoked {
        method: String,
        arguments: Vec<Value>,
        depth: usize,
    },
    PreDestroyed(String),
    Disposed(String),
}

/// Shared, ordered event journal
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }

    /// Simple names of interceptors whose around-invoke ran, in order
    pub fn around_invocations(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::AroundInvoke(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Number of times the original method ran
    pub fn invocation_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Invoked { .. }))
            .count()
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.events().iter().filter(|e| *e == wanted).count()
    }
}

/// What a scripted interceptor does when its entry point runs
#[derive(Debug, Clone)]
pub enum Script {
    Proceed,
    ReturnNull,
    Return(Value),
    FailApplication(ApplicationError),
    FailPersistence(PersistenceError),
    /// Proceed inside the context's unit of work
    ProceedTransactionally,
    /// Replace parameters, then proceed
    ReplaceParameters(Vec<Value>),
    /// Store a context value, then return null without proceeding
    Remember(String, Value),
}

/// Interceptor instance driven by a [`Script`]
pub struct ScriptedInterceptor {
    name: String,
    script: Script,
    log: EventLog,
}

impl ManagedInstance for ScriptedInterceptor {
    fn around_invoke(
        &mut self,
        _entry_point: &MethodSignature,
        ctx: &mut InvocationContext<'_>,
    ) -> Result<Value, InvocationError> {
        self.log.push(Event::AroundInvoke(self.name.clone()));
        match &self.script {
            Script::Proceed => ctx.proceed(),
            Script::ReturnNull => Ok(Value::Null),
            Script::Return(value) => Ok(value.clone()),
            Script::FailApplication(err) => Err(err.clone().into()),
            Script::FailPersistence(err) => Err(err.clone().into()),
            Script::ProceedTransactionally => {
                let tx = ctx.transaction();
                TransactionCoordinator::new().around(tx, || ctx.proceed())
            }
            Script::ReplaceParameters(parameters) => {
                ctx.set_parameters(parameters.clone())?;
                ctx.proceed()
            }
            Script::Remember(key, value) => {
                ctx.context_data_mut().insert(key.clone(), value.clone());
                Ok(Value::Null)
            }
        }
    }
}

/// Instance factory recording every lifecycle step
///
/// Classes without a script get [`Script::Proceed`]. The built-in
/// transactional interceptor class gets the real [`TransactionalInterceptor`].
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    log: EventLog,
    scripts: HashMap<ClassName, Script>,
    failures: HashMap<ClassName, LifecyclePhase>,
}

impl RecordingFactory {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn with_script(mut self, class: &str, script: Script) -> Self {
        self.scripts.insert(ClassName::new(class), script);
        self
    }

    /// Make `phase` fail for `class`
    pub fn with_failure(mut self, class: &str, phase: LifecyclePhase) -> Self {
        self.failures.insert(ClassName::new(class), phase);
        self
    }

    fn step(&self, descriptor: &TypeDescriptor, phase: LifecyclePhase, event: Event) -> Result<(), LifecycleError> {
        if self.failures.get(descriptor.class()) == Some(&phase) {
            return Err(LifecycleError::new(
                descriptor.class().clone(),
                phase,
                anyhow::anyhow!("scripted {phase} failure"),
            ));
        }
        self.log.push(event);
        Ok(())
    }
}

impl InstanceFactory for RecordingFactory {
    fn produce(&self, descriptor: &TypeDescriptor) -> Result<Box<dyn ManagedInstance>, LifecycleError> {
        let name = descriptor.class().simple_name().to_string();
        self.step(descriptor, LifecyclePhase::Produce, Event::Produced(name.clone()))?;
        if descriptor.class().as_str() == TRANSACTIONAL_INTERCEPTOR {
            return Ok(Box::new(TransactionalInterceptor::default()));
        }
        let script = self
            .scripts
            .get(descriptor.class())
            .cloned()
            .unwrap_or(Script::Proceed);
        Ok(Box::new(ScriptedInterceptor {
            name,
            script,
            log: self.log.clone(),
        }))
    }

    fn inject(&self, descriptor: &TypeDescriptor, _: &mut dyn ManagedInstance) -> Result<(), LifecycleError> {
        let name = descriptor.class().simple_name().to_string();
        self.step(descriptor, LifecyclePhase::Inject, Event::Injected(name))
    }

    fn post_construct(&self, descriptor: &TypeDescriptor, _: &mut dyn ManagedInstance) -> Result<(), LifecycleError> {
        let name = descriptor.class().simple_name().to_string();
        self.step(descriptor, LifecyclePhase::PostConstruct, Event::PostConstructed(name))
    }

    fn pre_destroy(&self, descriptor: &TypeDescriptor, _: &mut dyn ManagedInstance) -> Result<(), LifecycleError> {
        let name = descriptor.class().simple_name().to_string();
        self.step(descriptor, LifecyclePhase::PreDestroy, Event::PreDestroyed(name))
    }

    fn dispose(&self, descriptor: &TypeDescriptor, _: Box<dyn ManagedInstance>) -> Result<(), LifecycleError> {
        let name = descriptor.class().simple_name().to_string();
        self.step(descriptor, LifecyclePhase::Dispose, Event::Disposed(name))
    }
}

/// Target component recording each original call
pub struct RecordingTarget {
    log: EventLog,
    outcome: Result<Value, Script>,
}

impl RecordingTarget {
    /// Target returning `value`
    pub fn returning(log: EventLog, value: Value) -> Self {
        Self {
            log,
            outcome: Ok(value),
        }
    }

    /// Target failing with the error carried by a `Fail*` script
    pub fn failing(log: EventLog, failure: Script) -> Self {
        Self {
            log,
            outcome: Err(failure),
        }
    }
}

impl ManagedInstance for RecordingTarget {
    fn invoke(
        &mut self,
        method: &MethodSignature,
        arguments: &[Value],
        tx: &TransactionContext,
    ) -> Result<Value, InvocationError> {
        self.log.push(Event::Invoked {
            method: method.name.clone(),
            arguments: arguments.to_vec(),
            depth: tx.depth(),
        });
        match &self.outcome {
            Ok(value) => Ok(value.clone()),
            Err(Script::FailApplication(err)) => Err(err.clone().into()),
            Err(Script::FailPersistence(err)) => Err(err.clone().into()),
            Err(other) => Err(anyhow::anyhow!("unsupported target script {other:?}").into()),
        }
    }
}

/// Counters of unit-of-work operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitStats {
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub clears: usize,
    pub rollback_only_marks: usize,
}

#[derive(Debug)]
struct UnitState {
    open: bool,
    active: bool,
    rollback_only: bool,
    stats: UnitStats,
    fail_commit: Option<PersistenceError>,
    fail_rollback: Option<PersistenceError>,
}

impl Default for UnitState {
    fn default() -> Self {
        Self {
            open: true,
            active: false,
            rollback_only: false,
            stats: UnitStats::default(),
            fail_commit: None,
            fail_rollback: None,
        }
    }
}

/// In-memory unit of work; clones share state so tests can inspect it after
/// handing one clone to a [`TransactionContext`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryUnitOfWork {
    state: Arc<Mutex<UnitState>>,
}

impl InMemoryUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_commit(self, err: PersistenceError) -> Self {
        self.state.lock().fail_commit = Some(err);
        self
    }

    pub fn with_failing_rollback(self, err: PersistenceError) -> Self {
        self.state.lock().fail_rollback = Some(err);
        self
    }

    pub fn stats(&self) -> UnitStats {
        self.state.lock().stats
    }

    pub fn context(&self) -> TransactionContext {
        TransactionContext::new(self.clone())
    }
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    fn begin(&mut self) -> Result<(), PersistenceError> {
        let mut state = self.state.lock();
        state.active = true;
        state.rollback_only = false;
        state.stats.begins += 1;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), PersistenceError> {
        let mut state = self.state.lock();
        state.active = false;
        if let Some(err) = state.fail_commit.clone() {
            return Err(err);
        }
        state.stats.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), PersistenceError> {
        let mut state = self.state.lock();
        state.active = false;
        if let Some(err) = state.fail_rollback.clone() {
            return Err(err);
        }
        state.stats.rollbacks += 1;
        Ok(())
    }

    fn set_rollback_only(&mut self) {
        let mut state = self.state.lock();
        state.rollback_only = true;
        state.stats.rollback_only_marks += 1;
    }

    fn is_rollback_only(&self) -> bool {
        self.state.lock().rollback_only
    }

    fn clear(&mut self) {
        self.state.lock().stats.clears += 1;
    }
}
