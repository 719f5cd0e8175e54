//! Execution manager.
//!
//! [`ExecutionManager`] owns the set of live units. It refuses to create a
//! unit once `max_units` are alive, runs batches with at most
//! `max_concurrency` units in flight, and fans lifecycle events out to
//! registered observers and broadcast subscribers.
//!
//! ```rust,no_run
//! use task_agent::manager::{ExecutionManager, ManagerConfig};
//!
//! # async fn example() -> task_agent::Result<()> {
//! let manager = ExecutionManager::new(ManagerConfig::default().with_max_units(4));
//! let outcomes = manager
//!     .execute_concurrent(["read Cargo.toml", "search for 'TODO' in src"])
//!     .await;
//! for outcome in outcomes {
//!     match outcome {
//!         Ok(report) => println!("{}: {}", report.id, report.summary),
//!         Err(failure) => eprintln!("{failure}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod adapter;
mod config;
mod observer;
mod request;

use std::collections::HashMap;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use adapter::{TASK_TOOL_NAME, TaskTool};
pub use config::{DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_UNITS, ManagerConfig};
pub use observer::TracingObserver;
pub use request::TaskRequest;

use crate::analyzer::{Analyzer, RuleBasedAnalyzer, Summarizer};
use crate::observability::{ExecutionMetrics, MetricsSnapshot};
use crate::tools::{ToolAccess, ToolRegistry};
use crate::unit::{
    LifecycleEvent, LifecycleObserver, ParentId, TaskUnit, UnitId, UnitOutcome, UnitReport,
};
use crate::{Error, Result};

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A live unit as seen from outside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveUnit {
    pub id: UnitId,
    pub parent_id: ParentId,
    pub task: String,
    pub depth: usize,
    pub created_at: DateTime<Utc>,
    /// Set once the unit has emitted its start event.
    pub running: bool,
}

struct Slot {
    info: ActiveUnit,
    token: CancellationToken,
}

struct Inner {
    config: ManagerConfig,
    active: Mutex<HashMap<UnitId, Slot>>,
    tools: Arc<ToolRegistry>,
    analyzer: Arc<dyn Analyzer>,
    summarizer: Option<Arc<dyn Summarizer>>,
    observers: Vec<Arc<dyn LifecycleObserver>>,
    dispatch: Arc<dyn LifecycleObserver>,
    events: broadcast::Sender<LifecycleEvent>,
    metrics: ExecutionMetrics,
}

impl Inner {
    fn lock_active(&self) -> MutexGuard<'_, HashMap<UnitId, Slot>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, id: UnitId) -> Option<Slot> {
        self.lock_active().remove(&id)
    }
}

/// Routes unit events into manager bookkeeping and then to subscribers.
struct Dispatch {
    inner: Weak<Inner>,
}

impl LifecycleObserver for Dispatch {
    fn on_event(&self, event: &LifecycleEvent) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        match event {
            LifecycleEvent::Start { id, .. } => {
                if let Some(slot) = inner.lock_active().get_mut(id) {
                    slot.info.running = true;
                }
            }
            _ => {
                inner.release(event.id());
            }
        }
        inner.metrics.record_event(event);
        for observer in &inner.observers {
            observer.on_event(event);
        }
        // No receivers is fine.
        let _ = inner.events.send(event.clone());
    }

    fn on_dropped(&self, id: UnitId) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        if let Some(slot) = inner.release(id) {
            if slot.info.running {
                inner.metrics.running_units.dec();
            }
            debug!(unit_id = %id, "Unit dropped before finishing, slot released");
        }
    }
}

/// Bounded pool of task units. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ExecutionManager {
    inner: Arc<Inner>,
}

impl ExecutionManager {
    pub fn new(config: ManagerConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> ExecutionManagerBuilder {
        ExecutionManagerBuilder::default()
    }

    fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.tools
    }

    /// Allocates and registers a unit, or fails with
    /// [`Error::CapacityExceeded`] when `max_units` are already alive.
    ///
    /// A rejected request leaves the active set untouched.
    pub fn create(&self, request: impl Into<TaskRequest>) -> Result<TaskUnit> {
        let request = request.into();
        let max = self.inner.config.max_units;
        let mut active = self.inner.lock_active();
        if active.len() >= max {
            let current = active.len();
            drop(active);
            self.inner.metrics.record_rejected();
            warn!(active = current, max, "Unit capacity exceeded");
            return Err(Error::CapacityExceeded {
                active: current,
                max,
            });
        }

        let token = request.cancel.unwrap_or_default();
        let mut builder = TaskUnit::builder(request.task)
            .parent(request.parent_id)
            .depth(request.depth)
            .config(
                request
                    .config
                    .unwrap_or_else(|| self.inner.config.unit.clone()),
            )
            .cancellation_token(token.clone())
            .tools(Arc::clone(&self.inner.tools))
            .analyzer(Arc::clone(&self.inner.analyzer))
            .observer(Arc::clone(&self.inner.dispatch));
        if let Some(summarizer) = &self.inner.summarizer {
            builder = builder.summarizer(Arc::clone(summarizer));
        }
        for (key, value) in request.context {
            builder = builder.context(key, value);
        }
        let unit = builder.build();

        active.insert(
            unit.id(),
            Slot {
                info: ActiveUnit {
                    id: unit.id(),
                    parent_id: unit.parent_id(),
                    task: unit.task().to_string(),
                    depth: unit.depth(),
                    created_at: Utc::now(),
                    running: false,
                },
                token,
            },
        );
        drop(active);

        self.inner.metrics.record_created();
        debug!(unit_id = %unit.id(), parent_id = %unit.parent_id(), "Unit created");
        Ok(unit)
    }

    /// Runs a unit to completion, racing it against its configured timeout.
    pub async fn run(&self, mut unit: TaskUnit) -> UnitOutcome {
        self.run_unit(&mut unit).await
    }

    /// Like [`run`](Self::run) but leaves the unit with the caller, e.g. to
    /// export its memory afterwards.
    ///
    /// On timeout the unit's token is cancelled, the same path `abort`
    /// uses, and the unit finishes as `Aborted` after its current step.
    pub async fn run_unit(&self, unit: &mut TaskUnit) -> UnitOutcome {
        let id = unit.id();
        let timeout = unit.config().timeout;
        let token = unit.cancellation_token();

        let mut execution = pin!(unit.execute());
        let outcome = match tokio::time::timeout(timeout, &mut execution).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    unit_id = %id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Unit timed out, cancelling"
                );
                token.cancel();
                execution.await
            }
        };

        if let Ok(report) = &outcome {
            self.inner.metrics.record_steps(&report.results);
        }
        outcome
    }

    /// Creates and runs one unit. A failed unit surfaces as
    /// [`Error::UnitFailed`].
    pub async fn execute(&self, request: impl Into<TaskRequest>) -> Result<UnitReport> {
        let unit = self.create(request)?;
        self.run(unit)
            .await
            .map_err(|failure| Error::UnitFailed(Box::new(failure)))
    }

    /// Runs a batch and returns one outcome per created unit, in input order.
    ///
    /// Creation stops at the first capacity rejection; requests past that
    /// point are not created and get no outcome. No unit's failure affects
    /// its siblings.
    #[instrument(skip_all, fields(max_concurrency = self.inner.config.max_concurrency))]
    pub async fn execute_concurrent<I, R>(&self, requests: I) -> Vec<UnitOutcome>
    where
        I: IntoIterator<Item = R>,
        R: Into<TaskRequest>,
    {
        let requests = requests.into_iter().map(Into::into).collect();
        self.run_batch(requests, self.inner.config.max_concurrency)
            .await
    }

    pub(crate) async fn run_batch(
        &self,
        requests: Vec<TaskRequest>,
        limit: usize,
    ) -> Vec<UnitOutcome> {
        let total = requests.len();
        let mut units = Vec::with_capacity(total);
        for request in requests {
            match self.create(request) {
                Ok(unit) => units.push(unit),
                Err(e) => {
                    warn!(
                        created = units.len(),
                        skipped = total - units.len(),
                        error = %e,
                        "Batch creation stopped"
                    );
                    break;
                }
            }
        }

        let permits = Semaphore::new(limit.max(1));
        let runs = units.into_iter().map(|unit| {
            let permits = &permits;
            async move {
                // The semaphore is never closed.
                let _permit = permits.acquire().await.ok();
                self.run(unit).await
            }
        });
        join_all(runs).await
    }

    /// Signals cancellation to every active unit without waiting.
    /// Returns how many were signalled.
    pub fn abort_all(&self) -> usize {
        let active = self.inner.lock_active();
        for slot in active.values() {
            slot.token.cancel();
        }
        let count = active.len();
        drop(active);
        info!(count, "Abort requested for all active units");
        count
    }

    pub fn abort(&self, id: UnitId) -> bool {
        let active = self.inner.lock_active();
        match active.get(&id) {
            Some(slot) => {
                slot.token.cancel();
                info!(unit_id = %id, "Abort requested");
                true
            }
            None => false,
        }
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock_active().len()
    }

    pub fn is_active(&self, id: UnitId) -> bool {
        self.inner.lock_active().contains_key(&id)
    }

    /// Live units, oldest first.
    pub fn active_units(&self) -> Vec<ActiveUnit> {
        let mut units: Vec<ActiveUnit> = self
            .inner
            .lock_active()
            .values()
            .map(|slot| slot.info.clone())
            .collect();
        units.sort_by_key(|u| u.created_at);
        units
    }

    /// Receives every lifecycle event emitted after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.inner.events.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl std::fmt::Debug for ExecutionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionManager")
            .field("config", &self.inner.config)
            .field("active", &self.active_count())
            .field("tools", &self.inner.tools.names())
            .finish()
    }
}

/// Collaborators are fixed at build time; nothing is looked up globally.
pub struct ExecutionManagerBuilder {
    config: ManagerConfig,
    tools: Option<ToolRegistry>,
    task_tool: bool,
    analyzer: Option<Arc<dyn Analyzer>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    observers: Vec<Arc<dyn LifecycleObserver>>,
    event_capacity: usize,
}

impl Default for ExecutionManagerBuilder {
    fn default() -> Self {
        Self {
            config: ManagerConfig::default(),
            tools: None,
            task_tool: true,
            analyzer: None,
            summarizer: None,
            observers: Vec::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ExecutionManagerBuilder {
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to every builtin tool.
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Whether units may spawn nested units through the `Task` tool.
    pub fn task_tool(mut self, enabled: bool) -> Self {
        self.task_tool = enabled;
        self
    }

    pub fn analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Events buffered per broadcast subscriber before it starts lagging.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> ExecutionManager {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let mut tools = self
                .tools
                .unwrap_or_else(|| ToolRegistry::builtin(&ToolAccess::all()));
            if self.task_tool {
                tools.register(Arc::new(TaskTool::new(weak.clone())));
            }
            let (events, _) = broadcast::channel(self.event_capacity);
            Inner {
                config: self.config,
                active: Mutex::new(HashMap::new()),
                tools: Arc::new(tools),
                analyzer: self
                    .analyzer
                    .unwrap_or_else(|| Arc::new(RuleBasedAnalyzer::new())),
                summarizer: self.summarizer,
                observers: self.observers,
                dispatch: Arc::new(Dispatch {
                    inner: weak.clone(),
                }),
                events,
                metrics: ExecutionMetrics::new(),
            }
        });
        ExecutionManager::from_inner(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(max_units: usize) -> ExecutionManager {
        ExecutionManager::builder()
            .config(ManagerConfig::default().with_max_units(max_units))
            .tools(ToolRegistry::new())
            .task_tool(false)
            .build()
    }

    #[test]
    fn test_create_at_capacity_is_rejected() {
        let manager = manager(2);
        let _a = manager.create("one").unwrap();
        let _b = manager.create("two").unwrap();

        let err = manager.create("three").unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { active: 2, max: 2 }));
        assert_eq!(manager.active_count(), 2);
        assert_eq!(manager.metrics().units_rejected, 1);
    }

    #[test]
    fn test_dropping_unstarted_unit_releases_slot() {
        let manager = manager(1);
        let unit = manager.create("one").unwrap();
        assert!(manager.is_active(unit.id()));
        drop(unit);
        assert_eq!(manager.active_count(), 0);
        assert!(manager.create("two").is_ok());
    }

    #[test]
    fn test_abort_signals_token() {
        let manager = manager(3);
        let a = manager.create("a").unwrap();
        let b = manager.create("b").unwrap();

        assert!(manager.abort(a.id()));
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());

        assert_eq!(manager.abort_all(), 2);
        assert!(b.is_cancelled());
        assert!(!manager.abort(UnitId::new()));
    }

    #[test]
    fn test_active_units_snapshot() {
        let manager = manager(3);
        let unit = manager
            .create(TaskRequest::new("nested").with_depth(1))
            .unwrap();
        let active = manager.active_units();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, unit.id());
        assert_eq!(active[0].depth, 1);
        assert!(!active[0].running);
    }

    #[test]
    fn test_task_tool_registered_by_default() {
        let manager = ExecutionManager::new(ManagerConfig::default());
        assert!(manager.tools().contains(TASK_TOOL_NAME));
        assert!(manager.tools().contains("Read"));
    }
}
