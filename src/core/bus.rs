//! # The bus: public publish/registration surface.
//!
//! [`LocalBus`] is the in-process publish controller. It owns all shared
//! dispatch state (registry, filter chain, worker pool) inside one
//! reference-counted core per instance; there is no process-wide singleton.
//!
//! ## Entry points
//! - [`LocalBus::publish`] / [`LocalBus::publish_with`]: fire-and-forget;
//!   submit one dispatch run and return its [`DispatchHandle`] immediately.
//! - [`LocalBus::publish_sync`] / [`LocalBus::publish_sync_with`]: bounded
//!   wait; `true` iff that one run finished in time. Timeout, interruption
//!   and task failure all fold to `false`, never an error, and never cancel
//!   the run.
//! - [`LocalBus::register`]: runs the discovery collaborator
//!   ([`EventHandler::descriptors`]) and stores the result.
//! - [`LocalBus::add_filter`]: appends a suppression predicate.
//!
//! The object-safe [`EventBus`] trait is the surface wrapper buses
//! (distributed, topic-driven) compose against; `LocalBus` implements it.
//!
//! ## Teardown
//! [`LocalBus::shutdown`] closes the pool and waits for in-flight dispatch
//! runs. Dropping the last clone of the bus releases everything else.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::BusConfig;
use crate::core::dispatch::Dispatcher;
use crate::core::pool::{DispatchHandle, WorkerPool};
use crate::events::{no_extras, Event, EventRef, ExtraArg};
use crate::filters::{EventFilter, FilterChain};
use crate::handlers::{EventHandler, HandlerRegistry};

/// Object-safe core surface of the dispatch engine.
///
/// This is the contract a distributed/topic wrapper composes against:
/// translate inbound remote messages into [`EventBus::publish_event`] calls,
/// and optionally forward local publishes outward.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes an event with extra positional arguments, fire-and-forget.
    ///
    /// Returns the handle of the one dispatch run this call submitted.
    fn publish_event(&self, event: EventRef, extras: Vec<ExtraArg>) -> DispatchHandle;

    /// Publishes and waits up to `timeout` for the direct dispatch run.
    ///
    /// `true` only on in-time completion; `false` on timeout or task
    /// failure. The run is never cancelled by its waiter giving up.
    async fn publish_event_sync(
        &self,
        event: EventRef,
        timeout: Duration,
        extras: Vec<ExtraArg>,
    ) -> bool;

    /// Discovers and registers a handler object's subscriptions.
    fn register_handler(&self, handler: Arc<dyn EventHandler>);

    /// Appends a suppression predicate to the filter chain.
    fn register_filter(&self, filter: Arc<dyn EventFilter>);
}

/// Shared dispatch state: one per bus instance.
pub(crate) struct BusCore {
    pub(crate) registry: HandlerRegistry,
    pub(crate) filters: FilterChain,
    pub(crate) pool: WorkerPool,
}

impl BusCore {
    /// Submits one dispatch run for `event` to the pool.
    pub(crate) fn submit(self: &Arc<Self>, event: EventRef, extras: Arc<[ExtraArg]>) -> DispatchHandle {
        debug!(event = ?event, "firing off an async dispatch");
        let core = Arc::clone(self);
        self.pool
            .submit(async move { Dispatcher::run(&core, event, extras).await })
    }

    /// Submits one run and waits up to `timeout`, logging a missed window.
    async fn submit_and_wait(
        self: &Arc<Self>,
        event: EventRef,
        extras: Arc<[ExtraArg]>,
        timeout: Duration,
    ) -> bool {
        let completed = self.submit(event, extras).wait(timeout).await;
        if !completed {
            warn!(timeout = ?timeout, "gave up waiting for dispatch completion");
        }
        completed
    }
}

/// In-process publish/subscribe dispatch engine.
///
/// Cheap to clone; clones share one core. Construct one per application (or
/// per test); all registry and filter state is instance-local.
#[derive(Clone)]
pub struct LocalBus {
    core: Arc<BusCore>,
}

impl LocalBus {
    /// Creates a bus with a pool derived from `config`.
    pub fn new(config: BusConfig) -> Self {
        Self::with_pool(WorkerPool::new(config.concurrency_limit()))
    }

    /// Creates a bus over an externally constructed pool.
    ///
    /// Lets tests inject a single-permit pool for strictly serialized
    /// dispatch runs.
    pub fn with_pool(pool: WorkerPool) -> Self {
        Self {
            core: Arc::new(BusCore {
                registry: HandlerRegistry::new(),
                filters: FilterChain::new(),
                pool,
            }),
        }
    }

    /// Publishes an event, fire-and-forget.
    ///
    /// Submits exactly one dispatch run and returns without waiting for any
    /// handler. The returned handle covers that run only, not the
    /// republishes its handlers may produce. Must be called within a tokio
    /// runtime context.
    pub fn publish<E: Event>(&self, event: E) -> DispatchHandle {
        self.core.submit(Arc::new(event), no_extras())
    }

    /// Publishes an event with extra positional arguments.
    ///
    /// Extras reach only handlers whose declared arity is exactly
    /// `1 + extras.len()`; arity-1 handlers still run, with the extras
    /// ignored; any other declared shape is silently skipped.
    pub fn publish_with<E: Event>(&self, event: E, extras: Vec<ExtraArg>) -> DispatchHandle {
        self.core.submit(Arc::new(event), extras.into())
    }

    /// Publishes and waits up to `timeout` for the direct handlers.
    ///
    /// Returns `true` iff every direct handler invocation for this publish
    /// finished within the window. Returns `false`, never an error, on
    /// timeout or on a failed dispatch task. A `false` does not cancel the
    /// run: handlers keep executing, and events they produce are still
    /// republished.
    pub async fn publish_sync<E: Event>(&self, event: E, timeout: Duration) -> bool {
        self.publish_sync_with(event, timeout, Vec::new()).await
    }

    /// [`LocalBus::publish_sync`] with extra positional arguments.
    pub async fn publish_sync_with<E: Event>(
        &self,
        event: E,
        timeout: Duration,
        extras: Vec<ExtraArg>,
    ) -> bool {
        self.core
            .submit_and_wait(Arc::new(event), extras.into(), timeout)
            .await
    }

    /// Registers a handler object: runs its discovery
    /// ([`EventHandler::descriptors`]) and stores the produced descriptors.
    ///
    /// Safe to call while dispatches are running; in-flight lookups observe
    /// the registry before or after the registration, never mid-write.
    pub fn register<H: EventHandler>(&self, handler: &Arc<H>) {
        debug!(handler = std::any::type_name::<H>(), "registering handler");
        self.core.registry.register(Arc::clone(handler).descriptors());
    }

    /// Appends a suppression predicate to the filter chain.
    pub fn add_filter<F: EventFilter>(&self, filter: F) {
        self.core.filters.add(Arc::new(filter));
    }

    /// Number of registered handler descriptors.
    pub fn handler_count(&self) -> usize {
        self.core.registry.len()
    }

    /// Number of registered filters.
    pub fn filter_count(&self) -> usize {
        self.core.filters.len()
    }

    /// Waits for in-flight dispatch runs and releases the pool.
    ///
    /// Publishes submitted after shutdown begins may be rejected by a closed
    /// bounded pool; an elastic pool drains whatever was already submitted.
    pub async fn shutdown(&self) {
        self.core.pool.shutdown().await;
    }
}

#[async_trait]
impl EventBus for LocalBus {
    fn publish_event(&self, event: EventRef, extras: Vec<ExtraArg>) -> DispatchHandle {
        self.core.submit(event, extras.into())
    }

    async fn publish_event_sync(
        &self,
        event: EventRef,
        timeout: Duration,
        extras: Vec<ExtraArg>,
    ) -> bool {
        self.core.submit_and_wait(event, extras.into(), timeout).await
    }

    fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        debug!("registering handler via discovery");
        self.core.registry.register(handler.descriptors());
    }

    fn register_filter(&self, filter: Arc<dyn EventFilter>) {
        self.core.filters.add(filter);
    }
}
