//! # localbus
//!
//! **localbus** is an in-process publish/subscribe dispatch engine for Rust.
//!
//! Components register handler methods for event types, publishers emit
//! events, and the engine routes each event, asynchronously on a worker
//! pool, to every interested, unfiltered handler. A handler may answer with
//! new events, which the engine republishes as independent dispatches.
//!
//! ## Architecture
//! ```text
//!  publish(event [, extras])        publish_sync(event, timeout)
//!        │                                │  (bounded wait on the handle)
//!        ▼                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  LocalBus (publish controller)                                    │
//! │  - HandlerRegistry (type chain → descriptors, cached, deduped)    │
//! │  - FilterChain     (ordered suppression predicates)               │
//! │  - WorkerPool      (one task per publish, optional ceiling)       │
//! └──────────────┬────────────────────────────────────────────────────┘
//!                ▼  one task per publish
//!        ┌──────────────────┐
//!        │    Dispatcher    │  per candidate, strictly in order:
//!        │  (one event run) │  filter? ──► arity? ──► invoke (awaited)
//!        └────────┬─────────┘  faults contained per handler
//!                 ▼  Outcome
//!        ┌──────────────────┐
//!        │   ResultRouter   │──► none / ignored: done
//!        └────────┬─────────┘
//!                 │ event(s) produced
//!                 ▼
//!          LocalBus.publish  (fresh fire-and-forget task, no inlining)
//! ```
//!
//! ## Guarantees
//! - Handlers for one event run **sequentially**, in resolution order
//!   (concrete type's bucket first, then declared ancestors; registration
//!   order within a bucket), each identity at most once per dispatch.
//! - Across publishes there is **no ordering guarantee**; dispatch tasks run
//!   in parallel on the pool.
//! - `publish` never blocks. `publish_sync` blocks only its caller, only up
//!   to the timeout, and **never cancels** the dispatch it waited on.
//! - One faulty handler or filter never takes down the bus: panics and
//!   errors are contained per handler and logged.
//! - Delivery is at-most-once best-effort per handler per event; there are
//!   no retries and no persistence.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::time::Duration;
//! use localbus::{BusConfig, Event, EventHandler, HandlerDescriptor, LocalBus, Outcome};
//!
//! #[derive(Debug)]
//! struct Ping { id: i64 }
//! impl Event for Ping {}
//!
//! struct Recorder { last: AtomicI64 }
//!
//! impl EventHandler for Recorder {
//!     fn descriptors(self: Arc<Self>) -> Vec<HandlerDescriptor> {
//!         vec![HandlerDescriptor::subscribe(
//!             &self,
//!             "on_ping",
//!             |h: Arc<Recorder>, ev: Arc<Ping>| async move {
//!                 h.last.store(ev.id, Ordering::SeqCst);
//!                 Outcome::None
//!             },
//!         )]
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let bus = LocalBus::new(BusConfig::default());
//!     let recorder = Arc::new(Recorder { last: AtomicI64::new(-1) });
//!     bus.register(&recorder);
//!
//!     assert!(bus.publish_sync(Ping { id: 7 }, Duration::from_secs(1)).await);
//!     assert_eq!(recorder.last.load(Ordering::SeqCst), 7);
//!
//!     bus.shutdown().await;
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod filters;
mod handlers;

// ---- Public re-exports ----

pub use config::BusConfig;
pub use crate::core::{DispatchHandle, DistributedBus, EventBus, LocalBus, TopicBus, WorkerPool};
pub use error::{BusError, DispatchError};
pub use events::{arg, Event, EventRef, ExtraArg};
pub use filters::{EventFilter, FilterChain};
pub use handlers::{EventHandler, HandlerDescriptor, HandlerIdentity, HandlerRegistry, InvokeFuture, Outcome};
