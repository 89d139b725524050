//! # Discovery collaborator contract.
//!
//! [`EventHandler`] is the seam between the dispatch core and whatever
//! mechanism enumerates a handler object's subscriber methods. The core is
//! agnostic to how the list is produced (a hand-written table, a build-time
//! code-generation step, a macro); it only consumes the resulting
//! descriptors.
//!
//! ## Rules
//! - `descriptors` is called once, at registration time; the returned list
//!   becomes immutable registry state for the process lifetime.
//! - Order matters: it is the registration order within each event-type
//!   bucket.
//! - Each descriptor should capture the handler through the `Arc` receiver so
//!   the registry shares, never owns, the handler object.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use localbus::{Event, EventHandler, HandlerDescriptor, Outcome};
//!
//! #[derive(Debug)]
//! struct Tick { n: i64 }
//! impl Event for Tick {}
//!
//! struct Counter { total: AtomicI64 }
//!
//! impl EventHandler for Counter {
//!     fn descriptors(self: Arc<Self>) -> Vec<HandlerDescriptor> {
//!         vec![HandlerDescriptor::subscribe(
//!             &self,
//!             "on_tick",
//!             |h: Arc<Counter>, ev: Arc<Tick>| async move {
//!                 h.total.fetch_add(ev.n, Ordering::SeqCst);
//!                 Outcome::None
//!             },
//!         )]
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::handlers::descriptor::HandlerDescriptor;

/// A handler object that can enumerate its own subscriptions.
///
/// Implementations live for the process lifetime once registered; there is
/// no unregistration in the core. Handlers reachable from concurrently
/// dispatched events may be invoked concurrently; internal state must be
/// made safe by the handler author (atomics, locks, channels).
pub trait EventHandler: Send + Sync + 'static {
    /// Produces the ordered subscriber descriptors for this handler object.
    ///
    /// Called by [`LocalBus::register`](crate::LocalBus::register) with a
    /// shared clone of the handler; capture that clone into each descriptor's
    /// thunk.
    fn descriptors(self: Arc<Self>) -> Vec<HandlerDescriptor>;
}
