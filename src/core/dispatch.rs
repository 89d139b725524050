//! # Dispatcher: the fan-out for one published event.
//!
//! One publish call = one dispatcher run = one schedulable unit of work.
//! Recursively produced events are never inlined into the running dispatch;
//! the router submits them as fresh, independent runs.
//!
//! ## Algorithm
//! 1. Resolve candidates from the registry (full type chain, de-duplicated).
//! 2. Per candidate, in order: filter check → arity check → invoke.
//! 3. Await each invocation before starting the next: handlers for one event
//!    run strictly sequentially, on this task.
//! 4. Route each successful outcome; contain every fault at the per-handler
//!    boundary.
//!
//! ## Argument binding
//! - Arity 1: the handler receives the event alone; publish-time extras are
//!   ignored for it.
//! - Arity > 1: invoked only when arity equals 1 + supplied extras; any other
//!   shape is a silent, non-fatal skip, not an error.
//!
//! ## Fault isolation
//! A panicking or failing handler is logged and skipped; the remaining
//! candidates for the event still run. Nothing a handler does can abort the
//! dispatch of its peers.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, trace, warn};

use crate::core::bus::BusCore;
use crate::core::router::ResultRouter;
use crate::error::panic_message;
use crate::events::{no_extras, EventRef, ExtraArg};

/// Executes the full fan-out for one published event.
pub(crate) struct Dispatcher;

impl Dispatcher {
    /// Runs one dispatch: every non-suppressed, arity-compatible candidate
    /// for `event`, sequentially, with per-handler fault containment.
    pub(crate) async fn run(core: &Arc<BusCore>, event: EventRef, extras: Arc<[ExtraArg]>) {
        let candidates = core.registry.lookup(event.as_ref());
        trace!(event = ?event, candidates = candidates.len(), "resolved dispatch candidates");

        for descriptor in candidates {
            if core.filters.is_suppressed(event.as_ref(), &descriptor) {
                trace!(event = ?event, handler = %descriptor, "event is filtered");
                continue;
            }

            let call_extras = match descriptor.arity() {
                1 => no_extras(),
                n if n == extras.len() + 1 => Arc::clone(&extras),
                n => {
                    debug!(
                        handler = %descriptor,
                        declared = n,
                        supplied = extras.len(),
                        "skipping handler: argument count mismatch"
                    );
                    continue;
                }
            };

            trace!(event = ?event, handler = %descriptor, "executing handler");
            let invocation = descriptor.invoke(Arc::clone(&event), call_extras);
            match std::panic::AssertUnwindSafe(invocation).catch_unwind().await {
                Ok(Ok(outcome)) => ResultRouter::route(core, outcome),
                Ok(Err(err)) => warn!(
                    handler = %descriptor,
                    label = err.as_label(),
                    error = %err,
                    "handler invocation failed"
                ),
                Err(panic) => warn!(
                    handler = %descriptor,
                    panic = %panic_message(panic),
                    "handler panicked"
                ),
            }
        }
    }
}
