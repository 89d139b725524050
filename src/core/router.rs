//! # Result router: turns handler outcomes into new publishes.
//!
//! After a handler runs, its [`Outcome`] tag decides what happens next:
//!
//! ```text
//! Outcome::None      ──► nothing
//! Outcome::Event(e)  ──► one fire-and-forget publish of e
//! Outcome::Events(v) ──► one publish per element, in sequence order
//! Outcome::Ignored   ──► nothing (handler returned a non-event value)
//! ```
//!
//! Every republish is an independent dispatch task: it does not extend the
//! originating run, is not covered by that run's completion handle, and
//! carries no publish-time extras. The core enforces no republish depth
//! bound: a handler chain that republishes forever will not terminate;
//! cycle detection is the caller's responsibility.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::core::bus::BusCore;
use crate::events::{no_extras, EventRef};
use crate::handlers::Outcome;

/// Interprets one handler's return value.
pub(crate) struct ResultRouter;

impl ResultRouter {
    /// Routes an outcome produced by a successful invocation.
    pub(crate) fn route(core: &Arc<BusCore>, outcome: Outcome) {
        match outcome {
            Outcome::None => {}
            Outcome::Event(event) => Self::republish(core, event),
            Outcome::Events(events) => {
                for event in events {
                    Self::republish(core, event);
                }
            }
            Outcome::Ignored => trace!("handler result is not an event; ignored"),
        }
    }

    fn republish(core: &Arc<BusCore>, event: EventRef) {
        debug!(event = ?event, "handler produced an event; republishing");
        core.submit(event, no_extras()).forget();
    }
}
