//! # Filter chain: per-pairing suppression predicates.
//!
//! A filter vetoes a specific (event, descriptor) pairing. The chain is an
//! ordered, append/remove-safe list evaluated before every handler
//! invocation.
//!
//! ## Rules
//! - Any predicate returning `true` suppresses the invocation; evaluation
//!   short-circuits at the first `true`.
//! - A panicking predicate counts as "does not suppress" for that predicate
//!   only; the panic is logged and never propagates, so one buggy filter
//!   cannot block the bus.
//! - A dispatch running concurrently with `add` observes either the pre- or
//!   post-addition chain for any given evaluation, never a torn list.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{trace, warn};

use crate::error::panic_message;
use crate::events::Event;
use crate::handlers::HandlerDescriptor;

/// Suppression predicate for one (event, descriptor) pairing.
///
/// `true` means suppress: the descriptor is not invoked for this event.
/// Implemented for free by any matching closure:
///
/// ```rust
/// use localbus::{Event, EventFilter, HandlerDescriptor};
///
/// let only_handle = |_event: &dyn Event, descriptor: &HandlerDescriptor| {
///     descriptor.method() == "handle"
/// };
/// let _boxed: Box<dyn EventFilter> = Box::new(only_handle);
/// ```
pub trait EventFilter: Send + Sync + 'static {
    /// Returns `true` to suppress this descriptor for this event.
    fn is_filtered(&self, event: &dyn Event, descriptor: &HandlerDescriptor) -> bool;
}

impl<F> EventFilter for F
where
    F: Fn(&dyn Event, &HandlerDescriptor) -> bool + Send + Sync + 'static,
{
    fn is_filtered(&self, event: &dyn Event, descriptor: &HandlerDescriptor) -> bool {
        self(event, descriptor)
    }
}

/// Ordered, concurrently extendable set of suppression predicates.
///
/// Owned by one bus instance. Evaluation takes a snapshot of the current
/// chain (cheap `Arc` clones), so additions during a dispatch affect later
/// evaluations only.
#[derive(Default)]
pub struct FilterChain {
    filters: RwLock<Vec<Arc<dyn EventFilter>>>,
}

impl FilterChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a predicate to the chain.
    pub fn add(&self, filter: Arc<dyn EventFilter>) {
        self.filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(filter);
    }

    /// Removes every predicate from the chain.
    pub fn clear(&self) {
        self.filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of predicates currently in the chain.
    pub fn len(&self) -> usize {
        self.filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if the chain has no predicates.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluates the chain for one (event, descriptor) pairing.
    ///
    /// Short-circuits on the first suppressing predicate. Predicate panics
    /// are contained: logged, treated as "not suppressed", evaluation
    /// continues with the next predicate.
    pub fn is_suppressed(&self, event: &dyn Event, descriptor: &HandlerDescriptor) -> bool {
        let snapshot: Vec<Arc<dyn EventFilter>> = self
            .filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for filter in snapshot {
            trace!(event = ?event, handler = %descriptor, "checking filter");
            match catch_unwind(AssertUnwindSafe(|| filter.is_filtered(event, descriptor))) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(panic) => {
                    warn!(
                        handler = %descriptor,
                        panic = %panic_message(panic),
                        "filter panicked; treating as not suppressed"
                    );
                }
            }
        }
        false
    }
}
