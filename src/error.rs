//! Error types used by the dispatch engine and bus contracts.
//!
//! This module defines two error enums:
//!
//! - [`DispatchError`]: per-handler invocation faults. These never propagate
//!   out of a dispatch: the engine logs them and continues with the remaining
//!   handlers for the event.
//! - [`BusError`]: contract errors for wrapper buses (distributed/topic
//!   variants) that compose against the core surface.
//!
//! Both types provide `as_label` for stable snake_case identifiers in logs.

use thiserror::Error;

/// # Faults raised while invoking a single handler.
///
/// Fault isolation is per handler, not per event: any of these aborts only
/// the one invocation that produced it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The delivered event could not be downcast to the subscribed type.
    ///
    /// Reachable only when a typed descriptor was registered under a key that
    /// does not match its own event type (a wiring bug in the descriptor
    /// producer, not in the publisher).
    #[error("method {method}: event is not a {expected}")]
    EventType {
        /// Subscriber method that rejected the event.
        method: &'static str,
        /// The event type the method declared.
        expected: &'static str,
    },

    /// An extra publish-time argument had an unexpected concrete type.
    #[error("method {method}: argument {index} is not a {expected}")]
    ArgumentType {
        /// Subscriber method that rejected the argument.
        method: &'static str,
        /// Zero-based position among the extra arguments.
        index: usize,
        /// The argument type the method declared.
        expected: &'static str,
    },

    /// The handler body reported a failure.
    #[error("method {method}: {message}")]
    HandlerFailed {
        /// Subscriber method that failed.
        method: &'static str,
        /// Failure message supplied by the handler.
        message: String,
    },
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use localbus::DispatchError;
    ///
    /// let err = DispatchError::ArgumentType { method: "on_event", index: 0, expected: "i64" };
    /// assert_eq!(err.as_label(), "argument_type_mismatch");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::EventType { .. } => "event_type_mismatch",
            DispatchError::ArgumentType { .. } => "argument_type_mismatch",
            DispatchError::HandlerFailed { .. } => "handler_failed",
        }
    }
}

/// # Errors surfaced by wrapper buses.
///
/// The core never produces these; they exist so distributed/topic bus
/// implementations share one error contract. See
/// [`DistributedBus`](crate::DistributedBus) and [`TopicBus`](crate::TopicBus).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// Connecting to or disconnecting from the remote bus failed.
    #[error("connection failed: {message}")]
    Connection {
        /// Transport-specific failure message.
        message: String,
    },

    /// A topic subscribe/unsubscribe operation failed.
    #[error("topic {topic}: {message}")]
    Topic {
        /// The topic the operation targeted.
        topic: String,
        /// Transport-specific failure message.
        message: String,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::Connection { .. } => "bus_connection",
            BusError::Topic { .. } => "bus_topic",
        }
    }
}

/// Renders a caught panic payload for logging.
pub(crate) fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
