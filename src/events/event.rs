//! # Event capability and publish-time values.
//!
//! Anything routed through the bus is an [`Event`]: a value identified by its
//! runtime type. The engine requires no fields on it, only enough type
//! information to walk its ancestor chain.
//!
//! ## Ancestor chain
//! The dispatch model routes an event to handlers subscribed to any of its
//! supertypes. Rust has no runtime class hierarchy, so the chain is declared
//! explicitly: [`Event::ancestors`] returns the [`TypeId`]s of the marker
//! types this event also belongs to, most-specific first. A marker type is an
//! ordinary (usually zero-sized) type used purely as a registration key, the
//! equivalent of subscribing to an event interface.
//!
//! ```text
//! publish(SensorReading)            SensorReading implements Event,
//!    │                              ancestors() = [DeviceEvents]
//!    ▼
//! chain = [SensorReading, DeviceEvents]
//!    │
//!    ├─► handlers registered for SensorReading
//!    └─► handlers registered for DeviceEvents
//! ```
//!
//! The chain is resolved once per concrete type and cached by the registry;
//! `ancestors()` is not called on the hot path.
//!
//! ## Example
//! ```rust
//! use std::any::TypeId;
//! use localbus::Event;
//!
//! /// Marker key: "all device events".
//! #[derive(Debug)]
//! struct DeviceEvents;
//!
//! #[derive(Debug)]
//! struct SensorReading { celsius: f64 }
//!
//! impl Event for SensorReading {
//!     fn ancestors(&self) -> Vec<TypeId> {
//!         vec![TypeId::of::<DeviceEvents>()]
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Marker capability for values that can travel through the bus.
///
/// Requirements are intentionally minimal:
/// - `Any`: the engine resolves routing from the concrete runtime type.
/// - `Send + Sync + 'static`: events are shared across dispatch tasks.
/// - `Debug`: events appear in debug/trace logs.
///
/// Events are immutable from the engine's perspective; handlers receive a
/// shared [`EventRef`] and never a mutable borrow.
pub trait Event: Any + Send + Sync + fmt::Debug + 'static {
    /// Ancestor type keys of this event, most-specific first.
    ///
    /// The concrete type itself is always the head of the resolved chain and
    /// must not be repeated here. Defaults to no ancestors.
    fn ancestors(&self) -> Vec<TypeId> {
        Vec::new()
    }
}

impl dyn Event {
    /// Returns `true` if the concrete event type is `T`.
    #[inline]
    pub fn is<T: Event>(&self) -> bool {
        // Upcast first: `type_id` on `&dyn Event` itself would name the
        // trait object type, not the concrete event type.
        (self as &dyn Any).type_id() == TypeId::of::<T>()
    }

    /// Downcasts a borrowed event to its concrete type.
    #[inline]
    pub fn downcast_ref<T: Event>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}

/// Shared reference to a published event.
///
/// Dispatch tasks, handler thunks, and republished results all hold the same
/// allocation; no event is ever copied by the engine.
pub type EventRef = Arc<dyn Event>;

/// Extra positional publish-time argument.
///
/// Handlers that declare more than one parameter receive these appended after
/// the event, in publish order. See [`arg`].
pub type ExtraArg = Arc<dyn Any + Send + Sync>;

/// Wraps a value as an [`ExtraArg`] for `publish_with` / `publish_sync_with`.
///
/// The value's concrete type must match what the receiving handler declared;
/// a mismatch surfaces as an argument-type fault for that handler only.
#[inline]
pub fn arg<T: Any + Send + Sync>(value: T) -> ExtraArg {
    Arc::new(value)
}

/// Empty extras slice, shared shape for plain publishes and republishes.
#[inline]
pub(crate) fn no_extras() -> Arc<[ExtraArg]> {
    Arc::new([])
}

/// Resolves the full type chain of an event: concrete type first, then the
/// declared ancestors in order, duplicates removed.
pub(crate) fn type_chain(event: &dyn Event) -> Vec<TypeId> {
    let ancestors = event.ancestors();
    let mut chain = Vec::with_capacity(1 + ancestors.len());
    chain.push((event as &dyn Any).type_id());
    for ty in ancestors {
        if !chain.contains(&ty) {
            chain.push(ty);
        }
    }
    chain
}
