//! # Handler descriptors: one registered subscription each.
//!
//! A [`HandlerDescriptor`] is the immutable record of one subscriber method:
//! the event type it subscribes to (its registration key), its declared
//! parameter count, a de-duplication identity, and an invocation thunk that
//! captures the owning handler object as a shared `Arc`.
//!
//! Descriptors are produced by the discovery collaborator
//! ([`EventHandler`](crate::EventHandler)), consumed by the registry, and
//! never mutated after construction.
//!
//! ## Constructors
//! - [`HandlerDescriptor::subscribe`]: exact concrete event type, no extras.
//! - [`HandlerDescriptor::subscribe_with`]: exact type plus one typed extra
//!   publish-time argument (declared arity 2).
//! - [`HandlerDescriptor::subscribe_marker`]: subscribe to a marker/ancestor
//!   type; the thunk receives the raw [`EventRef`] and may downcast.
//! - [`HandlerDescriptor::subscribe_untyped`]: full generality; raw event,
//!   raw extras, caller-chosen key and arity.
//!
//! ## Outcome
//! A thunk resolves to a tagged [`Outcome`] instead of an opaque value, so
//! the result router switches on the tag rather than probing runtime types:
//! no events, one event, a sequence of events, or an ignored non-event value.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::events::{Event, EventRef, ExtraArg};

/// Tagged result of one handler invocation.
///
/// Encodes the re-publication rules explicitly:
/// - [`Outcome::None`]: nothing produced, nothing republished.
/// - [`Outcome::Event`]: exactly one fire-and-forget republish.
/// - [`Outcome::Events`]: one republish per element, in order. Non-event
///   items never reach this variant; drop them at construction (see
///   [`Outcome::from_iter`]).
/// - [`Outcome::Ignored`]: the handler returned a non-event value; ignored.
pub enum Outcome {
    /// No result value.
    None,
    /// A single produced event.
    Event(EventRef),
    /// A finite sequence of produced events, republished in order.
    Events(Vec<EventRef>),
    /// A non-event result, deliberately discarded.
    Ignored,
}

impl Outcome {
    /// Wraps one produced event.
    #[inline]
    pub fn event<E: Event>(event: E) -> Self {
        Outcome::Event(Arc::new(event))
    }

    /// Wraps an optional produced event; `None` means no result.
    #[inline]
    pub fn maybe<E: Event>(event: Option<E>) -> Self {
        match event {
            Some(ev) => Self::event(ev),
            None => Outcome::None,
        }
    }

    /// Builds a sequence outcome, dropping non-event items.
    ///
    /// Items are `Option<EventRef>` so a mixed result sequence can mark its
    /// non-event members as `None`; they produce zero republishes.
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Option<EventRef>>,
    {
        Outcome::Events(items.into_iter().flatten().collect())
    }

    /// Number of events this outcome will republish.
    pub fn produced(&self) -> usize {
        match self {
            Outcome::None | Outcome::Ignored => 0,
            Outcome::Event(_) => 1,
            Outcome::Events(events) => events.len(),
        }
    }
}

/// Future returned by a descriptor's invocation thunk.
pub type InvokeFuture = Pin<Box<dyn Future<Output = Result<Outcome, DispatchError>> + Send>>;

type Thunk = dyn Fn(EventRef, Arc<[ExtraArg]>) -> InvokeFuture + Send + Sync;

/// De-duplication key: (handler object's concrete type, method name).
///
/// Used only within one dispatch to guarantee at-most-once execution when a
/// descriptor is reachable through several ancestor types. Never used as a
/// storage identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct HandlerIdentity {
    handler_type: TypeId,
    method: &'static str,
}

impl HandlerIdentity {
    /// Derives the identity for method `method` on handler type `H`.
    pub fn of<H: 'static>(method: &'static str) -> Self {
        Self {
            handler_type: TypeId::of::<H>(),
            method,
        }
    }

    /// The subscriber method name.
    #[inline]
    pub fn method(&self) -> &'static str {
        self.method
    }
}

/// One registered subscriber method.
///
/// Immutable once constructed. The owning handler object is captured inside
/// the thunk as an `Arc`, shared with the caller, never owned by the
/// registry.
pub struct HandlerDescriptor {
    event_type: TypeId,
    event_type_name: &'static str,
    handler_name: &'static str,
    identity: HandlerIdentity,
    arity: usize,
    thunk: Box<Thunk>,
}

impl HandlerDescriptor {
    /// Subscribes `handler` to the concrete event type `E` with no extra
    /// arguments (declared arity 1).
    ///
    /// The closure receives the shared handler and the event, already
    /// downcast. Arity-1 descriptors are invoked for every matching publish,
    /// with publish-time extras ignored.
    pub fn subscribe<H, E, F, Fut>(handler: &Arc<H>, method: &'static str, call: F) -> Self
    where
        H: Send + Sync + 'static,
        E: Event,
        F: Fn(Arc<H>, Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        Self::subscribe_untyped(
            handler,
            method,
            TypeId::of::<E>(),
            type_name::<E>(),
            1,
            move |owner, event, _extras| {
                let ready = downcast_event::<E>(event, method).map(|ev| call(owner, ev));
                async move {
                    match ready {
                        Ok(fut) => Ok(fut.await),
                        Err(err) => Err(err),
                    }
                }
            },
        )
    }

    /// Subscribes `handler` to the concrete event type `E` with one extra
    /// publish-time argument of type `A` (declared arity 2).
    ///
    /// Invoked only when the publish call supplies exactly one extra; the
    /// extra must downcast to `A`, otherwise the invocation faults with
    /// [`DispatchError::ArgumentType`].
    pub fn subscribe_with<H, E, A, F, Fut>(handler: &Arc<H>, method: &'static str, call: F) -> Self
    where
        H: Send + Sync + 'static,
        E: Event,
        A: Any + Send + Sync + Clone,
        F: Fn(Arc<H>, Arc<E>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        Self::subscribe_untyped(
            handler,
            method,
            TypeId::of::<E>(),
            type_name::<E>(),
            2,
            move |owner, event, extras| {
                let ready = downcast_event::<E>(event, method).and_then(|ev| {
                    extras
                        .first()
                        .and_then(|a| a.downcast_ref::<A>().cloned())
                        .ok_or(DispatchError::ArgumentType {
                            method,
                            index: 0,
                            expected: type_name::<A>(),
                        })
                        .map(|a| call(owner, ev, a))
                });
                async move {
                    match ready {
                        Ok(fut) => Ok(fut.await),
                        Err(err) => Err(err),
                    }
                }
            },
        )
    }

    /// Subscribes `handler` to the marker/ancestor type `M` (declared
    /// arity 1).
    ///
    /// The closure receives the raw [`EventRef`], since any event whose
    /// ancestor chain contains `M` is delivered here regardless of its
    /// concrete type. Downcast inside the closure as needed.
    pub fn subscribe_marker<H, M, F, Fut>(handler: &Arc<H>, method: &'static str, call: F) -> Self
    where
        H: Send + Sync + 'static,
        M: 'static,
        F: Fn(Arc<H>, EventRef) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        Self::subscribe_untyped(
            handler,
            method,
            TypeId::of::<M>(),
            type_name::<M>(),
            1,
            move |owner, event, _extras| {
                let fut = call(owner, event);
                async move { Ok(fut.await) }
            },
        )
    }

    /// Fully general subscription: caller-chosen registration key and arity,
    /// raw event and extras, fallible result.
    ///
    /// The typed constructors are thin wrappers over this one; reach for it
    /// when a handler needs more than one extra argument or wants to report
    /// [`DispatchError::HandlerFailed`] itself.
    pub fn subscribe_untyped<H, F, Fut>(
        handler: &Arc<H>,
        method: &'static str,
        event_type: TypeId,
        event_type_name: &'static str,
        arity: usize,
        call: F,
    ) -> Self
    where
        H: Send + Sync + 'static,
        F: Fn(Arc<H>, EventRef, Arc<[ExtraArg]>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, DispatchError>> + Send + 'static,
    {
        let owner = Arc::clone(handler);
        let thunk: Box<Thunk> = Box::new(move |event, extras| -> InvokeFuture {
            Box::pin(call(Arc::clone(&owner), event, extras))
        });
        Self {
            event_type,
            event_type_name,
            handler_name: type_name::<H>(),
            identity: HandlerIdentity::of::<H>(method),
            arity: arity.max(1),
            thunk,
        }
    }

    /// Registration key: the subscribed event type.
    #[inline]
    pub fn event_type(&self) -> TypeId {
        self.event_type
    }

    /// Declared parameter count: 1 for the event plus the extras.
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// De-duplication identity of this subscription.
    #[inline]
    pub fn identity(&self) -> HandlerIdentity {
        self.identity
    }

    /// The subscriber method name, as supplied at construction.
    ///
    /// Filters commonly key on this to veto specific subscriptions.
    #[inline]
    pub fn method(&self) -> &'static str {
        self.identity.method
    }

    /// Runs the invocation thunk. Arity checking is the dispatcher's job;
    /// the thunk assumes `extras` already matches the declared shape.
    pub(crate) fn invoke(&self, event: EventRef, extras: Arc<[ExtraArg]>) -> InvokeFuture {
        (self.thunk)(event, extras)
    }
}

impl fmt::Display for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.handler_name, self.identity.method)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("handler", &self.handler_name)
            .field("method", &self.identity.method)
            .field("event_type", &self.event_type_name)
            .field("arity", &self.arity)
            .finish()
    }
}

fn downcast_event<E: Event>(event: EventRef, method: &'static str) -> Result<Arc<E>, DispatchError> {
    let any: Arc<dyn Any + Send + Sync> = event;
    any.downcast::<E>().map_err(|_| DispatchError::EventType {
        method,
        expected: type_name::<E>(),
    })
}
