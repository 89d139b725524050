//! # Handler registry: type-keyed subscription storage and resolution.
//!
//! The registry maps registration keys (event [`TypeId`]s) to descriptor
//! lists and resolves, for a published event, every descriptor reachable
//! through the event's full type chain.
//!
//! ## Rules
//! - Registration is append-only: buckets grow, descriptors never mutate.
//! - Lookup walks the chain concrete-type-first, keeps each bucket's
//!   registration order, and de-duplicates by [`HandlerIdentity`]; the first
//!   occurrence along the walk wins.
//! - The type chain of each concrete event type is computed once and cached;
//!   `ancestors()` never runs per publish.
//! - Reads and writes may interleave freely across threads; critical
//!   sections are short and never held across an await point.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::events::{type_chain, Event};
use crate::handlers::descriptor::{HandlerDescriptor, HandlerIdentity};

/// Subscription store with type-hierarchy resolution.
///
/// Owned by one bus instance; there is no process-wide registry.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: RwLock<HashMap<TypeId, Vec<Arc<HandlerDescriptor>>>>,
    chains: RwLock<HashMap<TypeId, Arc<[TypeId]>>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts each descriptor under its registration key, preserving
    /// registration order within the key's bucket.
    ///
    /// Safe to call concurrently with lookups; a running dispatch observes
    /// either the pre- or post-registration bucket, never a torn one.
    pub fn register(&self, descriptors: Vec<HandlerDescriptor>) {
        if descriptors.is_empty() {
            return;
        }
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for descriptor in descriptors {
            debug!(descriptor = ?descriptor, "registering handler descriptor");
            entries
                .entry(descriptor.event_type())
                .or_default()
                .push(Arc::new(descriptor));
        }
    }

    /// Resolves the ordered candidate list for one published event.
    ///
    /// Walks the event's type chain (concrete type, then declared ancestors),
    /// collecting each bucket in registration order and dropping repeats of
    /// the same [`HandlerIdentity`]. A descriptor reachable through two
    /// ancestor types therefore appears exactly once, at its first position.
    pub fn lookup(&self, event: &dyn Event) -> Vec<Arc<HandlerDescriptor>> {
        let chain = self.chain_for(event);
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        let mut seen: HashSet<HandlerIdentity> = HashSet::new();
        let mut candidates = Vec::new();
        for ty in chain.iter() {
            if let Some(bucket) = entries.get(ty) {
                for descriptor in bucket {
                    if seen.insert(descriptor.identity()) {
                        candidates.push(Arc::clone(descriptor));
                    }
                }
            }
        }
        candidates
    }

    /// Number of registered descriptors across all keys.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Returns the cached type chain for the event's concrete type,
    /// computing and caching it on first sight.
    fn chain_for(&self, event: &dyn Event) -> Arc<[TypeId]> {
        // Upcast first so the id names the concrete event type, not the
        // trait object.
        let concrete = (event as &dyn Any).type_id();
        {
            let chains = self.chains.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(chain) = chains.get(&concrete) {
                return Arc::clone(chain);
            }
        }

        let chain: Arc<[TypeId]> = type_chain(event).into();
        let mut chains = self.chains.write().unwrap_or_else(PoisonError::into_inner);
        // Two racers compute identical chains; first insert wins.
        Arc::clone(chains.entry(concrete).or_insert(chain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::descriptor::Outcome;

    #[derive(Debug)]
    struct Broad;

    #[derive(Debug)]
    struct First {
        _id: i64,
    }

    impl Event for First {
        fn ancestors(&self) -> Vec<TypeId> {
            vec![TypeId::of::<Broad>()]
        }
    }

    #[derive(Debug)]
    struct Second;

    impl Event for Second {}

    struct HandlerA;
    struct HandlerB;

    fn typed(handler: &Arc<HandlerA>, method: &'static str) -> HandlerDescriptor {
        HandlerDescriptor::subscribe(handler, method, |_h: Arc<HandlerA>, _ev: Arc<First>| async move {
            Outcome::None
        })
    }

    fn marker<H: Send + Sync + 'static>(handler: &Arc<H>, method: &'static str) -> HandlerDescriptor {
        HandlerDescriptor::subscribe_marker::<H, Broad, _, _>(handler, method, |_h, _ev| async move {
            Outcome::None
        })
    }

    #[test]
    fn test_lookup_walks_ancestor_chain_in_order() {
        let registry = HandlerRegistry::new();
        let a = Arc::new(HandlerA);
        let b = Arc::new(HandlerB);

        registry.register(vec![marker(&b, "broad")]);
        registry.register(vec![typed(&a, "narrow")]);

        let found = registry.lookup(&First { _id: 1 });
        assert_eq!(found.len(), 2);
        // Concrete-type bucket precedes the ancestor bucket regardless of
        // registration order.
        assert_eq!(found[0].method(), "narrow");
        assert_eq!(found[1].method(), "broad");
    }

    #[test]
    fn test_lookup_deduplicates_by_identity_first_wins() {
        let registry = HandlerRegistry::new();
        let a = Arc::new(HandlerA);

        // Same method registered under both the concrete type and the marker:
        // reachable twice, resolved once.
        registry.register(vec![typed(&a, "shared"), marker(&a, "shared")]);

        let found = registry.lookup(&First { _id: 1 });
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].event_type(), TypeId::of::<First>());
    }

    #[test]
    fn test_lookup_ignores_unrelated_types() {
        let registry = HandlerRegistry::new();
        let a = Arc::new(HandlerA);
        registry.register(vec![typed(&a, "narrow")]);

        assert!(registry.lookup(&Second).is_empty());
    }

    #[test]
    fn test_registration_order_within_bucket_is_kept() {
        let registry = HandlerRegistry::new();
        let a = Arc::new(HandlerA);

        registry.register(vec![typed(&a, "one"), typed(&a, "two"), typed(&a, "three")]);

        let found = registry.lookup(&First { _id: 1 });
        let methods: Vec<&str> = found.iter().map(|d| d.method()).collect();
        assert_eq!(methods, vec!["one", "two", "three"]);
    }
}
