//! Suppression predicates and the chain that evaluates them.

mod chain;

pub use chain::{EventFilter, FilterChain};
