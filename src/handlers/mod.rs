//! Subscriptions: descriptors, the registry that stores them, and the
//! discovery contract that produces them.

mod descriptor;
mod registry;
mod subscriber;

pub use descriptor::{HandlerDescriptor, HandlerIdentity, InvokeFuture, Outcome};
pub use registry::HandlerRegistry;
pub use subscriber::EventHandler;
