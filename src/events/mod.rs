//! Event capability: the values the bus routes.

mod event;

pub use event::{arg, Event, EventRef, ExtraArg};

pub(crate) use event::{no_extras, type_chain};
