//! Engine core: the bus surface, the dispatcher that fans out one publish,
//! the router that feeds handler results back in, and the worker pool the
//! whole thing runs on.

mod bus;
mod dispatch;
mod pool;
mod remote;
mod router;

pub use bus::{EventBus, LocalBus};
pub use pool::{DispatchHandle, WorkerPool};
pub use remote::{DistributedBus, TopicBus};
