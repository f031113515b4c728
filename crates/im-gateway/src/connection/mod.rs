//! Connection state and the process-wide registry

mod connection;
mod registry;

pub use connection::{Connection, EnqueueError, SessionState, OUTBOUND_QUEUE_CAPACITY};
pub use registry::{LoginEvent, Registry, RegistryCounts, RegistryEvent};
