//! Pipeline driver: the OS watcher, the admission worker and the service
//! that wires every stage together.

pub(crate) mod admission;
pub mod service;
pub mod watcher;
