//! Event reconciliation for ZookeeperCluster resources
//!
//! The [`Dispatcher`] is the only writer of the [`InstanceRegistry`]. It filters
//! events by ownership and quarantine state before driving an instance
//! controller.

mod dispatcher;
mod event;
pub mod lifecycle;
pub mod ownership;
mod registry;

pub use dispatcher::{Dispatcher, Disposition};
pub use event::{EventKind, LifecycleEvent};
pub use registry::InstanceRegistry;
