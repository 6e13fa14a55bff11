//! Ports: trait seams between the domain/services and the outside world.

pub mod contact_source;
pub mod instance_store;
pub mod notifier;
pub mod task_sink;

pub use contact_source::ContactSource;
pub use instance_store::InstanceStore;
pub use notifier::Notifier;
pub use task_sink::TaskSink;
