//! Instance registry and lifecycle.

pub mod lifecycle;
pub mod registry;
pub mod types;

pub use lifecycle::CreateRequest;
pub use registry::InstanceRegistry;
pub use types::{InstanceKind, InstanceRecord, InstanceSummary};
