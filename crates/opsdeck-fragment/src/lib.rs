//! Server-returned result fragments carry `<script>` elements that stay
//! inert when the markup is installed in bulk. This crate pulls them out
//! in document order and replays them one at a time through a
//! [`ScriptHost`], waiting for each external script to load (or fail)
//! before the next one starts.

pub mod container;
pub mod host;
pub mod queue;
pub mod reanimate;

pub use container::{Container, ScriptKind, ScriptTask};
pub use host::{DocumentHost, ResourceLoader, ScriptHost, ScriptNode};
pub use queue::{QueueError, TaskQueue, TaskState};
pub use reanimate::{ReanimationReport, Reanimator};
