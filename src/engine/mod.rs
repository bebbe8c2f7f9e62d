//! The capture-device settings synchronization engine.
//!
//! ```text
//! enumerator ─▶ lifecycle (open) ─▶ introspector ─▶ reconciler ─▶ settings model
//!                                                     user edit ─▶ applier ─▶ stream
//! ```

pub mod applier;
pub mod enumerator;
pub mod introspector;
pub mod lifecycle;
pub mod reconciler;
pub mod script_builder;

pub use applier::{apply, ApplyOutcome};
pub use enumerator::DeviceEnumerator;
pub use introspector::{read_capabilities, read_current_values};
pub use lifecycle::{ActiveStream, StreamLifecycle};
pub use reconciler::reconcile;
pub use script_builder::{build_request, extract_script};
