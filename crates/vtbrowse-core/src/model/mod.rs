/// Data model for the browser engine.
///
/// Re-exports the entry types, the request-scoped registry and the
/// growable menu buffer.
pub mod buffer;
pub mod entry;
pub mod registry;
pub mod size;

pub use buffer::MenuBuffer;
pub use entry::{Entry, EntryKind, ImageKind};
pub use registry::{compare_names, Registry};
