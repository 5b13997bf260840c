//! The index substrate (spec §4.1, §4.8): `IndexBase` and its
//! specializations over an `ObjectStore`.

mod base;
mod memory_index;
mod resource_index;
mod trace_index;

pub use base::{apply_query_filter, IndexBase, IndexedItem, QueryFilter};
pub use memory_index::{MemoryIndex, MemoryRecord};
pub use resource_index::ResourceIndex;
pub use trace_index::{TraceIndex, TraceQuery};
