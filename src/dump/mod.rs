//! Heap dump record model and loading.

pub mod parse;
pub mod record;

pub use parse::{Dump, load_dump, parse_dump};
pub use record::{Address, HeapRecord, RefSlot, References, RelationKind};
