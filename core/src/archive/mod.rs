//! Archive access: opening containers, listing entries, and choosing page candidates.

pub mod classify;
pub mod entry;
pub mod loader;
pub mod sort;

pub use classify::{Candidate, EntryClassifier, extension_of, kind_for_extension};
pub use entry::{ArchiveEntry, EntryInfo, EntryReader, OpenedArchive};
pub use loader::ArchiveLoader;
pub use sort::{Token, natural_cmp, tokenize};
