//! Persistent hierarchical objects backed by a single embedded SQLite
//! table: a caller opens a [`Database`], names a [`Table`], and gets back
//! a [`Handle`] that reads and writes through range-bounded queries over a
//! path-encoded key space, rather than holding the whole object in memory.
//!
//! The path/value codecs ([`path`], [`value`]) and the navigator
//! ([`handle`], [`write`], [`entries`]) are the core; [`store`] is the thin
//! glue around the backing SQLite connection.

#[macro_use]
extern crate tracing;

pub mod error;
pub mod path;
pub mod value;
pub mod source;
mod range;
mod store;
mod table;
mod handle;
mod write;
mod entries;

pub use error::Error;
pub use path::{Path, Segment};
pub use value::{RegexLit, Value};
pub use source::{Scalar, Source};
pub use store::{Database, OpenOptions};
pub use table::Table;
pub use handle::{Handle, Kind, Node};
