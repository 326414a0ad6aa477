use std::fmt;

use crate::path::{Path, Segment};

/// Errors surfaced by every public operation.
///
/// Errors raised during a top-level write always roll back the transaction
/// before being returned; errors raised during a read have nothing to roll
/// back. Nothing in this crate swallows an error silently.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// A write received a value that is neither a supported scalar nor a
	/// plain composite, or a table name is not a safe SQL identifier.
	#[error("unsupported type: {0}")]
	UnsupportedType(String),

	/// A string segment or string value contains a UTF-16 code unit that
	/// collides with the path encoding's terminator (`>= 0xFFFE`).
	#[error("invalid code unit 0x{unit:04X} in {context}")]
	InvalidCodeUnit {
		unit: u16,
		context: &'static str,
	},

	/// An array's `length` was set to something other than a safe integer
	/// in `[0, 2^32 - 1)`.
	#[error("invalid array length: {0}")]
	InvalidArrayLength(String),

	/// A write specified metadata (non-enumerable, non-configurable,
	/// non-writable) incompatible with what the core can represent.
	#[error("invalid property descriptor: {0}")]
	InvalidDescriptor(String),

	/// The source object graph being serialized contains itself.
	#[error("cycle detected while writing {path}")]
	Cycle { path: String },

	/// Decode encountered a path or value tag byte this version doesn't
	/// recognize — either on-disk corruption or a newer format.
	#[error("unknown {kind} tag byte 0x{tag:02X}")]
	UnknownTag { kind: &'static str, tag: u8 },

	/// The backing SQLite store reported an error, or the database handle
	/// this operation ran against has already been closed.
	#[error("backend error: {0}")]
	Backend(#[from] rusqlite::Error),

	/// `length` was read or deleted on a handle that is not an array.
	#[error("{0} is not an array")]
	NotAnArray(String),

	/// `length` cannot be deleted; it is derived from the array's children.
	#[error("length is not deletable")]
	LengthNotDeletable,

	/// The database handle (or a table/handle derived from it) was used
	/// after `close`.
	#[error("database handle is closed")]
	Closed,
}

impl Error {
	pub(crate) fn unsupported(what: impl fmt::Display) -> Self {
		Error::UnsupportedType(what.to_string())
	}
}

/// Render a path segment the way error messages and trace fields do:
/// numbers bare, strings quoted. Not used for on-disk encoding.
pub(crate) fn fmt_segment(segment: &Segment) -> String {
	match segment {
		Segment::Index(n) => n.to_string(),
		Segment::Key(s) => format!("{s:?}"),
	}
}

/// Render a whole path as a dotted/bracketed string for error messages,
/// e.g. `root.items[2]`.
pub(crate) fn fmt_path(path: &Path) -> String {
	if path.is_empty() {
		return "root".to_string();
	}
	let mut out = String::from("root");
	for segment in path.segments() {
		match segment {
			Segment::Index(n) => out.push_str(&format!("[{n}]")),
			Segment::Key(s) => out.push_str(&format!(".{s}")),
		}
	}
	out
}
