//! The navigator: get/has/length/delete over a `(table, prefix)` pair.
//! `set`/`enumerate` live in [`crate::write`]/[`crate::entries`] since each
//! is substantial enough to want its own module, but all three operate on
//! the same [`Handle`].

use std::rc::Rc;

use rusqlite::OptionalExtension;

use crate::error::{self, Error};
use crate::path::{debug::sprint, Path, Segment};
use crate::range::range;
use crate::store::Conn;
use crate::value::{Value, TAG_ARRAY, TAG_RECORD};

/// What kind of composite a handle's own path holds, or `Root` for the
/// handle returned by [`crate::Table::root`]. Only `Array` handles support
/// `length`; only `Array` handles report a synthetic `"length"` key during
/// enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
	Root,
	Record,
	Array,
}

/// A lightweight, cheap-to-clone binding of a backing connection, a table
/// name, a path prefix, and a kind. Child handles (returned by [`Handle::get`]
/// and [`crate::entries::Entries`]) share the same connection and table.
#[derive(Clone)]
pub struct Handle {
	pub(crate) conn: Conn,
	pub(crate) table: Rc<str>,
	pub(crate) prefix: Path,
	pub(crate) kind: Kind,
}

/// The result of a successful [`Handle::get`]: either a scalar leaf value
/// or a handle bound to a deeper composite.
#[derive(Debug)]
pub enum Node {
	Scalar(Value),
	Handle(Handle),
}

impl Handle {
	pub(crate) fn new(conn: Conn, table: Rc<str>, prefix: Path, kind: Kind) -> Handle {
		Handle {
			conn,
			table,
			prefix,
			kind,
		}
	}

	pub fn kind(&self) -> Kind {
		self.kind
	}

	pub fn prefix(&self) -> &Path {
		&self.prefix
	}

	fn child(&self, segment: Segment, kind: Kind) -> Handle {
		Handle::new(
			self.conn.clone(),
			self.table.clone(),
			self.prefix.child(segment),
			kind,
		)
	}

	/// Decode a stored row at `path` into either a scalar or a child
	/// handle, per §4.E: a record marker or array marker becomes a handle,
	/// anything else is a scalar.
	pub(crate) fn node_at(&self, path: Path, value_bytes: &[u8]) -> Result<Node, Error> {
		match value_bytes.first() {
			Some(&TAG_RECORD) => Ok(Node::Handle(Handle::new(
				self.conn.clone(),
				self.table.clone(),
				path,
				Kind::Record,
			))),
			Some(&TAG_ARRAY) => Ok(Node::Handle(Handle::new(
				self.conn.clone(),
				self.table.clone(),
				path,
				Kind::Array,
			))),
			_ => Ok(Node::Scalar(Value::decode(value_bytes)?)),
		}
	}

	/// `get(key)`: a scalar, a child handle, or `None` if nothing is
	/// stored at `key`.
	#[tracing::instrument(level = "trace", skip(self), fields(table = %self.table))]
	pub fn get(&self, key: &str) -> Result<Option<Node>, Error> {
		let segment = Segment::normalize(key);
		let path = self.prefix.child(segment);
		let encoded = path.encode()?;
		let row: Option<Vec<u8>> = self.conn.with(|conn| {
			conn.query_row(
				&format!("SELECT value FROM \"{}\" WHERE path = ?1", self.table),
				[&encoded],
				|row| row.get(0),
			)
			.optional()
		})?;
		trace!(path = %sprint(&encoded), hit = row.is_some(), "get");
		match row {
			Some(bytes) => Ok(Some(self.node_at(path, &bytes)?)),
			None => Ok(None),
		}
	}

	/// `has(key)`: whether a row exists at `key`, without decoding it.
	#[tracing::instrument(level = "trace", skip(self), fields(table = %self.table))]
	pub fn has(&self, key: &str) -> Result<bool, Error> {
		let segment = Segment::normalize(key);
		let encoded = self.prefix.child(segment).encode()?;
		self.conn.with(|conn| {
			conn.query_row(
				&format!("SELECT 1 FROM \"{}\" WHERE path = ?1", self.table),
				[&encoded],
				|_| Ok(()),
			)
			.optional()
			.map(|r| r.is_some())
		})
	}

	/// `length`: only defined on array handles. Finds the greatest child
	/// path one segment longer than this handle's prefix and returns its
	/// trailing index plus one, relying on array density (no gaps).
	#[tracing::instrument(level = "trace", skip(self), fields(table = %self.table))]
	pub fn length(&self) -> Result<u32, Error> {
		self.require_array()?;
		let lower = self.prefix.child(Segment::Index(0)).encode()?;
		let upper = self.prefix.child(Segment::Index(u32::MAX)).encode()?;
		let target_len = lower.len() as i64;
		let greatest: Option<Vec<u8>> = self.conn.with(|conn| {
			conn.query_row(
				&format!(
					"SELECT path FROM \"{}\" \
					 WHERE path >= ?1 AND path < ?2 AND LENGTH(path) = ?3 \
					 ORDER BY path DESC LIMIT 1",
					self.table
				),
				rusqlite::params![lower, upper, target_len],
				|row| row.get(0),
			)
			.optional()
		})?;
		match greatest {
			None => Ok(0),
			Some(bytes) => {
				let path = Path::decode(&bytes)?;
				match path.last() {
					Some(Segment::Index(n)) => Ok(n + 1),
					_ => Err(Error::UnknownTag { kind: "path", tag: 0 }),
				}
			}
		}
	}

	/// `delete(key)`: removes the subtree rooted at `key`, returning
	/// whether anything was removed. Deleting `"length"` on an array
	/// handle is rejected; length is derived, not stored.
	#[tracing::instrument(level = "trace", skip(self), fields(table = %self.table))]
	pub fn delete(&self, key: &str) -> Result<bool, Error> {
		if self.kind == Kind::Array && key == "length" {
			return Err(Error::LengthNotDeletable);
		}
		let segment = Segment::normalize(key);
		let path = self.prefix.child(segment);
		let encoded = path.encode()?;
		let (lower, upper) = range(&encoded);
		let removed = self.conn.with(|conn| {
			conn.execute(
				&format!(
					"DELETE FROM \"{}\" WHERE path >= ?1 AND path < ?2",
					self.table
				),
				rusqlite::params![lower, upper],
			)
		})?;
		trace!(path = %sprint(&encoded), removed, "delete");
		Ok(removed > 0)
	}

	pub(crate) fn require_array(&self) -> Result<(), Error> {
		if self.kind != Kind::Array {
			return Err(Error::NotAnArray(error::fmt_path(&self.prefix)));
		}
		Ok(())
	}
}
