//! `set`: the central write algorithm, and the transaction/cycle-guard
//! machinery it shares with recursive composite writes.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::error::{self, Error};
use crate::handle::{Handle, Kind};
use crate::path::{self, Path, Segment, MAX_INDEX};
use crate::range::range;
use crate::source::{Scalar, Source};
use crate::value::{Value, TAG_ARRAY, TAG_RECORD};

/// Per-write identity set, keyed by [`Source`] pointer identity. Local to
/// one top-level `set` call; never stored on the [`Handle`] itself.
struct WriteCtx {
	seen: HashSet<*const ()>,
}

impl WriteCtx {
	fn new() -> WriteCtx {
		WriteCtx {
			seen: HashSet::new(),
		}
	}

	/// Before recursing into a composite, record its identity — or fail if
	/// it is already being written somewhere up the call stack.
	fn enter(&mut self, source: &Source, path: &Path) -> Result<(), Error> {
		if let Some(id) = source.identity() {
			if !self.seen.insert(id) {
				return Err(Error::Cycle {
					path: error::fmt_path(path),
				});
			}
		}
		Ok(())
	}
}

impl Handle {
	/// `set(key, value)`. See §4.E: the outermost call on a key opens a
	/// transaction, wipes the existing subtree at `key`, and writes
	/// `value` in its place; composite values recurse under the same
	/// transaction and the same cycle guard.
	#[tracing::instrument(level = "trace", skip(self, value), fields(table = %self.table))]
	pub fn set(&self, key: &str, value: Source) -> Result<(), Error> {
		if self.kind == Kind::Array && key == "length" {
			return self.set_length(&value);
		}
		let segment = Segment::normalize(key);
		let path = self.prefix.child(segment);
		let table = self.table.clone();
		self.conn.transact(move |conn| {
			delete_subtree(conn, &table, &path)?;
			let mut ctx = WriteCtx::new();
			write_value(conn, &table, &path, &value, &mut ctx)
		})
	}

	/// Array-length assignment: truncation only, never creates holes. The
	/// value must be a safe integer in `[0, 2^32 - 1]` (i.e. `<= MAX_INDEX`;
	/// `2^32 - 1` itself is reserved as a scan boundary, not a legal length).
	fn set_length(&self, value: &Source) -> Result<(), Error> {
		let n = match value {
			Source::Scalar(Scalar::Number(n))
				if n.is_finite() && n.fract() == 0.0 && *n >= 0.0 && *n <= MAX_INDEX as f64 =>
			{
				*n as u32
			}
			other => return Err(Error::InvalidArrayLength(format!("{other:?}"))),
		};
		let prefix = self.prefix.clone();
		let table = self.table.clone();
		self.conn.transact(move |conn| {
			let lower = prefix.child(Segment::Index(n)).encode()?;
			let upper = prefix.child(Segment::Index(u32::MAX)).encode()?;
			conn.execute(
				&format!("DELETE FROM \"{table}\" WHERE path >= ?1 AND path < ?2"),
				rusqlite::params![lower, upper],
			)
			.map_err(Error::Backend)?;
			Ok(())
		})
	}
}

fn delete_subtree(conn: &Connection, table: &str, path: &Path) -> Result<(), Error> {
	let encoded = path.encode()?;
	let (lower, upper) = range(&encoded);
	conn.execute(
		&format!("DELETE FROM \"{table}\" WHERE path >= ?1 AND path < ?2"),
		rusqlite::params![lower, upper],
	)
	.map_err(Error::Backend)?;
	Ok(())
}

/// Recursively write `source` at `path`, sharing `ctx`'s cycle guard.
/// Composite writes are not individually transacted — the caller (`set`)
/// already opened the one transaction that covers this whole call.
fn write_value(
	conn: &Connection,
	table: &str,
	path: &Path,
	source: &Source,
	ctx: &mut WriteCtx,
) -> Result<(), Error> {
	match source {
		Source::Scalar(scalar) => {
			let value: Value = scalar.clone().into();
			insert_row(conn, table, path, &value.encode())
		}
		Source::Array(items) => {
			ctx.enter(source, path)?;
			insert_row(conn, table, path, &[TAG_ARRAY])?;
			for (i, item) in items.borrow().iter().enumerate() {
				if i as u64 > MAX_INDEX as u64 {
					return Err(Error::InvalidArrayLength(format!(
						"array exceeds the maximum index at {}",
						error::fmt_path(path)
					)));
				}
				let child_path = path.child(Segment::Index(i as u32));
				write_value(conn, table, &child_path, item, ctx)?;
			}
			Ok(())
		}
		Source::Record(fields) => {
			ctx.enter(source, path)?;
			insert_row(conn, table, path, &[TAG_RECORD])?;
			for (key, item) in fields.borrow().iter() {
				let child_path = path.child(Segment::normalize(key));
				write_value(conn, table, &child_path, item, ctx)?;
			}
			Ok(())
		}
	}
}

fn insert_row(conn: &Connection, table: &str, path: &Path, value: &[u8]) -> Result<(), Error> {
	let encoded = path.encode()?;
	trace!(path = %path::debug::sprint(&encoded), len = value.len(), "insert");
	conn.execute(
		&format!("INSERT INTO \"{table}\" (path, value) VALUES (?1, ?2)"),
		rusqlite::params![encoded, value],
	)
	.map_err(Error::Backend)?;
	Ok(())
}
