//! Order-preserving binary encoding of paths.
//!
//! A path is a sequence of segments, each either a 32-bit array index or a
//! record key. Segments are concatenated with no length prefix; a 1-byte
//! tag at the head of each segment (`0x00` for numbers, `0x01` for strings)
//! makes the whole encoding self-delimiting and keeps numbers sorting
//! before strings at any given depth, matching how this crate reports
//! array indices before named keys during enumeration.

use crate::error::Error;

const TAG_NUMBER: u8 = 0x00;
const TAG_STRING: u8 = 0x01;
const STRING_TERMINATOR: u16 = 0xFFFE;

/// The maximum value a number segment may hold (array indices are dense
/// `u32`s up to and including this bound — `2^32 - 1` itself is reserved as
/// an exclusive scan boundary, not a legal index — mirroring the JS
/// safe-array-index ceiling the on-disk format was designed around).
pub const MAX_INDEX: u32 = u32::MAX - 1;

/// One step of a [`Path`]: either an array index or a record key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
	Index(u32),
	Key(String),
}

impl Segment {
	/// Normalize an external key the way the navigator does: anything that
	/// parses as a non-negative integer `<= MAX_INDEX` becomes an index,
	/// everything else becomes a string key.
	pub fn normalize(key: &str) -> Segment {
		if let Ok(n) = key.parse::<u32>() {
			if n <= MAX_INDEX && n.to_string() == key {
				return Segment::Index(n);
			}
		}
		Segment::Key(key.to_string())
	}

	pub(crate) fn encode(&self, out: &mut Vec<u8>) -> Result<(), Error> {
		match self {
			Segment::Index(n) => {
				out.push(TAG_NUMBER);
				out.extend_from_slice(&n.to_be_bytes());
			}
			Segment::Key(s) => {
				out.push(TAG_STRING);
				for unit in s.encode_utf16() {
					if unit >= STRING_TERMINATOR {
						return Err(Error::InvalidCodeUnit {
							unit,
							context: "path segment",
						});
					}
					out.extend_from_slice(&unit.to_be_bytes());
				}
				out.extend_from_slice(&STRING_TERMINATOR.to_be_bytes());
			}
		}
		Ok(())
	}
}

/// An ordered sequence of [`Segment`]s from a table root to a stored cell.
/// The empty path denotes the table root itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path(Vec<Segment>);

impl Path {
	pub fn root() -> Path {
		Path(Vec::new())
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn segments(&self) -> &[Segment] {
		&self.0
	}

	/// Return a new path extended by one segment.
	pub fn child(&self, segment: Segment) -> Path {
		let mut segments = self.0.clone();
		segments.push(segment);
		Path(segments)
	}

	pub fn last(&self) -> Option<&Segment> {
		self.0.last()
	}

	pub fn encode(&self) -> Result<Vec<u8>, Error> {
		let mut out = Vec::new();
		for segment in &self.0 {
			segment.encode(&mut out)?;
		}
		Ok(out)
	}

	/// Decode a full byte string back into a path. Used by the navigator to
	/// recover the trailing segment of a row returned from a range scan.
	pub fn decode(mut bytes: &[u8]) -> Result<Path, Error> {
		let mut segments = Vec::new();
		while !bytes.is_empty() {
			let (segment, rest) = decode_one(bytes)?;
			segments.push(segment);
			bytes = rest;
		}
		Ok(Path(segments))
	}
}

fn decode_one(bytes: &[u8]) -> Result<(Segment, &[u8]), Error> {
	let (&tag, rest) = bytes
		.split_first()
		.ok_or(Error::UnknownTag { kind: "path", tag: 0 })?;
	match tag {
		TAG_NUMBER => {
			if rest.len() < 4 {
				return Err(Error::UnknownTag { kind: "path", tag });
			}
			let (head, rest) = rest.split_at(4);
			let n = u32::from_be_bytes(head.try_into().unwrap());
			Ok((Segment::Index(n), rest))
		}
		TAG_STRING => {
			let mut units = Vec::new();
			let mut rest = rest;
			loop {
				if rest.len() < 2 {
					return Err(Error::UnknownTag { kind: "path", tag });
				}
				let (head, tail) = rest.split_at(2);
				let unit = u16::from_be_bytes(head.try_into().unwrap());
				rest = tail;
				if unit == STRING_TERMINATOR {
					break;
				}
				units.push(unit);
			}
			let s = String::from_utf16(&units).map_err(|_| Error::UnknownTag {
				kind: "path",
				tag: TAG_STRING,
			})?;
			Ok((Segment::Key(s), rest))
		}
		other => Err(Error::UnknownTag { kind: "path", tag: other }),
	}
}

/// Render a path the way logs do: not on the wire, just for diagnostics.
/// Mirrors the escaped-byte debug helper this crate's teacher keeps
/// separate from its wire-format code.
pub mod debug {
	pub fn sprint<T: AsRef<[u8]>>(bytes: &T) -> String {
		bytes
			.as_ref()
			.iter()
			.flat_map(|&byte| std::ascii::escape_default(byte))
			.map(|byte| byte as char)
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalize_index_vs_key() {
		assert_eq!(Segment::normalize("0"), Segment::Index(0));
		assert_eq!(Segment::normalize("42"), Segment::Index(42));
		assert_eq!(Segment::normalize("007"), Segment::Key("007".into()));
		assert_eq!(Segment::normalize("-1"), Segment::Key("-1".into()));
		assert_eq!(Segment::normalize("hello"), Segment::Key("hello".into()));
	}

	#[test]
	fn normalize_accepts_max_index_inclusive() {
		assert_eq!(
			Segment::normalize(&MAX_INDEX.to_string()),
			Segment::Index(MAX_INDEX)
		);
		assert_eq!(
			Segment::normalize(&(MAX_INDEX as u64 + 1).to_string()),
			Segment::Key((MAX_INDEX as u64 + 1).to_string())
		);
	}

	#[test]
	fn index_sorts_before_key_at_same_depth() {
		let a = Path::root().child(Segment::Index(u32::MAX - 2));
		let b = Path::root().child(Segment::Key("".into()));
		assert!(a.encode().unwrap() < b.encode().unwrap());
	}

	#[test]
	fn numbers_sort_numerically() {
		let a = Path::root().child(Segment::Index(3));
		let b = Path::root().child(Segment::Index(9));
		assert!(a.encode().unwrap() < b.encode().unwrap());
	}

	#[test]
	fn prefix_key_sorts_before_longer_key() {
		let a = Path::root().child(Segment::Key("a".into()));
		let b = Path::root().child(Segment::Key("ab".into()));
		assert!(a.encode().unwrap() < b.encode().unwrap());
	}

	#[test]
	fn round_trip_mixed_path() {
		let path = Path::root()
			.child(Segment::Index(7))
			.child(Segment::Key("name".into()))
			.child(Segment::Index(0));
		let encoded = path.encode().unwrap();
		let decoded = Path::decode(&encoded).unwrap();
		assert_eq!(path, decoded);
	}

	#[test]
	fn rejects_terminator_code_unit() {
		let path = Path::root().child(Segment::Key("a\u{FFFE}b".into()));
		assert!(matches!(path.encode(), Err(Error::InvalidCodeUnit { .. })));
	}

	#[test]
	fn round_trips_non_bmp_via_surrogate_pair() {
		let path = Path::root().child(Segment::Key("𝄞".into()));
		let encoded = path.encode().unwrap();
		let decoded = Path::decode(&encoded).unwrap();
		assert_eq!(path, decoded);
	}
}
