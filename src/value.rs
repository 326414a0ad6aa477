//! Tagged binary encoding of leaf values and composite markers.
//!
//! Sort order among encoded value bytes is irrelevant: values are fetched
//! by point lookup on path, never scanned by value, so the tag layout only
//! needs to round-trip, not order.

use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use std::str::FromStr;

use crate::error::Error;

const TAG_NULL: u8 = 0;
const TAG_TRUE: u8 = 1;
const TAG_FALSE: u8 = 2;
const TAG_NUMBER: u8 = 3;
const TAG_STRING: u8 = 4;
const TAG_BIGINT: u8 = 5;
const TAG_TIMESTAMP: u8 = 6;
const TAG_REGEXP: u8 = 7;
pub(crate) const TAG_ARRAY: u8 = 0xFE;
pub(crate) const TAG_RECORD: u8 = 0xFF;

/// A regular-expression literal, stored and round-tripped as opaque source
/// text (`/pattern/flags`) rather than a compiled matcher — the core never
/// executes the pattern, it only preserves it. Construction validates that
/// the pattern portion compiles, so a round-tripped regexp is always a
/// usable one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegexLit {
	source: String,
}

impl RegexLit {
	/// Parse `/pattern/flags`, validating the pattern against the `regex`
	/// crate's syntax (flags are preserved verbatim but not translated,
	/// since JS and Rust regex flag alphabets don't agree one-to-one).
	pub fn parse(source: impl Into<String>) -> Result<RegexLit, Error> {
		let source = source.into();
		let body = source
			.strip_prefix('/')
			.ok_or_else(|| Error::unsupported("regexp literal must start with '/'"))?;
		let end = body
			.rfind('/')
			.ok_or_else(|| Error::unsupported("regexp literal must end with '/flags'"))?;
		let pattern = &body[..end];
		regex::Regex::new(pattern)
			.map_err(|e| Error::unsupported(format!("invalid regexp pattern: {e}")))?;
		Ok(RegexLit { source })
	}

	pub fn as_str(&self) -> &str {
		&self.source
	}
}

/// A value read back from storage. Unlike [`crate::source::Source`], this
/// tree can never be cyclic — nothing read out of the store refers back to
/// itself.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	Bigint(BigInt),
	Timestamp(DateTime<Utc>),
	Regex(RegexLit),
}

impl Value {
	pub(crate) fn encode(&self) -> Vec<u8> {
		let mut out = Vec::new();
		match self {
			Value::Null => out.push(TAG_NULL),
			Value::Bool(true) => out.push(TAG_TRUE),
			Value::Bool(false) => out.push(TAG_FALSE),
			Value::Number(n) => {
				out.push(TAG_NUMBER);
				out.extend_from_slice(&n.to_be_bytes());
			}
			Value::String(s) => {
				out.push(TAG_STRING);
				push_utf16(&mut out, s);
			}
			Value::Bigint(b) => {
				out.push(TAG_BIGINT);
				push_utf16(&mut out, &b.to_str_radix(10));
			}
			Value::Timestamp(ts) => {
				out.push(TAG_TIMESTAMP);
				let millis = ts.timestamp_millis() as f64;
				out.extend_from_slice(&millis.to_be_bytes());
			}
			Value::Regex(r) => {
				out.push(TAG_REGEXP);
				push_utf16(&mut out, r.as_str());
			}
		}
		out
	}

	pub(crate) fn decode(bytes: &[u8]) -> Result<Value, Error> {
		let (&tag, rest) = bytes.split_first().ok_or(Error::UnknownTag {
			kind: "value",
			tag: 0,
		})?;
		match tag {
			TAG_NULL => Ok(Value::Null),
			TAG_TRUE => Ok(Value::Bool(true)),
			TAG_FALSE => Ok(Value::Bool(false)),
			TAG_NUMBER => {
				let bits: [u8; 8] = rest
					.try_into()
					.map_err(|_| Error::UnknownTag { kind: "value", tag })?;
				Ok(Value::Number(f64::from_be_bytes(bits)))
			}
			TAG_STRING => Ok(Value::String(read_utf16(rest)?)),
			TAG_BIGINT => {
				let digits = read_utf16(rest)?;
				let n = BigInt::from_str(&digits)
					.map_err(|_| Error::UnknownTag { kind: "value", tag })?;
				Ok(Value::Bigint(n))
			}
			TAG_TIMESTAMP => {
				let bits: [u8; 8] = rest
					.try_into()
					.map_err(|_| Error::UnknownTag { kind: "value", tag })?;
				let millis = f64::from_be_bytes(bits) as i64;
				let ts = DateTime::<Utc>::from_timestamp_millis(millis)
					.ok_or_else(|| Error::unsupported("timestamp out of range"))?;
				Ok(Value::Timestamp(ts))
			}
			TAG_REGEXP => {
				let source = read_utf16(rest)?;
				RegexLit::parse(source).map(Value::Regex)
			}
			other => Err(Error::UnknownTag { kind: "value", tag: other }),
		}
	}
}

fn push_utf16(out: &mut Vec<u8>, s: &str) {
	for unit in s.encode_utf16() {
		out.extend_from_slice(&unit.to_be_bytes());
	}
}

fn read_utf16(bytes: &[u8]) -> Result<String, Error> {
	if bytes.len() % 2 != 0 {
		return Err(Error::UnknownTag {
			kind: "value",
			tag: TAG_STRING,
		});
	}
	let units: Vec<u16> = bytes
		.chunks_exact(2)
		.map(|c| u16::from_be_bytes([c[0], c[1]]))
		.collect();
	String::from_utf16(&units).map_err(|_| Error::UnknownTag {
		kind: "value",
		tag: TAG_STRING,
	})
}
