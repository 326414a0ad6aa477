//! The in-memory value graph a caller builds up to pass to [`set`](crate::Handle::set).
//!
//! A value freshly read out of storage ([`crate::Value`]) can never be
//! cyclic — nothing on disk points back to itself. The graph a caller is
//! *about to write*, however, can: callers build it by hand, and nothing
//! stops them from aliasing a composite node into its own descendants
//! (`let x = Source::record(); x.insert("self", x.clone());`). Composites
//! are therefore reference-counted, interior-mutable nodes rather than a
//! plain owned tree, so that cloning shares identity the way the write-time
//! cycle guard needs it to.

use std::cell::RefCell;
use std::rc::Rc;

use num_bigint::BigInt;

use crate::value::RegexLit;

/// A scalar leaf value, shared between [`Source`] and the decoded
/// [`crate::Value`] type.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	Bigint(BigInt),
	Timestamp(chrono::DateTime<chrono::Utc>),
	Regex(RegexLit),
}

impl From<Scalar> for crate::value::Value {
	fn from(s: Scalar) -> Self {
		match s {
			Scalar::Null => crate::value::Value::Null,
			Scalar::Bool(b) => crate::value::Value::Bool(b),
			Scalar::Number(n) => crate::value::Value::Number(n),
			Scalar::String(s) => crate::value::Value::String(s),
			Scalar::Bigint(b) => crate::value::Value::Bigint(b),
			Scalar::Timestamp(t) => crate::value::Value::Timestamp(t),
			Scalar::Regex(r) => crate::value::Value::Regex(r),
		}
	}
}

/// A value to be written: a scalar, a dense array, or a keyed record.
///
/// Arrays and records hold their children behind `Rc<RefCell<..>>` so a
/// caller can build a genuinely self-referential graph; see the module
/// docs. Cloning a `Source::Array`/`Source::Record` clones the handle, not
/// the contents — exactly the aliasing a caller needs to construct a cycle,
/// and exactly what makes pointer-identity the right cycle-guard key.
#[derive(Clone, Debug)]
pub enum Source {
	Scalar(Scalar),
	Array(Rc<RefCell<Vec<Source>>>),
	Record(Rc<RefCell<Vec<(String, Source)>>>),
}

impl Source {
	pub fn null() -> Source {
		Source::Scalar(Scalar::Null)
	}

	pub fn array() -> Source {
		Source::Array(Rc::new(RefCell::new(Vec::new())))
	}

	pub fn record() -> Source {
		Source::Record(Rc::new(RefCell::new(Vec::new())))
	}

	pub fn from_iter_array(items: impl IntoIterator<Item = Source>) -> Source {
		Source::Array(Rc::new(RefCell::new(items.into_iter().collect())))
	}

	pub fn from_iter_record(items: impl IntoIterator<Item = (String, Source)>) -> Source {
		Source::Record(Rc::new(RefCell::new(items.into_iter().collect())))
	}

	/// Push a value onto an array `Source`. Panics if called on a scalar or
	/// record; this is a construction-time helper for callers building a
	/// write graph, not a navigator operation.
	pub fn push(&self, value: Source) {
		match self {
			Source::Array(items) => items.borrow_mut().push(value),
			_ => panic!("push called on a non-array Source"),
		}
	}

	/// Insert or append a keyed field on a record `Source`, replacing any
	/// existing field with the same name in place (preserving original
	/// insertion order, the way a plain object's property update does).
	pub fn insert(&self, key: impl Into<String>, value: Source) {
		match self {
			Source::Record(fields) => {
				let key = key.into();
				let mut fields = fields.borrow_mut();
				if let Some(slot) = fields.iter_mut().find(|(k, _)| *k == key) {
					slot.1 = value;
				} else {
					fields.push((key, value));
				}
			}
			_ => panic!("insert called on a non-record Source"),
		}
	}

	/// Pointer identity for the cycle guard: two `Source` values alias the
	/// same node iff this returns the same address for both.
	pub(crate) fn identity(&self) -> Option<*const ()> {
		match self {
			Source::Scalar(_) => None,
			Source::Array(rc) => Some(Rc::as_ptr(rc) as *const ()),
			Source::Record(rc) => Some(Rc::as_ptr(rc) as *const ()),
		}
	}
}

impl From<bool> for Source {
	fn from(b: bool) -> Source {
		Source::Scalar(Scalar::Bool(b))
	}
}

impl From<f64> for Source {
	fn from(n: f64) -> Source {
		Source::Scalar(Scalar::Number(n))
	}
}

impl From<&str> for Source {
	fn from(s: &str) -> Source {
		Source::Scalar(Scalar::String(s.to_string()))
	}
}

impl From<String> for Source {
	fn from(s: String) -> Source {
		Source::Scalar(Scalar::String(s))
	}
}
