use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use std::str::FromStr;

use pathkv::{Database, Handle, Kind, Node, OpenOptions, RegexLit, Scalar, Source, Table, Value};

fn open_table(name: &str) -> (tempfile::TempDir, Table) {
	let dir = tempfile::tempdir().unwrap();
	let db = Database::open(OpenOptions::new(dir.path().join("db.sqlite3"))).unwrap();
	let table = Table::open(&db, name).unwrap();
	(dir, table)
}

fn get_number(h: &Handle, key: &str) -> f64 {
	match h.get(key).unwrap().unwrap() {
		Node::Scalar(Value::Number(n)) => n,
		other => panic!("expected a number at {key:?}, got {other:?}"),
	}
}

#[test]
fn sequential_writes_build_up_entries() {
	let (_dir, table) = open_table("t");
	let root = table.root();
	root.set("0", Source::from(1.0)).unwrap();
	root.set("1", Source::from(2.0)).unwrap();
	let sum = get_number(&root, "0") + get_number(&root, "1");
	root.set("2", Source::from(sum)).unwrap();

	let entries = root.entries().unwrap();
	let values: Vec<f64> = entries
		.iter()
		.map(|(_, node)| match node {
			Node::Scalar(Value::Number(n)) => *n,
			_ => panic!("expected scalar"),
		})
		.collect();
	assert_eq!(values, vec![1.0, 2.0, 3.0]);
	assert_eq!(
		entries.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
		vec!["0", "1", "2"]
	);
}

#[test]
fn array_assignment_then_append_then_length() {
	let (_dir, table) = open_table("t");
	let root = table.root();

	let ints = Source::from_iter_array([Source::from(0.0), Source::from(1.0), Source::from(2.0)]);
	root.set("ints", ints).unwrap();

	let ints_handle = match root.get("ints").unwrap().unwrap() {
		Node::Handle(h) => h,
		_ => panic!("expected a handle"),
	};
	assert_eq!(ints_handle.kind(), Kind::Array);
	ints_handle.set("3", Source::from(3.0)).unwrap();

	let values: Vec<f64> = ints_handle
		.entries()
		.unwrap()
		.into_iter()
		.filter(|(k, _)| k != "length")
		.map(|(_, node)| match node {
			Node::Scalar(Value::Number(n)) => n,
			_ => panic!("expected scalar"),
		})
		.collect();
	assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0]);
	assert_eq!(ints_handle.length().unwrap(), 4);
}

#[test]
fn composite_round_trip_of_every_scalar_kind() {
	let (_dir, table) = open_table("t");
	let root = table.root();

	let record = Source::record();
	record.insert("a_null", Source::null());
	record.insert("a_true", Source::from(true));
	record.insert("a_false", Source::from(false));
	record.insert("a_float", Source::from(2.5_f64));
	record.insert("a_string", Source::from("hello"));
	record.insert(
		"a_bigint",
		Source::Scalar(Scalar::Bigint(BigInt::from_str("123456789012345678901234").unwrap())),
	);
	let ts = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap();
	record.insert("a_timestamp", Source::Scalar(Scalar::Timestamp(ts)));
	record.insert(
		"a_regexp",
		Source::Scalar(Scalar::Regex(RegexLit::parse("/[a-z]+/i").unwrap())),
	);

	let nested_record = Source::record();
	nested_record.insert("x", Source::from(1.0));
	let nested_array = Source::from_iter_array([Source::from("one"), nested_record]);
	record.insert("nested", nested_array);

	root.set("0", record).unwrap();

	let h = match root.get("0").unwrap().unwrap() {
		Node::Handle(h) => h,
		_ => panic!("expected a record handle"),
	};
	assert_eq!(h.kind(), Kind::Record);
	assert!(matches!(h.get("a_null").unwrap().unwrap(), Node::Scalar(Value::Null)));
	assert!(matches!(
		h.get("a_true").unwrap().unwrap(),
		Node::Scalar(Value::Bool(true))
	));
	assert!(matches!(
		h.get("a_false").unwrap().unwrap(),
		Node::Scalar(Value::Bool(false))
	));
	match h.get("a_float").unwrap().unwrap() {
		Node::Scalar(Value::Number(n)) => assert_eq!(n, 2.5),
		other => panic!("unexpected {other:?}"),
	}
	match h.get("a_string").unwrap().unwrap() {
		Node::Scalar(Value::String(s)) => assert_eq!(s, "hello"),
		other => panic!("unexpected {other:?}"),
	}
	match h.get("a_bigint").unwrap().unwrap() {
		Node::Scalar(Value::Bigint(b)) => {
			assert_eq!(b, BigInt::from_str("123456789012345678901234").unwrap())
		}
		other => panic!("unexpected {other:?}"),
	}
	match h.get("a_timestamp").unwrap().unwrap() {
		Node::Scalar(Value::Timestamp(t)) => assert_eq!(t, ts),
		other => panic!("unexpected {other:?}"),
	}
	match h.get("a_regexp").unwrap().unwrap() {
		Node::Scalar(Value::Regex(r)) => assert_eq!(r.as_str(), "/[a-z]+/i"),
		other => panic!("unexpected {other:?}"),
	}

	let nested = match h.get("nested").unwrap().unwrap() {
		Node::Handle(h) => h,
		_ => panic!("expected an array handle"),
	};
	assert_eq!(nested.kind(), Kind::Array);
	assert_eq!(nested.length().unwrap(), 2);
	match nested.get("0").unwrap().unwrap() {
		Node::Scalar(Value::String(s)) => assert_eq!(s, "one"),
		other => panic!("unexpected {other:?}"),
	}
	let inner = match nested.get("1").unwrap().unwrap() {
		Node::Handle(h) => h,
		_ => panic!("expected a record handle"),
	};
	match inner.get("x").unwrap().unwrap() {
		Node::Scalar(Value::Number(n)) => assert_eq!(n, 1.0),
		other => panic!("unexpected {other:?}"),
	}
}

#[test]
fn truncating_an_array_via_length_deletes_the_tail() {
	let (_dir, table) = open_table("t");
	let root = table.root();

	let arr = Source::from_iter_array((0..5).map(|i| Source::from(i as f64)));
	root.set("a", arr).unwrap();
	let handle = match root.get("a").unwrap().unwrap() {
		Node::Handle(h) => h,
		_ => unreachable!(),
	};
	handle.set("length", Source::from(2.0)).unwrap();

	assert_eq!(handle.length().unwrap(), 2);
	assert!(handle.get("0").unwrap().is_some());
	assert!(handle.get("1").unwrap().is_some());
	assert!(handle.get("2").unwrap().is_none());
	assert!(handle.get("3").unwrap().is_none());
	assert!(handle.get("4").unwrap().is_none());
}

#[test]
fn self_referential_source_graph_fails_with_cycle_and_leaves_table_empty() {
	let (_dir, table) = open_table("t");
	let root = table.root();

	let record = Source::record();
	record.insert("self", record.clone());

	let err = root.set("cyclic", record).unwrap_err();
	assert!(matches!(err, pathkv::Error::Cycle { .. }));
	assert!(root.entries().unwrap().is_empty());
}

#[test]
fn overwriting_a_record_with_a_scalar_removes_the_whole_subtree() {
	let (_dir, table) = open_table("t");
	let root = table.root();

	let record = Source::record();
	record.insert("x", Source::from(1.0));
	record.insert("y", Source::from(2.0));
	root.set("k", record).unwrap();

	root.set("k", Source::from(42.0)).unwrap();

	match root.get("k").unwrap().unwrap() {
		Node::Scalar(Value::Number(n)) => assert_eq!(n, 42.0),
		other => panic!("unexpected {other:?}"),
	}
	// Only one row should remain under "k": the overwritten scalar itself.
	assert_eq!(root.entries().unwrap().len(), 1);
}

#[test]
fn deleting_length_on_an_array_is_rejected() {
	let (_dir, table) = open_table("t");
	let root = table.root();
	root.set("a", Source::array()).unwrap();
	let handle = match root.get("a").unwrap().unwrap() {
		Node::Handle(h) => h,
		_ => unreachable!(),
	};
	assert!(matches!(
		handle.delete("length"),
		Err(pathkv::Error::LengthNotDeletable)
	));
}

#[test]
fn length_on_a_non_array_handle_is_rejected() {
	let (_dir, table) = open_table("t");
	let root = table.root();
	root.set("a", Source::record()).unwrap();
	let handle = match root.get("a").unwrap().unwrap() {
		Node::Handle(h) => h,
		_ => unreachable!(),
	};
	assert!(matches!(handle.length(), Err(pathkv::Error::NotAnArray(_))));
}
