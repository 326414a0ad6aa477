//! The table façade: ensures a table's backing schema exists and hands out
//! the root handle bound to it.

use crate::error::Error;
use crate::handle::{Handle, Kind};
use crate::path::Path;
use crate::store::{validate_table_name, Conn, Database};

/// A named table within a [`Database`]. Opening a table is cheap once its
/// schema has been created; schema creation itself runs at most once per
/// table name per process (`CREATE TABLE IF NOT EXISTS`).
#[derive(Clone)]
pub struct Table {
	conn: Conn,
	name: std::rc::Rc<str>,
}

impl Table {
	/// Ensure the backing table exists and return a handle bound to it.
	#[tracing::instrument(level = "debug", skip(db), fields(table = %name))]
	pub fn open(db: &Database, name: &str) -> Result<Table, Error> {
		validate_table_name(name)?;
		db.conn.with(|conn| {
			conn.execute(
				&format!(
					"CREATE TABLE IF NOT EXISTS \"{name}\" (\
					 path BLOB PRIMARY KEY NOT NULL, \
					 value BLOB NOT NULL\
					 ) WITHOUT ROWID"
				),
				[],
			)
		})?;
		trace!("ensured table schema");
		Ok(Table {
			conn: db.conn.clone(),
			name: std::rc::Rc::from(name),
		})
	}

	/// The root handle for this table, bound to the empty prefix.
	pub fn root(&self) -> Handle {
		Handle::new(self.conn.clone(), self.name.clone(), Path::root(), Kind::Root)
	}
}
