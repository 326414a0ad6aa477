//! The backing-store adapter: opening the SQLite file, configuring
//! journaling, and owning the connection for the lifetime of the database
//! handle.

use std::cell::RefCell;
use std::path::Path as FsPath;
use std::rc::Rc;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::Error;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// What to do if a transaction guard is dropped without being marked done:
/// a programming error inside this crate, never something a caller can
/// trigger. Panicking in debug builds surfaces the bug immediately during
/// development; warning in release builds avoids taking down a caller's
/// process for what is, by then, just a leaked lock.
enum Check {
	Warn,
	Panic,
}

/// Tracks whether a `BEGIN IMMEDIATE` opened by [`Conn::transact`] has been
/// closed out with `COMMIT` or `ROLLBACK`. Every exit path from `transact`
/// must call `mark_done` before returning; if one doesn't, `Drop` catches
/// the open transaction instead of silently leaving the connection mid-write.
struct TxnGuard {
	done: bool,
	check: Check,
}

impl TxnGuard {
	fn new() -> TxnGuard {
		#[cfg(debug_assertions)]
		let check = Check::Panic;
		#[cfg(not(debug_assertions))]
		let check = Check::Warn;
		TxnGuard {
			done: false,
			check,
		}
	}

	fn mark_done(&mut self) {
		self.done = true;
	}
}

impl Drop for TxnGuard {
	fn drop(&mut self) {
		if self.done || std::thread::panicking() {
			return;
		}
		match self.check {
			Check::Warn => {
				warn!("a transaction was dropped without being committed or rolled back");
			}
			Check::Panic => {
				panic!("a transaction was dropped without being committed or rolled back");
			}
		}
	}
}

/// A shared, closeable handle on the backing SQLite connection. Every
/// [`crate::Table`]/[`crate::Handle`] derived from a [`Database`] holds a
/// clone of this, not the `Database` itself, so that closing the database
/// is visible to every handle without requiring them to be dropped first.
#[derive(Clone)]
pub(crate) struct Conn(Rc<RefCell<Option<Connection>>>);

impl Conn {
	pub(crate) fn with<T>(
		&self,
		f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
	) -> Result<T, Error> {
		let guard = self.0.borrow();
		let conn = guard.as_ref().ok_or(Error::Closed)?;
		f(conn).map_err(Error::Backend)
	}

	fn close(&self) -> Result<(), Error> {
		match self.0.borrow_mut().take() {
			Some(conn) => conn.close().map_err(|(_, e)| Error::Backend(e)),
			None => Ok(()),
		}
	}

	/// Run `f` inside a single SQLite transaction: `BEGIN IMMEDIATE`, then
	/// `f`, then `COMMIT` on success or `ROLLBACK` on the first error. This
	/// is the only place a transaction is opened — recursive composite
	/// writes call back into `f`'s own recursion, not into `transact`
	/// again, so exactly one transaction covers a whole top-level write.
	/// A [`TxnGuard`] backstops this: if some future change to this
	/// function returned without reaching `COMMIT`/`ROLLBACK`, dropping the
	/// guard unmarked catches it instead of leaving the connection mid-write.
	pub(crate) fn transact<T>(
		&self,
		f: impl FnOnce(&Connection) -> Result<T, Error>,
	) -> Result<T, Error> {
		let borrowed = self.0.borrow();
		let conn = borrowed.as_ref().ok_or(Error::Closed)?;
		conn.execute_batch("BEGIN IMMEDIATE").map_err(Error::Backend)?;
		let mut guard = TxnGuard::new();
		match f(conn) {
			Ok(value) => {
				conn.execute_batch("COMMIT").map_err(Error::Backend)?;
				guard.mark_done();
				Ok(value)
			}
			Err(e) => {
				if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
					warn!("rollback after failed write also failed: {rollback_err}");
				}
				guard.mark_done();
				Err(e)
			}
		}
	}
}

/// Options accepted by [`Database::open`]. The only recognized option is
/// `path`; there are no environment variables and no runtime flags.
#[derive(Clone, Debug)]
pub struct OpenOptions {
	pub path: std::path::PathBuf,
}

impl OpenOptions {
	pub fn new(path: impl Into<std::path::PathBuf>) -> OpenOptions {
		OpenOptions { path: path.into() }
	}
}

/// An open database file. Owns the OS file resource for its lifetime;
/// [`Database::close`] releases it and every [`crate::Table`]/[`crate::Handle`]
/// derived from this database starts failing its operations with
/// [`Error::Closed`] instead of panicking.
#[non_exhaustive]
pub struct Database {
	pub(crate) conn: Conn,
}

impl Database {
	/// Open (creating if absent) the SQLite file at `options.path`. A
	/// relative path resolves against the process working directory.
	/// Sets `journal_mode = WAL` and `synchronous = NORMAL` once per
	/// connection, before any per-table DDL runs.
	#[tracing::instrument(level = "debug", skip(options), fields(path = %options.path.display()))]
	pub fn open(options: OpenOptions) -> Result<Database, Error> {
		let conn = open_connection(&options.path)?;
		debug!("opened database");
		Ok(Database {
			conn: Conn(Rc::new(RefCell::new(Some(conn)))),
		})
	}

	/// Release the OS file resource. Derived tables/handles remain valid
	/// Rust values but every operation on them now fails with
	/// [`Error::Closed`].
	#[tracing::instrument(level = "debug", skip(self))]
	pub fn close(&self) -> Result<(), Error> {
		self.conn.close()?;
		debug!("closed database");
		Ok(())
	}
}

fn open_connection(path: &FsPath) -> Result<Connection, Error> {
	let conn = Connection::open(path).map_err(Error::Backend)?;
	conn.busy_timeout(BUSY_TIMEOUT).map_err(Error::Backend)?;
	conn.pragma_update(None, "journal_mode", "WAL")
		.map_err(Error::Backend)?;
	conn.pragma_update(None, "synchronous", "NORMAL")
		.map_err(Error::Backend)?;
	Ok(conn)
}

/// A table name must be a safe SQL identifier once double-quoted: the core
/// does not otherwise sanitize embedded quote characters before
/// interpolating the name into DDL, so a name containing `"` is rejected
/// up front rather than silently passed through.
pub(crate) fn validate_table_name(name: &str) -> Result<(), Error> {
	if name.is_empty() {
		return Err(Error::unsupported("table name must not be empty"));
	}
	if name.contains('"') {
		return Err(Error::unsupported(format!(
			"table name {name:?} contains a double quote"
		)));
	}
	Ok(())
}
