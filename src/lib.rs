//! Lifetime-safe handles over an LMDB store.
//!
//! An [`Environment`] owns one store file. [`Database`] handles name its
//! sub-databases, a [`Transaction`] reads or writes them, and a [`Cursor`]
//! walks one in key order. Lookups return [`Span`]s: zero-copy views into
//! engine memory that borrow their transaction, so the compiler rejects any
//! use after commit or abort.
//!
//! ```no_run
//! use lmdbspan::{Cursor, Database, Environment};
//!
//! # fn main() -> lmdbspan::Result<()> {
//! let env = Environment::open("/tmp/pets.mdb")?;
//! let db = Database::open(&env, "pets")?;
//!
//! let mut txn = env.begin_rw_txn()?;
//! txn.put_str_str(&db, "cat", "felix")?;
//! txn.commit()?;
//!
//! let txn = env.begin_ro_txn()?;
//! assert_eq!(txn.get_str(&db, "cat").as_str()?, "felix");
//!
//! let mut cur = Cursor::open_full_scan(&db, &txn)?;
//! for entry in cur.iter() {
//!     let (key, value) = entry?;
//!     println!("{} => {}", key.as_str()?, value.as_str()?);
//! }
//! # Ok(())
//! # }
//! ```
mod config;
mod constants;
mod cursor;
mod database;
mod env;
mod error;
mod span;
mod transaction;
mod types;

pub use config::EnvConfig;
pub use constants::{DbFlags, EnvFlags, TransactionFlags, DEFAULT_MAP_SIZE, DEFAULT_MAX_DBS, PAGE_SIZE};
pub use cursor::{Cursor, CursorMode, CursorState, Iter};
pub use database::{Database, KeyOrdering};
pub use env::Environment;
pub use error::{EngineError, Error, Result, WriteError};
pub use span::Span;
pub use transaction::Transaction;
pub use types::{EnvInfo, Stat};
