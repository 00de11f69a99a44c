use std::ffi::CString;
use std::mem::MaybeUninit;
use std::ptr;

use lmdb_sys as ffi;
use log::{debug, warn};

use crate::constants::DbFlags;
use crate::env::Environment;
use crate::error::{EngineError, Error, IntoResult, Result};
use crate::transaction::Transaction;
use crate::types::Stat;

/// How keys in a database are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrdering {
    /// Byte-wise lexicographic order
    Lexicographic,
    /// Native-endian unsigned integers (4 or 8 bytes) in numeric order
    Integer,
}

impl KeyOrdering {
    fn flags(self) -> DbFlags {
        match self {
            KeyOrdering::Lexicographic => DbFlags::CREATE,
            KeyOrdering::Integer => DbFlags::CREATE | DbFlags::INTEGERKEY,
        }
    }

    fn from_flags(flags: DbFlags) -> Self {
        if flags.contains(DbFlags::INTEGERKEY) {
            KeyOrdering::Integer
        } else {
            KeyOrdering::Lexicographic
        }
    }
}

/// Handle to a named sub-database within an [`Environment`].
///
/// The ordering is fixed when the sub-database is first created. Handles
/// are cheap to copy and may be used by any number of transactions.
#[derive(Debug, Clone, Copy)]
pub struct Database<'env> {
    env: &'env Environment,
    /// Database identifier
    dbi: ffi::MDB_dbi,
    ordering: KeyOrdering,
}

impl<'env> Database<'env> {
    /// Open or create a byte-ordered database
    pub fn open(env: &'env Environment, name: &str) -> Result<Self> {
        Self::open_with_ordering(env, name, KeyOrdering::Lexicographic)
    }

    /// Open or create an integer-keyed database
    pub fn open_intkeys(env: &'env Environment, name: &str) -> Result<Self> {
        Self::open_with_ordering(env, name, KeyOrdering::Integer)
    }

    /// Open or create a database with the given key ordering.
    ///
    /// Opening a sub-database changes environment metadata, so this runs
    /// in its own write transaction that is committed before returning.
    /// On failure that transaction is aborted.
    ///
    /// Reopening an existing name with a different ordering fails with
    /// [`Error::DatabaseOpen`] carrying [`EngineError::Incompatible`].
    pub fn open_with_ordering(env: &'env Environment, name: &str, ordering: KeyOrdering) -> Result<Self> {
        let open_err = |source: EngineError| Error::DatabaseOpen {
            name: name.to_owned(),
            source,
        };
        let c_name = CString::new(name).map_err(|_| open_err(EngineError::Os(libc::EINVAL)))?;

        let mut txn = Transaction::begin_readwrite(env)?;
        let mut dbi: ffi::MDB_dbi = 0;
        unsafe { ffi::mdb_dbi_open(txn.raw(), c_name.as_ptr(), ordering.flags().bits(), &mut dbi) }
            .into_result()
            .map_err(open_err)?;

        // An existing sub-database keeps the ordering it was created with
        let mut stored = 0;
        unsafe { ffi::mdb_dbi_flags(txn.raw(), dbi, &mut stored) }
            .into_result()
            .map_err(open_err)?;
        let actual = KeyOrdering::from_flags(DbFlags::from_bits_truncate(stored));
        if actual != ordering {
            warn!("database {:?} is keyed {:?}, requested {:?}", name, actual, ordering);
            return Err(open_err(EngineError::Incompatible));
        }
        txn.commit()?;

        debug!("opened database {:?} (dbi={}, {:?})", name, dbi, ordering);
        Ok(Database { env, dbi, ordering })
    }

    pub fn ordering(&self) -> KeyOrdering {
        self.ordering
    }

    /// Were keys opened with integer ordering?
    pub fn is_intkeys(&self) -> bool {
        self.ordering == KeyOrdering::Integer
    }

    /// Engine database identifier
    pub fn dbi(&self) -> ffi::MDB_dbi {
        self.dbi
    }

    /// Get database statistics as seen by `txn`
    pub fn stat(&self, txn: &Transaction<'_>) -> Result<Stat> {
        self.assert_env(txn.env());
        let mut stat = MaybeUninit::<ffi::MDB_stat>::uninit();
        unsafe { ffi::mdb_stat(txn.raw(), self.dbi, stat.as_mut_ptr()) }.into_result()?;
        Ok(Stat::from(unsafe { stat.assume_init() }))
    }

    /// Panics when the handle is used with another environment's transaction
    pub(crate) fn assert_env(&self, env: &Environment) {
        assert!(
            ptr::eq(self.env, env),
            "database handle used with a transaction from another environment"
        );
    }
}
