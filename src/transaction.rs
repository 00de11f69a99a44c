use std::ptr::{self, NonNull};

use lmdb_sys as ffi;
use log::{debug, warn};

use crate::constants::TransactionFlags;
use crate::database::Database;
use crate::env::Environment;
use crate::error::{EngineError, Error, IntoResult, Result, WriteError};
use crate::span::Span;

/// Database transaction
///
/// The engine handle is consumed exactly once, by [`commit`](Self::commit)
/// or by an abort. Dropping an open transaction aborts it, so writes are
/// never kept unless committed.
///
/// Spans and cursors borrow the transaction, and `commit` and `put` take
/// `&mut self`, so nothing read from the engine can be used after the
/// transaction ends or after a write that may move it.
#[derive(Debug)]
pub struct Transaction<'env> {
    /// Reference to environment
    env: &'env Environment,
    /// Engine handle, `None` once committed or aborted
    handle: Option<NonNull<ffi::MDB_txn>>,
    /// Transaction flags
    flags: TransactionFlags,
}

impl<'env> Transaction<'env> {
    /// Begin a read-only snapshot transaction
    pub fn begin_readonly(env: &'env Environment) -> Result<Self> {
        Self::begin(env, TransactionFlags::RDONLY)
    }

    /// Begin a read-write transaction. Blocks while another thread holds
    /// the write transaction.
    pub fn begin_readwrite(env: &'env Environment) -> Result<Self> {
        Self::begin(env, TransactionFlags::empty())
    }

    fn begin(env: &'env Environment, flags: TransactionFlags) -> Result<Self> {
        let env_handle = env.raw()?;
        let read_only = flags.contains(TransactionFlags::RDONLY);
        if !read_only {
            env.check_writer()?;
        }

        let mut raw = ptr::null_mut();
        unsafe { ffi::mdb_txn_begin(env_handle.as_ptr(), ptr::null_mut(), flags.bits(), &mut raw) }
            .into_result()
            .map_err(Error::Begin)?;
        let handle = NonNull::new(raw).ok_or(Error::Begin(EngineError::BadTxn))?;

        if !read_only {
            env.set_writer();
        }
        Ok(Transaction {
            env,
            handle: Some(handle),
            flags,
        })
    }

    /// Commit the transaction.
    ///
    /// The handle is consumed even when the engine reports a failure, so a
    /// second call always returns [`Error::AlreadyClosed`].
    pub fn commit(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(Error::AlreadyClosed)?;
        let rc = unsafe { ffi::mdb_txn_commit(handle.as_ptr()) };
        self.release_writer();

        match rc.into_result() {
            Ok(()) => {
                debug!("committed transaction");
                Ok(())
            }
            Err(e) => {
                warn!("transaction commit failed: {}", e);
                Err(Error::Commit(e))
            }
        }
    }

    /// Abort the transaction, discarding its writes
    pub fn abort(mut self) {
        self.abort_inner();
    }

    fn abort_inner(&mut self) {
        if let Some(handle) = self.handle.take() {
            unsafe { ffi::mdb_txn_abort(handle.as_ptr()) };
            self.release_writer();
            debug!("aborted transaction");
        }
    }

    fn release_writer(&self) {
        if !self.is_readonly() {
            self.env.clear_writer();
        }
    }

    /// Get reference to environment
    pub fn env(&self) -> &'env Environment {
        self.env
    }

    pub fn is_readonly(&self) -> bool {
        self.flags.contains(TransactionFlags::RDONLY)
    }

    /// Has the transaction been committed or aborted?
    pub fn is_finished(&self) -> bool {
        self.handle.is_none()
    }

    /// Look up `key`. Returns the null span when the key is absent.
    ///
    /// # Panics
    ///
    /// On a finished transaction, a database from another environment, or
    /// any engine failure other than not-found (bad handle, bad key size).
    /// A database opened after this transaction began counts as a bad
    /// handle: the transaction only sees databases that existed at its
    /// start.
    pub fn get(&self, db: &Database<'_>, key: &[u8]) -> Span<'_> {
        db.assert_env(self.env);

        let mut key_val = ffi::MDB_val {
            mv_size: key.len(),
            mv_data: key.as_ptr() as *mut _,
        };
        let mut data_val = ffi::MDB_val {
            mv_size: 0,
            mv_data: ptr::null_mut(),
        };

        let rc = unsafe { ffi::mdb_get(self.raw(), db.dbi(), &mut key_val, &mut data_val) };
        match rc {
            0 => unsafe { Span::from_val(&data_val) },
            ffi::MDB_NOTFOUND => Span::null(),
            rc => panic!("engine lookup failed: {}", EngineError::from(rc)),
        }
    }

    /// Look up a string key stored with its NUL terminator
    pub fn get_str(&self, db: &Database<'_>, key: &str) -> Span<'_> {
        self.get(db, &nul_terminated(key))
    }

    /// Look up a native-endian `u32` key
    pub fn get_u32(&self, db: &Database<'_>, key: u32) -> Span<'_> {
        self.get(db, &key.to_ne_bytes())
    }

    /// Insert or overwrite a single entry
    pub fn put(&mut self, db: &Database<'_>, key: &[u8], value: &[u8]) -> Result<()> {
        let handle = self.handle.ok_or(Error::AlreadyClosed)?;
        if self.is_readonly() {
            return Err(WriteError::ReadOnly.into());
        }
        db.assert_env(self.env);

        let mut key_val = ffi::MDB_val {
            mv_size: key.len(),
            mv_data: key.as_ptr() as *mut _,
        };
        let mut data_val = ffi::MDB_val {
            mv_size: value.len(),
            mv_data: value.as_ptr() as *mut _,
        };

        unsafe { ffi::mdb_put(handle.as_ptr(), db.dbi(), &mut key_val, &mut data_val, 0) }
            .into_result()
            .map_err(|e| Error::Write(WriteError::from(e)))
    }

    /// Insert with a string key stored with its NUL terminator
    pub fn put_str(&mut self, db: &Database<'_>, key: &str, value: &[u8]) -> Result<()> {
        self.put(db, &nul_terminated(key), value)
    }

    /// Insert a string key and string value, both NUL-terminated
    pub fn put_str_str(&mut self, db: &Database<'_>, key: &str, value: &str) -> Result<()> {
        self.put(db, &nul_terminated(key), &nul_terminated(value))
    }

    /// Insert with a native-endian `u32` key
    pub fn put_u32(&mut self, db: &Database<'_>, key: u32, value: &[u8]) -> Result<()> {
        self.put(db, &key.to_ne_bytes(), value)
    }

    /// Engine handle of a live transaction
    ///
    /// # Panics
    ///
    /// If the transaction was already committed or aborted.
    pub(crate) fn raw(&self) -> *mut ffi::MDB_txn {
        match self.handle {
            Some(handle) => handle.as_ptr(),
            None => panic!("transaction used after commit or abort"),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.abort_inner();
    }
}

fn nul_terminated(s: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(s.len() + 1);
    bytes.extend_from_slice(s.as_bytes());
    bytes.push(0);
    bytes
}
