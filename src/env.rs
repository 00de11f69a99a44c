use std::ffi::CString;
use std::mem::MaybeUninit;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};

use lmdb_sys as ffi;
use log::{debug, warn};

use crate::config::EnvConfig;
use crate::constants::{DEFAULT_ENV_FLAGS, DEFAULT_FILE_MODE};
use crate::error::{EngineError, Error, IntoResult, Result};
use crate::transaction::Transaction;
use crate::types::{EnvInfo, Stat};

/// An open LMDB environment: one store file and its lock file.
///
/// Transactions and databases borrow the environment, so it cannot be
/// closed or dropped while any of them is alive.
#[derive(Debug)]
pub struct Environment {
    /// Engine handle, `None` once closed
    handle: Option<NonNull<ffi::MDB_env>>,
    /// Path of the store file
    path: PathBuf,
    /// Limits the environment was opened with (map size page-aligned)
    config: EnvConfig,
    /// Thread holding the write transaction, if any
    writer: Mutex<Option<ThreadId>>,
}

// The engine environment is safe to share between threads; transactions
// stay on the thread that began them.
unsafe impl Send for Environment {}
unsafe impl Sync for Environment {}

impl Environment {
    /// Open or create the store file at `path` with the default limits
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, EnvConfig::default())
    }

    /// Open or create the store file at `path` with explicit limits
    pub fn open_with_limits<P: AsRef<Path>>(path: P, map_size: usize, max_dbs: u32) -> Result<Self> {
        Self::open_with_config(path, EnvConfig::new(map_size, max_dbs))
    }

    /// Open or create the store file at `path`.
    ///
    /// The file is opened without a subdirectory and created with mode
    /// `0o664`. The map size is rounded down to a page boundary; a request
    /// below one page is rejected.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: EnvConfig) -> Result<Self> {
        let path = path.as_ref();
        let open_err = |source: EngineError| Error::Open {
            path: path.to_path_buf(),
            source,
        };

        let map_size = config
            .page_aligned_map_size()
            .ok_or_else(|| open_err(EngineError::Os(libc::EINVAL)))?;
        if map_size != config.map_size {
            warn!(
                "map size for {} rounded down from {} to {} bytes",
                path.display(),
                config.map_size,
                map_size
            );
        }

        let c_path = path_to_cstring(path).ok_or_else(|| open_err(EngineError::Os(libc::EINVAL)))?;

        let mut raw = ptr::null_mut();
        unsafe { ffi::mdb_env_create(&mut raw) }
            .into_result()
            .map_err(open_err)?;
        let handle = NonNull::new(raw).ok_or_else(|| open_err(EngineError::Os(libc::ENOMEM)))?;

        // From here on a failed step closes the handle when `env` drops
        let env = Environment {
            handle: Some(handle),
            path: path.to_path_buf(),
            config: config.with_map_size(map_size),
            writer: Mutex::new(None),
        };

        unsafe { ffi::mdb_env_set_mapsize(handle.as_ptr(), map_size) }
            .into_result()
            .map_err(open_err)?;
        unsafe { ffi::mdb_env_set_maxdbs(handle.as_ptr(), config.max_dbs) }
            .into_result()
            .map_err(open_err)?;
        unsafe {
            ffi::mdb_env_open(
                handle.as_ptr(),
                c_path.as_ptr(),
                DEFAULT_ENV_FLAGS.bits(),
                DEFAULT_FILE_MODE as ffi::mode_t,
            )
        }
        .into_result()
        .map_err(open_err)?;

        debug!(
            "opened environment {} (map_size={}, max_dbs={})",
            path.display(),
            map_size,
            config.max_dbs
        );
        Ok(env)
    }

    /// Close the environment and release the engine handle.
    ///
    /// Calling this again is a no-op. Anything that borrows the environment
    /// must be gone first, which the borrow checker enforces.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            unsafe { ffi::mdb_env_close(handle.as_ptr()) };
            debug!("closed environment {}", self.path.display());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Begin a new read-only transaction
    pub fn begin_ro_txn(&self) -> Result<Transaction<'_>> {
        Transaction::begin_readonly(self)
    }

    /// Begin a new read-write transaction
    pub fn begin_rw_txn(&self) -> Result<Transaction<'_>> {
        Transaction::begin_readwrite(self)
    }

    /// Flush the data buffers to disk
    ///
    /// Data is always written to disk when transactions commit, but the operating system
    /// may keep it buffered. If force is true, the sync will be synchronous (immediate).
    pub fn sync(&self, force: bool) -> Result<()> {
        let handle = self.raw()?;
        unsafe { ffi::mdb_env_sync(handle.as_ptr(), c_int::from(force)) }.into_result()?;
        Ok(())
    }

    /// Get environment statistics
    pub fn stat(&self) -> Result<Stat> {
        let handle = self.raw()?;
        let mut stat = MaybeUninit::<ffi::MDB_stat>::uninit();
        unsafe { ffi::mdb_env_stat(handle.as_ptr(), stat.as_mut_ptr()) }.into_result()?;
        Ok(Stat::from(unsafe { stat.assume_init() }))
    }

    /// Get environment information
    pub fn info(&self) -> Result<EnvInfo> {
        let handle = self.raw()?;
        let mut info = MaybeUninit::<ffi::MDB_envinfo>::uninit();
        unsafe { ffi::mdb_env_info(handle.as_ptr(), info.as_mut_ptr()) }.into_result()?;
        Ok(EnvInfo::from(unsafe { info.assume_init() }))
    }

    pub(crate) fn raw(&self) -> Result<NonNull<ffi::MDB_env>> {
        self.handle.ok_or(Error::EnvClosed)
    }

    /// Claim the writer slot for the calling thread.
    ///
    /// The engine serializes writers across threads by blocking; a second
    /// write transaction on the same thread would block forever, so that
    /// case fails here instead.
    pub(crate) fn check_writer(&self) -> Result<()> {
        let writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if *writer == Some(thread::current().id()) {
            return Err(Error::Begin(EngineError::Os(libc::EDEADLK)));
        }
        Ok(())
    }

    pub(crate) fn set_writer(&self) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        *writer = Some(thread::current().id());
    }

    /// Release the writer slot if the calling thread holds it
    pub(crate) fn clear_writer(&self) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if *writer == Some(thread::current().id()) {
            *writer = None;
        }
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        self.close();
    }
}

/// Engine path for `path`; `None` when it holds a NUL byte or, off Unix,
/// is not valid UTF-8
#[cfg(unix)]
fn path_to_cstring(path: &Path) -> Option<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes()).ok()
}

#[cfg(not(unix))]
fn path_to_cstring(path: &Path) -> Option<CString> {
    path.to_str().and_then(|s| CString::new(s).ok())
}
