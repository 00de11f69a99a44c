use std::io;
use std::os::raw::c_int;
use std::path::PathBuf;
use std::result;
use std::str::Utf8Error;

use lmdb_sys as ffi;
use thiserror::Error;

/// Custom result type for store operations
pub type Result<T> = result::Result<T, Error>;

/// Errors returned by this crate.
///
/// Not-found is never an error here: lookups return a null
/// [`Span`](crate::Span) and cursors report it through their state.
#[derive(Debug, Error)]
pub enum Error {
    /// The store file could not be opened or configured
    #[error("failed to open environment at {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: EngineError,
    },
    /// The environment has been closed
    #[error("environment is closed")]
    EnvClosed,
    /// The engine could not allocate a transaction
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] EngineError),
    /// A named sub-database could not be opened or created
    #[error("failed to open database {name:?}: {source}")]
    DatabaseOpen {
        name: String,
        #[source]
        source: EngineError,
    },
    /// The transaction was already committed or aborted
    #[error("transaction already committed or aborted")]
    AlreadyClosed,
    /// The engine rejected the commit; the transaction is gone either way
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] EngineError),
    /// A single-entry write failed
    #[error("write failed: {0}")]
    Write(#[from] WriteError),
    /// The engine failed to open or move a cursor
    #[error("cursor operation failed: {0}")]
    Cursor(#[source] EngineError),
    /// The cursor has run past its last entry
    #[error("cursor has no further entries")]
    Exhausted,
    /// A span viewed as a string held invalid UTF-8
    #[error("value is not valid UTF-8: {0}")]
    Utf8(#[from] Utf8Error),
    /// Any other engine failure
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Reasons a put can fail, each reportable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WriteError {
    /// Write attempted in a read-only transaction
    #[error("transaction is read-only")]
    ReadOnly,
    /// Environment map size limit reached
    #[error("environment map is full")]
    MapFull,
    /// The filesystem ran out of space
    #[error("no space left on device")]
    DiskFull,
    /// Transaction has too many dirty pages
    #[error("transaction has too many dirty pages")]
    TxnFull,
    /// Key or value size rejected by the engine
    #[error("unsupported key or value size")]
    BadSize,
    /// Anything else the engine reported
    #[error(transparent)]
    Engine(EngineError),
}

impl From<EngineError> for WriteError {
    fn from(err: EngineError) -> WriteError {
        match err {
            EngineError::MapFull => WriteError::MapFull,
            EngineError::TxnFull => WriteError::TxnFull,
            EngineError::BadValSize => WriteError::BadSize,
            EngineError::Os(libc::ENOSPC) => WriteError::DiskFull,
            EngineError::Os(libc::EACCES) => WriteError::ReadOnly,
            other => WriteError::Engine(other),
        }
    }
}

/// LMDB return codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Key/data pair already exists
    #[error("Key/data pair already exists")]
    KeyExist,
    /// No matching key/data pair found
    #[error("No matching key/data pair found")]
    NotFound,
    /// Requested page not found
    #[error("Requested page not found")]
    PageNotFound,
    /// Database file is corrupted
    #[error("Database file is corrupted")]
    Corrupted,
    /// Update of meta page failed
    #[error("Update of meta page failed")]
    Panic,
    /// Database version mismatch
    #[error("Database version mismatch")]
    VersionMismatch,
    /// File is not a valid LMDB file
    #[error("File is not a valid LMDB file")]
    Invalid,
    /// Environment mapsize limit reached
    #[error("Environment mapsize limit reached")]
    MapFull,
    /// Environment maxdbs limit reached
    #[error("Environment maxdbs limit reached")]
    DbsFull,
    /// Environment maxreaders limit reached
    #[error("Environment maxreaders limit reached")]
    ReadersFull,
    /// Thread-local storage keys full
    #[error("Thread-local storage keys full")]
    TlsFull,
    /// Transaction has too many dirty pages
    #[error("Transaction has too many dirty pages")]
    TxnFull,
    /// Too many open cursors
    #[error("Too many open cursors")]
    CursorFull,
    /// Page has not enough space
    #[error("Page has not enough space")]
    PageFull,
    /// Database contents grew beyond environment mapsize
    #[error("Database contents grew beyond environment mapsize")]
    MapResized,
    /// Operation and DB incompatible
    #[error("Operation and DB incompatible")]
    Incompatible,
    /// Invalid reuse of reader locktable slot
    #[error("Invalid reuse of reader locktable slot")]
    BadRslot,
    /// Transaction must abort, has a child, or is invalid
    #[error("Transaction must abort, has a child, or is invalid")]
    BadTxn,
    /// Unsupported size of key/DB name/data
    #[error("Unsupported size of key/DB name/data")]
    BadValSize,
    /// The specified DBI was changed unexpectedly
    #[error("The specified DBI was changed unexpectedly")]
    BadDbi,
    /// An operating system error (errno)
    #[error("{}", os_message(.0))]
    Os(c_int),
    /// Unknown error code
    #[error("Unknown error code: {0}")]
    Other(c_int),
}

fn os_message(code: &c_int) -> String {
    io::Error::from_raw_os_error(*code).to_string()
}

impl From<c_int> for EngineError {
    fn from(err: c_int) -> EngineError {
        match err {
            ffi::MDB_KEYEXIST => EngineError::KeyExist,
            ffi::MDB_NOTFOUND => EngineError::NotFound,
            ffi::MDB_PAGE_NOTFOUND => EngineError::PageNotFound,
            ffi::MDB_CORRUPTED => EngineError::Corrupted,
            ffi::MDB_PANIC => EngineError::Panic,
            ffi::MDB_VERSION_MISMATCH => EngineError::VersionMismatch,
            ffi::MDB_INVALID => EngineError::Invalid,
            ffi::MDB_MAP_FULL => EngineError::MapFull,
            ffi::MDB_DBS_FULL => EngineError::DbsFull,
            ffi::MDB_READERS_FULL => EngineError::ReadersFull,
            ffi::MDB_TLS_FULL => EngineError::TlsFull,
            ffi::MDB_TXN_FULL => EngineError::TxnFull,
            ffi::MDB_CURSOR_FULL => EngineError::CursorFull,
            ffi::MDB_PAGE_FULL => EngineError::PageFull,
            ffi::MDB_MAP_RESIZED => EngineError::MapResized,
            ffi::MDB_INCOMPATIBLE => EngineError::Incompatible,
            ffi::MDB_BAD_RSLOT => EngineError::BadRslot,
            ffi::MDB_BAD_TXN => EngineError::BadTxn,
            ffi::MDB_BAD_VALSIZE => EngineError::BadValSize,
            ffi::MDB_BAD_DBI => EngineError::BadDbi,
            err if err > 0 => EngineError::Os(err),
            err => EngineError::Other(err),
        }
    }
}

/// Helper trait for converting C error codes to Results
pub(crate) trait IntoResult {
    fn into_result(self) -> result::Result<(), EngineError>;
}

impl IntoResult for c_int {
    fn into_result(self) -> result::Result<(), EngineError> {
        if self == 0 {
            Ok(())
        } else {
            Err(EngineError::from(self))
        }
    }
}
