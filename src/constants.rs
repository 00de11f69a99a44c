use std::os::raw::c_uint;

use bitflags::bitflags;
use lmdb_sys as ffi;

// Environment flags
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EnvFlags: c_uint {
        const NOSUBDIR = ffi::MDB_NOSUBDIR;
        const RDONLY = ffi::MDB_RDONLY;
    }
}

// Database flags
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DbFlags: c_uint {
        const INTEGERKEY = ffi::MDB_INTEGERKEY;
        const CREATE = ffi::MDB_CREATE;
    }
}

// Transaction flags
bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TransactionFlags: c_uint {
        // Reuse environment flags
        const RDONLY = EnvFlags::RDONLY.bits();
    }
}

/// Engine page size the map size is aligned to
pub const PAGE_SIZE: usize = 4096;
/// Map size used when the caller gives none (1 GiB)
pub const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;
/// Named sub-databases allowed when the caller gives no limit
pub const DEFAULT_MAX_DBS: u32 = 10;
/// Permissions for a newly created store file
pub const DEFAULT_FILE_MODE: u32 = 0o664;
/// Every environment is a single file plus its lock file
pub const DEFAULT_ENV_FLAGS: EnvFlags = EnvFlags::NOSUBDIR;
