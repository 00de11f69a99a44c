use std::os::raw::c_uint;

use lmdb_sys as ffi;

/// Cursor positioning operations used by [`Cursor`](crate::Cursor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CursorOp {
    First,
    GetCurrent,
    Next,
    Set,
    SetRange,
}

impl CursorOp {
    pub(crate) fn to_raw(self) -> c_uint {
        match self {
            CursorOp::First => ffi::MDB_FIRST,
            CursorOp::GetCurrent => ffi::MDB_GET_CURRENT,
            CursorOp::Next => ffi::MDB_NEXT,
            CursorOp::Set => ffi::MDB_SET,
            CursorOp::SetRange => ffi::MDB_SET_RANGE,
        }
    }
}

/// B-tree statistics for an environment or a single database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub psize: u32,
    pub depth: u32,
    pub branch_pages: usize,
    pub leaf_pages: usize,
    pub overflow_pages: usize,
    pub entries: usize,
}

impl From<ffi::MDB_stat> for Stat {
    fn from(stat: ffi::MDB_stat) -> Stat {
        Stat {
            psize: stat.ms_psize,
            depth: stat.ms_depth,
            branch_pages: stat.ms_branch_pages,
            leaf_pages: stat.ms_leaf_pages,
            overflow_pages: stat.ms_overflow_pages,
            entries: stat.ms_entries,
        }
    }
}

/// Environment information reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvInfo {
    pub mapsize: usize,
    pub last_pgno: usize,
    pub last_txnid: usize,
    pub max_readers: u32,
    pub num_readers: u32,
}

impl From<ffi::MDB_envinfo> for EnvInfo {
    fn from(info: ffi::MDB_envinfo) -> EnvInfo {
        EnvInfo {
            mapsize: info.me_mapsize,
            last_pgno: info.me_last_pgno,
            last_txnid: info.me_last_txnid,
            max_readers: info.me_maxreaders,
            num_readers: info.me_numreaders,
        }
    }
}
