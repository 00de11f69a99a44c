use std::ptr::{self, NonNull};

use lmdb_sys as ffi;
use log::trace;

use crate::database::Database;
use crate::error::{EngineError, Error, IntoResult, Result};
use crate::span::Span;
use crate::transaction::Transaction;
use crate::types::CursorOp;

/// How a cursor was positioned when it was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// From the first entry
    FullScan,
    /// At exactly one key
    ExactKey,
    /// From the first key greater than or equal to a given key
    LowerBound,
}

/// Observable cursor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// On an entry; `key()` and `value()` are valid
    Positioned,
    /// An exact-key lookup found nothing
    Unmatched,
    /// Past the last entry, or nothing qualified at open
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
enum Position<'txn> {
    Positioned { key: Span<'txn>, value: Span<'txn> },
    Unmatched,
    Exhausted,
}

/// Database cursor
///
/// Bound to one database and one transaction. Spans it hands out live as
/// long as the transaction borrow, and the transaction cannot commit while
/// the cursor exists.
///
/// Opening fails with [`Error::Cursor`] when the database was opened after
/// the transaction began, since a transaction only sees databases that
/// existed at its start.
#[derive(Debug)]
pub struct Cursor<'txn> {
    /// The transaction this cursor belongs to
    txn: &'txn Transaction<'txn>,
    /// Engine cursor handle
    handle: NonNull<ffi::MDB_cursor>,
    mode: CursorMode,
    position: Position<'txn>,
    /// Did the positioning at open find an entry?
    matched: bool,
}

impl<'txn> Cursor<'txn> {
    /// Open a cursor at the first entry. An empty database gives an
    /// exhausted cursor.
    pub fn open_full_scan(db: &Database<'_>, txn: &'txn Transaction<'txn>) -> Result<Self> {
        Self::open(db, txn, CursorMode::FullScan, None, CursorOp::First)
    }

    /// Open a cursor at exactly `key`. Check [`matched`](Self::matched)
    /// before reading the key or value.
    pub fn open_at_key(db: &Database<'_>, txn: &'txn Transaction<'txn>, key: &[u8]) -> Result<Self> {
        Self::open(db, txn, CursorMode::ExactKey, Some(key), CursorOp::Set)
    }

    /// Open a cursor at the first key `>=` `key` in the database's
    /// ordering. If there is none the cursor starts exhausted.
    pub fn open_from_key(db: &Database<'_>, txn: &'txn Transaction<'txn>, key: &[u8]) -> Result<Self> {
        Self::open(db, txn, CursorMode::LowerBound, Some(key), CursorOp::SetRange)
    }

    fn open(
        db: &Database<'_>,
        txn: &'txn Transaction<'txn>,
        mode: CursorMode,
        key: Option<&[u8]>,
        op: CursorOp,
    ) -> Result<Self> {
        db.assert_env(txn.env());

        let mut raw = ptr::null_mut();
        unsafe { ffi::mdb_cursor_open(txn.raw(), db.dbi(), &mut raw) }
            .into_result()
            .map_err(Error::Cursor)?;
        let handle = NonNull::new(raw).ok_or(Error::Cursor(EngineError::Invalid))?;

        // Owned from here, so an error below still closes the handle
        let mut cursor = Cursor {
            txn,
            handle,
            mode,
            position: Position::Exhausted,
            matched: false,
        };

        match cursor.seek(key, op).map_err(Error::Cursor)? {
            Some((key, value)) => {
                cursor.position = Position::Positioned { key, value };
                cursor.matched = true;
            }
            None if mode == CursorMode::ExactKey => cursor.position = Position::Unmatched,
            None => {}
        }

        trace!("opened {:?} cursor on dbi {}: {:?}", mode, db.dbi(), cursor.state());
        Ok(cursor)
    }

    /// Move the cursor with `op`, then re-read the current entry so both
    /// spans point into engine memory rather than at the caller's key.
    fn seek(
        &self,
        key: Option<&[u8]>,
        op: CursorOp,
    ) -> std::result::Result<Option<(Span<'txn>, Span<'txn>)>, EngineError> {
        if self.get(key, op)?.is_none() {
            return Ok(None);
        }
        self.get(None, CursorOp::GetCurrent)
    }

    fn get(
        &self,
        key: Option<&[u8]>,
        op: CursorOp,
    ) -> std::result::Result<Option<(Span<'txn>, Span<'txn>)>, EngineError> {
        let mut key_val = match key {
            Some(k) => ffi::MDB_val {
                mv_size: k.len(),
                mv_data: k.as_ptr() as *mut _,
            },
            None => ffi::MDB_val {
                mv_size: 0,
                mv_data: ptr::null_mut(),
            },
        };
        let mut data_val = ffi::MDB_val {
            mv_size: 0,
            mv_data: ptr::null_mut(),
        };

        let rc = unsafe {
            ffi::mdb_cursor_get(self.handle.as_ptr(), &mut key_val, &mut data_val, op.to_raw())
        };
        match rc {
            // Engine pages stay put until the transaction ends or writes,
            // and writing needs `&mut` on the transaction this borrows.
            0 => Ok(Some(unsafe { (Span::from_val(&key_val), Span::from_val(&data_val)) })),
            ffi::MDB_NOTFOUND => Ok(None),
            rc => Err(EngineError::from(rc)),
        }
    }

    /// Move to the next entry.
    ///
    /// Running off the end leaves the cursor exhausted with null spans and
    /// returns [`Error::Exhausted`]; so does every later call.
    ///
    /// # Panics
    ///
    /// On an exact-key cursor that did not match.
    pub fn advance(&mut self) -> Result<()> {
        match self.position {
            Position::Unmatched => panic!("advance on an exact-key cursor that did not match"),
            Position::Exhausted => Err(Error::Exhausted),
            Position::Positioned { .. } => match self.seek(None, CursorOp::Next) {
                Ok(Some((key, value))) => {
                    self.position = Position::Positioned { key, value };
                    Ok(())
                }
                Ok(None) => {
                    self.position = Position::Exhausted;
                    Err(Error::Exhausted)
                }
                Err(e) => {
                    self.position = Position::Exhausted;
                    Err(Error::Cursor(e))
                }
            },
        }
    }

    /// Key at the current position; null once exhausted
    ///
    /// # Panics
    ///
    /// On an exact-key cursor that did not match.
    pub fn key(&self) -> Span<'txn> {
        match self.position {
            Position::Positioned { key, .. } => key,
            Position::Exhausted => Span::null(),
            Position::Unmatched => panic!("key() on an exact-key cursor that did not match"),
        }
    }

    /// Value at the current position; null once exhausted
    ///
    /// # Panics
    ///
    /// On an exact-key cursor that did not match.
    pub fn value(&self) -> Span<'txn> {
        match self.position {
            Position::Positioned { value, .. } => value,
            Position::Exhausted => Span::null(),
            Position::Unmatched => panic!("value() on an exact-key cursor that did not match"),
        }
    }

    /// Did an exact-key cursor find its key?
    ///
    /// # Panics
    ///
    /// On cursors not opened with [`open_at_key`](Self::open_at_key).
    pub fn matched(&self) -> bool {
        assert!(
            self.mode == CursorMode::ExactKey,
            "matched() on a {:?} cursor",
            self.mode
        );
        self.matched
    }

    /// Current key and value, or `None` when not positioned
    pub fn current(&self) -> Option<(Span<'txn>, Span<'txn>)> {
        match self.position {
            Position::Positioned { key, value } => Some((key, value)),
            Position::Unmatched | Position::Exhausted => None,
        }
    }

    pub fn state(&self) -> CursorState {
        match self.position {
            Position::Positioned { .. } => CursorState::Positioned,
            Position::Unmatched => CursorState::Unmatched,
            Position::Exhausted => CursorState::Exhausted,
        }
    }

    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    /// The transaction this cursor reads through
    pub fn txn(&self) -> &'txn Transaction<'txn> {
        self.txn
    }

    /// Iterate from the current entry to the end.
    ///
    /// An engine failure while moving is yielded once as an error and ends
    /// the iteration.
    pub fn iter(&mut self) -> Iter<'_, 'txn> {
        Iter {
            cursor: self,
            started: false,
        }
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        unsafe { ffi::mdb_cursor_close(self.handle.as_ptr()) };
    }
}

/// Iterator over `(key, value)` spans, see [`Cursor::iter`]
#[derive(Debug)]
pub struct Iter<'c, 'txn> {
    cursor: &'c mut Cursor<'txn>,
    started: bool,
}

impl<'txn> Iterator for Iter<'_, 'txn> {
    type Item = Result<(Span<'txn>, Span<'txn>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.started {
            if self.cursor.current().is_none() {
                return None;
            }
            match self.cursor.advance() {
                Ok(()) => {}
                Err(Error::Exhausted) => return None,
                // The cursor is exhausted now, so this is the last item
                Err(e) => return Some(Err(e)),
            }
        }
        self.started = true;
        self.cursor.current().map(Ok)
    }
}
