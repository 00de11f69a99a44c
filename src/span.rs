use std::ffi::CStr;
use std::fmt;
use std::slice;

use lmdb_sys as ffi;

use crate::error::Result;

/// Immutable view onto bytes owned by the engine.
///
/// A span borrows the transaction that produced it, so it cannot outlive a
/// commit or abort. The null span stands for "no value" and is what lookups
/// return on not-found.
///
/// The typed views (`as_cstr`, `as_str`, `as_u32`, `as_f64`) panic when the
/// span is null or has the wrong size: reinterpreting such data is a caller
/// bug, not a runtime condition.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Span<'txn> {
    data: Option<&'txn [u8]>,
}

impl<'txn> Span<'txn> {
    pub fn new(data: &'txn [u8]) -> Self {
        Span { data: Some(data) }
    }

    /// The "no value" span
    pub const fn null() -> Self {
        Span { data: None }
    }

    /// Wrap a value the engine filled in. A null data pointer yields the
    /// null span.
    ///
    /// # Safety
    ///
    /// `val` must describe memory that stays valid and unmodified for `'txn`.
    pub(crate) unsafe fn from_val(val: &ffi::MDB_val) -> Self {
        if val.mv_data.is_null() {
            Span::null()
        } else {
            Span::new(slice::from_raw_parts(
                val.mv_data as *const u8,
                val.mv_size,
            ))
        }
    }

    /// Does the span point to data, rather than being null?
    pub fn valid(&self) -> bool {
        self.data.is_some()
    }

    pub fn size(&self) -> usize {
        self.data.map_or(0, <[u8]>::len)
    }

    pub fn data(&self) -> Option<&'txn [u8]> {
        self.data
    }

    /// Bytes of the span; empty for the null span
    pub fn as_bytes(&self) -> &'txn [u8] {
        self.data.unwrap_or(&[])
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// View as a C string. The stored value must carry its NUL terminator.
    pub fn as_cstr(&self) -> &'txn CStr {
        let bytes = self.expect_valid("as_cstr");
        assert!(!bytes.is_empty(), "as_cstr on an empty span");
        match CStr::from_bytes_until_nul(bytes) {
            Ok(s) => s,
            Err(_) => panic!("as_cstr on a span with no NUL terminator"),
        }
    }

    /// View as UTF-8 text, up to the NUL terminator
    pub fn as_str(&self) -> Result<&'txn str> {
        Ok(self.as_cstr().to_str()?)
    }

    /// Copy out a native-endian `u32`; the span must be exactly 4 bytes
    pub fn as_u32(&self) -> u32 {
        u32::from_ne_bytes(self.fixed("as_u32"))
    }

    /// Copy out a native-endian `f64`; the span must be exactly 8 bytes
    pub fn as_f64(&self) -> f64 {
        f64::from_ne_bytes(self.fixed("as_f64"))
    }

    fn expect_valid(&self, what: &str) -> &'txn [u8] {
        match self.data {
            Some(bytes) => bytes,
            None => panic!("{what} on a null span"),
        }
    }

    fn fixed<const N: usize>(&self, what: &str) -> [u8; N] {
        let bytes = self.expect_valid(what);
        match <[u8; N]>::try_from(bytes) {
            Ok(arr) => arr,
            Err(_) => panic!("{what} needs {N} bytes, span holds {}", bytes.len()),
        }
    }
}

impl PartialEq<[u8]> for Span<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.data == Some(other)
    }
}

impl<const N: usize> PartialEq<[u8; N]> for Span<'_> {
    fn eq(&self, other: &[u8; N]) -> bool {
        self.data == Some(&other[..])
    }
}

impl fmt::Debug for Span<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data {
            Some(bytes) => f.debug_tuple("Span").field(&bytes).finish(),
            None => f.write_str("Span(null)"),
        }
    }
}
