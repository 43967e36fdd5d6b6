//! Low-level bindings to libsqlite3.
//!
//! Symbols come from `libsqlite3-sys` built with its bundled amalgamation.
//! Only the subset the driver touches is re-exported, plus a few helpers
//! that turn C strings into Rust ones.

#![allow(non_camel_case_types)]

use std::ffi::{CStr, c_int};

pub use libsqlite3_sys::{
    SQLITE_AUTH, SQLITE_BLOB, SQLITE_BUSY, SQLITE_CONSTRAINT, SQLITE_DONE, SQLITE_FLOAT,
    SQLITE_INTEGER, SQLITE_INTERRUPT, SQLITE_LOCKED, SQLITE_NOTFOUND, SQLITE_NULL, SQLITE_OK,
    SQLITE_OPEN_CREATE, SQLITE_OPEN_FULLMUTEX, SQLITE_OPEN_NOMUTEX, SQLITE_OPEN_PRIVATECACHE,
    SQLITE_OPEN_READONLY, SQLITE_OPEN_READWRITE, SQLITE_OPEN_SHAREDCACHE, SQLITE_OPEN_URI,
    SQLITE_PERM, SQLITE_ROW, SQLITE_TEXT, SQLITE_TOOBIG, SQLITE_TRANSIENT, sqlite3,
    sqlite3_bind_blob, sqlite3_bind_double, sqlite3_bind_int, sqlite3_bind_int64,
    sqlite3_bind_null, sqlite3_bind_text, sqlite3_busy_timeout, sqlite3_changes,
    sqlite3_clear_bindings, sqlite3_close, sqlite3_column_blob,
    sqlite3_column_bytes, sqlite3_column_count, sqlite3_column_double, sqlite3_column_int64,
    sqlite3_column_name, sqlite3_column_text, sqlite3_column_type, sqlite3_errcode,
    sqlite3_errmsg, sqlite3_exec, sqlite3_finalize, sqlite3_free, sqlite3_open_v2,
    sqlite3_prepare_v2, sqlite3_reset, sqlite3_step, sqlite3_stmt,
};

// The prebuilt bundled bindings in libsqlite3-sys omit `sqlite3_close_v2`;
// the symbol itself is present in the bundled amalgamation.
unsafe extern "C" {
    pub fn sqlite3_close_v2(db: *mut sqlite3) -> c_int;
}

/// Library version string, e.g. "3.45.0".
pub fn version() -> &'static str {
    // SAFETY: sqlite3_libversion returns a pointer to a static string
    unsafe {
        let ptr = libsqlite3_sys::sqlite3_libversion();
        CStr::from_ptr(ptr).to_str().unwrap_or("unknown")
    }
}

/// Library version number, e.g. 3045000.
pub fn version_number() -> c_int {
    // SAFETY: no preconditions
    unsafe { libsqlite3_sys::sqlite3_libversion_number() }
}

/// English description of a result code.
pub fn error_string(code: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a pointer to a static string for any code
    unsafe {
        let ptr = libsqlite3_sys::sqlite3_errstr(code);
        if ptr.is_null() {
            format!("sqlite error {code}")
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

/// Most recent error message on a connection.
///
/// # Safety
/// `db` must be a valid, open connection handle.
pub unsafe fn last_error_message(db: *mut sqlite3) -> String {
    // SAFETY: caller guarantees db is valid
    unsafe {
        let ptr = sqlite3_errmsg(db);
        if ptr.is_null() {
            error_string(sqlite3_errcode(db))
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}
