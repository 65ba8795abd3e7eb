//! This file is for small helpers & utilities that aren't exported by the library.
use crate::error::{NativeError, NativeOp};
use acl_sys::{acl_free, acl_t};
use std::ffi::CString;
use std::os::raw::c_void;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// NB! Unix-only. Paths with interior NUL bytes cannot exist on disk, report them as `ENOENT`.
pub(crate) fn path_to_cstring(path: &Path) -> Result<CString, NativeError> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| NativeError::new(NativeOp::Open, libc::ENOENT))
}

/// Owned libacl `acl_t`, freed when going out of scope.
pub(crate) struct AclHandle(acl_t);

impl AclHandle {
    /// Take ownership of `acl`, failing with `errno` of `op` if it is NULL.
    pub(crate) fn new(acl: acl_t, op: NativeOp) -> Result<AclHandle, NativeError> {
        if acl.is_null() {
            Err(NativeError::last_os_error(op))
        } else {
            Ok(AclHandle(acl))
        }
    }

    pub(crate) fn as_raw(&self) -> acl_t {
        self.0
    }

    /// For calls such as `acl_create_entry()` that may reallocate the ACL.
    pub(crate) fn as_mut_ptr(&mut self) -> *mut acl_t {
        &mut self.0
    }
}

impl Drop for AclHandle {
    fn drop(&mut self) {
        free(self.0 as *mut c_void);
    }
}

/// Safe wrapper around libacl-allocated pointers (e.g. qualifiers) to free when going out of scope.
pub(crate) struct AutoPtr<T>(pub(crate) *mut T);

impl<T> Drop for AutoPtr<T> {
    fn drop(&mut self) {
        free(self.0 as *mut c_void);
    }
}

fn free(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    let ret = unsafe { acl_free(ptr) };
    if ret != 0 {
        // Nothing sensible to do from a destructor.
        log::warn!("acl_free failed: {}", std::io::Error::last_os_error());
    }
}

/// libacl calls return 0 on success and -1 with `errno` set on failure.
pub(crate) fn check_return(ret: i32, op: NativeOp) -> Result<(), NativeError> {
    if ret == 0 {
        Ok(())
    } else {
        Err(NativeError::last_os_error(op))
    }
}

pub(crate) fn check_pointer<T: ?Sized>(ret: *const T, op: NativeOp) -> Result<(), NativeError> {
    if ret.is_null() {
        Err(NativeError::last_os_error(op))
    } else {
        Ok(())
    }
}
