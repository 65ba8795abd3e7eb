use std::fmt;
use std::io::{self, ErrorKind};
use thiserror::Error;

/// Native step that failed. Used in error messages and to classify the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOp {
    Open,
    Fstat,
    GetAcl,
    GetEntry,
    GetTagType,
    GetQualifier,
    GetPermset,
    Chown,
    Chmod,
    InitAcl,
    CreateEntry,
    /// Tag type outside the six POSIX kinds, either read from or written to the ACL.
    InvalidTagType,
    SetTagType,
    SetQualifier,
    ClearPerms,
    AddPerm,
    ValidateAcl,
    SetAcl,
}

impl NativeOp {
    /// Name of the underlying C call.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            NativeOp::Open => "open",
            NativeOp::Fstat => "fstat",
            NativeOp::GetAcl => "acl_get",
            NativeOp::GetEntry => "acl_get_entry",
            NativeOp::GetTagType => "acl_get_tag_type",
            NativeOp::GetQualifier => "acl_get_qualifier",
            NativeOp::GetPermset => "acl_get_permset",
            NativeOp::Chown => "fchown",
            NativeOp::Chmod => "fchmod",
            NativeOp::InitAcl => "acl_init",
            NativeOp::CreateEntry => "acl_create_entry",
            NativeOp::InvalidTagType => "tag type",
            NativeOp::SetTagType => "acl_set_tag_type",
            NativeOp::SetQualifier => "acl_set_qualifier",
            NativeOp::ClearPerms => "acl_clear_perms",
            NativeOp::AddPerm => "acl_add_perm",
            NativeOp::ValidateAcl => "acl_valid",
            NativeOp::SetAcl => "acl_set",
        }
    }
}

impl fmt::Display for NativeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed native call: which step, the OS error code and its `strerror` text.
#[derive(Debug, Error)]
#[error("{op} failed: {message} (os error {errno})")]
pub struct NativeError {
    pub op: NativeOp,
    pub errno: i32,
    pub message: String,
}

#[cfg_attr(not(feature = "native"), allow(dead_code))]
impl NativeError {
    /// Capture `errno` right after the failing call.
    pub(crate) fn last_os_error(op: NativeOp) -> NativeError {
        Self::from_io(op, &io::Error::last_os_error())
    }

    pub(crate) fn from_io(op: NativeOp, err: &io::Error) -> NativeError {
        NativeError::new(op, err.raw_os_error().unwrap_or(0))
    }

    /// Build from a raw errno, resolving its message the way `strerror` does.
    #[must_use]
    pub fn new(op: NativeOp, errno: i32) -> NativeError {
        let message = if errno == 0 {
            String::new()
        } else {
            // io::Error's Display appends " (os error N)", which we add ourselves.
            let text = io::Error::from_raw_os_error(errno).to_string();
            match text.rfind(" (os error") {
                Some(pos) => text[..pos].to_string(),
                None => text,
            }
        };
        NativeError { op, errno, message }
    }
}

/// Error type from permission and ACL operations.
#[derive(Debug, Error)]
pub enum AclError {
    /// Path or a path component does not exist.
    #[error("not found: {0}")]
    NotFound(#[source] NativeError),
    /// Insufficient privilege to open, change owner, change mode or assign the ACL.
    #[error("access denied: {0}")]
    AccessDenied(#[source] NativeError),
    /// The assembled ACL was rejected by the platform's validation.
    /// Unfortunately it is not possible to provide detailed reasons.
    #[error("ACL failed validation: {0}")]
    InvalidAcl(#[source] NativeError),
    /// Caller violated an API contract, e.g. tried to remove the owner's entry.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Any other native failure.
    #[error(transparent)]
    Native(NativeError),
}

impl From<NativeError> for AclError {
    /// Sort a native failure into the specific kinds callers can act upon.
    fn from(err: NativeError) -> AclError {
        match (err.op, err.errno) {
            (NativeOp::ValidateAcl, _) => AclError::InvalidAcl(err),
            (NativeOp::SetAcl, libc::EINVAL) => AclError::InvalidAcl(err),
            (_, libc::ENOENT) | (_, libc::ENOTDIR) => AclError::NotFound(err),
            (_, libc::EACCES) | (_, libc::EPERM) => AclError::AccessDenied(err),
            _ => AclError::Native(err),
        }
    }
}

impl AclError {
    /// Get a general category of error. `InvalidAcl` gets returned as `InvalidData`.
    ///
    /// ```
    /// use posix_permissions::{AclError, NativeError, NativeOp};
    /// use std::io::ErrorKind;
    /// let err = AclError::from(NativeError::new(NativeOp::Open, libc::ENOENT));
    /// assert_eq!(err.kind(), ErrorKind::NotFound);
    /// ```
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AclError::NotFound(_) => ErrorKind::NotFound,
            AclError::AccessDenied(_) => ErrorKind::PermissionDenied,
            AclError::InvalidAcl(_) => ErrorKind::InvalidData,
            AclError::InvalidArgument(_) => ErrorKind::InvalidInput,
            AclError::Native(_) => ErrorKind::Other,
        }
    }

    /// The native failure behind this error, if any.
    #[must_use]
    pub fn native(&self) -> Option<&NativeError> {
        match self {
            AclError::NotFound(err)
            | AclError::AccessDenied(err)
            | AclError::InvalidAcl(err)
            | AclError::Native(err) => Some(err),
            AclError::InvalidArgument(_) => None,
        }
    }
}
