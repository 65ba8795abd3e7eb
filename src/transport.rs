use crate::entry::{AclEntry, BaseRecord};
use crate::error::AclError;
use std::fmt;
use std::path::Path;

/// Which of a path's ACLs to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclKind {
    /// The ACL that governs access to the path itself.
    Access,
    /// A directory's default ACL, inherited by new files and subdirectories created in it.
    /// Only directories have one.
    Default,
}

impl fmt::Display for AclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AclKind::Access => "ACL",
            AclKind::Default => "default ACL",
        })
    }
}

/// Reads and writes a path's ownership, mode and ACL in the flat form used by
/// [`PermissionModel::from_acl()`](crate::PermissionModel::from_acl) and
/// [`PermissionModel::to_acl()`](crate::PermissionModel::to_acl).
///
/// Implementations run each call as one complete sequence: either all of it takes effect or the
/// path's ACL is left as it was.
pub trait Transport {
    /// Read the base record (owner, group and mode of the path) and the entries of the ACL of
    /// `kind`. `AclKind::Default` is only valid for directories.
    ///
    /// # Errors
    /// * `AclError::NotFound`, `AclError::AccessDenied` or `AclError::Native`.
    fn query_permissions(
        &self,
        path: &Path,
        kind: AclKind,
    ) -> Result<(BaseRecord, Vec<AclEntry>), AclError>;

    /// Apply owner, group and mode from `base` and replace the ACL of `kind` with `entries`.
    ///
    /// With `AclKind::Default` only the directory's default ACL is written; owner, group and mode
    /// of the directory itself are left alone.
    ///
    /// # Errors
    /// * `AclError::NotFound`, `AclError::AccessDenied`, `AclError::InvalidAcl` when `entries`
    ///   fail validation, or `AclError::Native`.
    fn apply_permissions(
        &self,
        path: &Path,
        kind: AclKind,
        base: &BaseRecord,
        entries: &[AclEntry],
    ) -> Result<(), AclError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn query_permissions(
        &self,
        path: &Path,
        kind: AclKind,
    ) -> Result<(BaseRecord, Vec<AclEntry>), AclError> {
        (**self).query_permissions(path, kind)
    }

    fn apply_permissions(
        &self,
        path: &Path,
        kind: AclKind,
        base: &BaseRecord,
        entries: &[AclEntry],
    ) -> Result<(), AclError> {
        (**self).apply_permissions(path, kind, base, entries)
    }
}
