use crate::error::AclError;
use crate::model::PermissionModel;
use crate::transport::{AclKind, Transport};
use std::path::Path;

/// Loads and stores [`PermissionModel`]s of files and directories through a [`Transport`].
#[cfg_attr(
    feature = "native",
    doc = r#"
```no_run
use posix_permissions::{AclKind, PermissionProvider, Permissions};
let provider = PermissionProvider::native();
let mut model = provider.read("/srv/shared", AclKind::Access).unwrap();
model.set_group(2000, Permissions::READ | Permissions::EXECUTE);
provider.write("/srv/shared", AclKind::Access, &model).unwrap();
```"#
)]
#[derive(Debug, Clone, Default)]
pub struct PermissionProvider<T> {
    transport: T,
}

#[cfg(feature = "native")]
impl PermissionProvider<crate::NativeTransport> {
    /// Provider operating on the real file system.
    #[must_use]
    pub fn native() -> Self {
        Self::new(crate::NativeTransport)
    }
}

impl<T: Transport> PermissionProvider<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        PermissionProvider { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Read the permissions of `path`. `AclKind::Default` reads a directory's default ACL; owner,
    /// group and other then still come from the directory's own mode.
    ///
    /// # Errors
    /// Transport errors, unmodified.
    pub fn read<P: AsRef<Path>>(
        &self,
        path: P,
        kind: AclKind,
    ) -> Result<PermissionModel, AclError> {
        let (base, entries) = self.transport.query_permissions(path.as_ref(), kind)?;
        Ok(PermissionModel::from_acl(&base, &entries))
    }

    /// Write `model` to `path`, replacing the ACL of `kind`. With `AclKind::Default` owner, group
    /// and mode of the directory are not touched.
    ///
    /// # Errors
    /// Transport errors, unmodified.
    pub fn write<P: AsRef<Path>>(
        &self,
        path: P,
        kind: AclKind,
        model: &PermissionModel,
    ) -> Result<(), AclError> {
        let (base, entries) = model.to_acl();
        self.transport
            .apply_permissions(path.as_ref(), kind, &base, &entries)
    }
}
