//! posix-permissions maps a file's owner, group and other permissions plus its sparse POSIX ACL
//! to and from the flat, ordered entry list used by the operating system's ACL API.
//!
//! See the [`PermissionModel`] struct as a starting point, and [`PermissionProvider`] for reading
//! and writing real files.
//!
//! ```
//! use posix_permissions::{PermissionModel, Permissions, TagType};
//!
//! let mut model = PermissionModel::new(1000, 1000);
//! model.set_group_permissions(Permissions::READ | Permissions::WRITE);
//! model.set_user(2000, Permissions::READ);
//!
//! let (base, entries) = model.to_acl();
//! assert_eq!(entries.len(), 5);
//! assert_eq!(entries[4].tag_type, TagType::Mask);
//! assert_eq!(PermissionModel::from_acl(&base, &entries), model);
//! ```

mod entry;
mod error;
mod model;
mod perm;
mod provider;
mod transport;

#[cfg(feature = "native")]
mod iter;
#[cfg(feature = "native")]
mod native;
#[cfg(feature = "native")]
mod util;

pub use entry::{AclEntry, BaseRecord, TagType, QUALIFIER_UNUSED};
pub use error::{AclError, NativeError, NativeOp};
pub use model::PermissionModel;
#[cfg(feature = "native")]
pub use native::NativeTransport;
pub use perm::Permissions;
pub use provider::PermissionProvider;
pub use transport::{AclKind, Transport};
