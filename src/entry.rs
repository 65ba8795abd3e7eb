use crate::Permissions;
use std::fmt;
use std::mem::size_of;

use static_assertions::const_assert_eq;

/// Qualifier written for entries that do not name a user or group.
pub const QUALIFIER_UNUSED: i32 = -1;

/// Category of an ACL entry. Discriminants are the values exchanged with the native layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TagType {
    /// Permissions for owner of the file
    UserObj = 1,
    /// Permissions for the user given by the qualifier
    User = 2,
    /// Permissions for owning group of the file
    GroupObj = 3,
    /// Permissions for the group given by the qualifier
    Group = 4,
    /// Upper bound for `User`, `GroupObj` and `Group` entries. Always computed.
    Mask = 5,
    /// Permissions for everyone else not covered by the ACL
    Other = 6,
}

impl TagType {
    /// Whether entries of this type carry a UID/GID qualifier.
    #[must_use]
    pub fn has_qualifier(self) -> bool {
        matches!(self, TagType::User | TagType::Group)
    }
}

impl TryFrom<i32> for TagType {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => TagType::UserObj,
            2 => TagType::User,
            3 => TagType::GroupObj,
            4 => TagType::Group,
            5 => TagType::Mask,
            6 => TagType::Other,
            other => return Err(other),
        })
    }
}

#[cfg(feature = "native")]
mod raw {
    use super::TagType;
    use acl_sys::{
        acl_tag_t, ACL_GROUP, ACL_GROUP_OBJ, ACL_MASK, ACL_OTHER, ACL_USER, ACL_USER_OBJ,
    };

    impl TagType {
        /// libacl `acl_tag_t` for this tag type.
        pub(crate) fn to_raw(self) -> acl_tag_t {
            match self {
                TagType::UserObj => ACL_USER_OBJ,
                TagType::User => ACL_USER,
                TagType::GroupObj => ACL_GROUP_OBJ,
                TagType::Group => ACL_GROUP,
                TagType::Mask => ACL_MASK,
                TagType::Other => ACL_OTHER,
            }
        }

        /// Convert libacl `acl_tag_t` to `TagType`. `ACL_UNDEFINED_TAG` and unknown values give
        /// `None`.
        pub(crate) fn from_raw(tag: acl_tag_t) -> Option<TagType> {
            match tag {
                ACL_USER_OBJ => Some(TagType::UserObj),
                ACL_USER => Some(TagType::User),
                ACL_GROUP_OBJ => Some(TagType::GroupObj),
                ACL_GROUP => Some(TagType::Group),
                ACL_MASK => Some(TagType::Mask),
                ACL_OTHER => Some(TagType::Other),
                _ => None,
            }
        }
    }
}

/// One line of a POSIX ACL, in the layout exchanged with the native layer.
///
/// `qualifier` is a UID for `User`, a GID for `Group`, and [`QUALIFIER_UNUSED`] otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct AclEntry {
    pub tag_type: TagType,
    pub qualifier: i32,
    pub permissions: Permissions,
}

const_assert_eq!(size_of::<AclEntry>(), 3 * 4);

impl AclEntry {
    /// Entry without a qualifier (`UserObj`, `GroupObj`, `Mask`, `Other`).
    #[must_use]
    pub fn unqualified(tag_type: TagType, permissions: Permissions) -> AclEntry {
        AclEntry {
            tag_type,
            qualifier: QUALIFIER_UNUSED,
            permissions,
        }
    }

    /// `User` entry for `uid`.
    #[must_use]
    pub fn user(uid: u32, permissions: Permissions) -> AclEntry {
        AclEntry {
            tag_type: TagType::User,
            qualifier: uid as i32,
            permissions,
        }
    }

    /// `Group` entry for `gid`.
    #[must_use]
    pub fn group(gid: u32, permissions: Permissions) -> AclEntry {
        AclEntry {
            tag_type: TagType::Group,
            qualifier: gid as i32,
            permissions,
        }
    }

    /// The qualifier as UID/GID. Only meaningful for `User` and `Group` entries.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.qualifier as u32
    }
}

/// Text form as printed by `getfacl -n`, e.g. `user:2000:rw-` or `mask::r--`.
impl fmt::Display for AclEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let perm = self.permissions;
        match self.tag_type {
            TagType::UserObj => write!(f, "user::{}", perm),
            TagType::User => write!(f, "user:{}:{}", self.id(), perm),
            TagType::GroupObj => write!(f, "group::{}", perm),
            TagType::Group => write!(f, "group:{}:{}", self.id(), perm),
            TagType::Mask => write!(f, "mask::{}", perm),
            TagType::Other => write!(f, "other::{}", perm),
        }
    }
}

/// Owner/group identity and the three class permissions, exchanged with the native layer next to
/// the ACL entries.
///
/// For a directory's default ACL the owner, group and mode fields describe the directory itself
/// and are never applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct BaseRecord {
    pub owner_id: i32,
    pub owner_permissions: Permissions,
    pub group_id: i32,
    pub group_permissions: Permissions,
    pub other_permissions: Permissions,
    /// Number of ACL entries that accompany this record.
    pub acl_size: i32,
}

const_assert_eq!(size_of::<BaseRecord>(), 6 * 4);

impl BaseRecord {
    /// Owner UID
    #[must_use]
    pub fn owner(&self) -> u32 {
        self.owner_id as u32
    }

    /// Owning group GID
    #[must_use]
    pub fn group(&self) -> u32 {
        self.group_id as u32
    }

    /// `chmod` mode described by the three class permissions.
    #[must_use]
    pub fn mode(&self) -> u32 {
        Permissions::mode_bits(
            self.owner_permissions,
            self.group_permissions,
            self.other_permissions,
        )
    }
}
