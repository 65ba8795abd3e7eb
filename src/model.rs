use crate::entry::{AclEntry, BaseRecord, TagType};
use crate::error::AclError;
use crate::Permissions;
use std::collections::BTreeMap;
use std::fmt;

/// Permissions of a file or directory: owner, owning group and others, plus the sparse named-user
/// and named-group entries of its POSIX ACL.
///
/// The owner is never a key of the named-user entries and the owning group never a key of the
/// named-group entries; every mutating method maintains this. The ACL `Mask` is not stored, it is
/// computed on export (see [`PermissionModel::mask()`]).
///
/// ```
/// use posix_permissions::{PermissionModel, Permissions};
/// let mut model = PermissionModel::new(1000, 1000);
/// model.set_owner_permissions(Permissions::RWX);
/// model.set_user(2000, Permissions::READ);
/// assert_eq!(
///     model.to_string(),
///     "user::rwx\ngroup::---\nother::---\nuser:2000:r--\nmask::r--\n"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionModel {
    owner_id: u32,
    owner_permissions: Permissions,
    group_id: u32,
    group_permissions: Permissions,
    other_permissions: Permissions,
    users: BTreeMap<u32, Permissions>,
    groups: BTreeMap<u32, Permissions>,
}

impl PermissionModel {
    /// Model owned by `owner_id` and `group_id` with no permissions at all and no ACL entries.
    #[must_use]
    pub fn new(owner_id: u32, group_id: u32) -> PermissionModel {
        PermissionModel {
            owner_id,
            owner_permissions: Permissions::empty(),
            group_id,
            group_permissions: Permissions::empty(),
            other_permissions: Permissions::empty(),
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }

    /// Build a model from a base record and the ACL entries read along with it.
    ///
    /// Owner, group and other come from `base` alone. Of `entries` only `User` and `Group` entries
    /// are used; those naming the owner or the owning group are skipped, as are `UserObj`,
    /// `GroupObj`, `Mask` and `Other`. The `acl_size` field of `base` is ignored.
    #[must_use]
    pub fn from_acl(base: &BaseRecord, entries: &[AclEntry]) -> PermissionModel {
        let mut model = PermissionModel {
            owner_permissions: base.owner_permissions,
            group_permissions: base.group_permissions,
            other_permissions: base.other_permissions,
            ..PermissionModel::new(base.owner(), base.group())
        };
        for entry in entries {
            match entry.tag_type {
                TagType::User if entry.id() != model.owner_id => {
                    model.users.insert(entry.id(), entry.permissions);
                }
                TagType::Group if entry.id() != model.group_id => {
                    model.groups.insert(entry.id(), entry.permissions);
                }
                TagType::User | TagType::Group => {
                    log::trace!("skipping {} entry, duplicates owner or owning group", entry);
                }
                TagType::UserObj | TagType::GroupObj | TagType::Mask | TagType::Other => {}
            }
        }
        model
    }

    /// Export as base record plus ACL entries, in the order the native layer expects:
    /// `UserObj`, `GroupObj`, `Other`, named users, named groups, `Mask`.
    ///
    /// Named users and groups appear in ascending id order.
    #[must_use]
    pub fn to_acl(&self) -> (BaseRecord, Vec<AclEntry>) {
        let entries = self.entries();
        let base = BaseRecord {
            owner_id: self.owner_id as i32,
            owner_permissions: self.owner_permissions,
            group_id: self.group_id as i32,
            group_permissions: self.group_permissions,
            other_permissions: self.other_permissions,
            acl_size: entries.len() as i32,
        };
        (base, entries)
    }

    /// The ACL entries of [`PermissionModel::to_acl()`] alone.
    #[must_use]
    pub fn entries(&self) -> Vec<AclEntry> {
        let mut entries = Vec::with_capacity(4 + self.users.len() + self.groups.len());
        entries.push(AclEntry {
            tag_type: TagType::UserObj,
            qualifier: self.owner_id as i32,
            permissions: self.owner_permissions,
        });
        entries.push(AclEntry {
            tag_type: TagType::GroupObj,
            qualifier: self.group_id as i32,
            permissions: self.group_permissions,
        });
        entries.push(AclEntry::unqualified(TagType::Other, self.other_permissions));
        entries.extend(self.users.iter().map(|(&uid, &perm)| AclEntry::user(uid, perm)));
        entries.extend(self.groups.iter().map(|(&gid, &perm)| AclEntry::group(gid, perm)));
        entries.push(AclEntry::unqualified(TagType::Mask, self.mask()));
        entries
    }

    /// Union of the group, other, named-user and named-group permissions. Written as the ACL's
    /// `Mask` entry so that it never restricts a permission this model grants.
    #[must_use]
    pub fn mask(&self) -> Permissions {
        self.users
            .values()
            .chain(self.groups.values())
            .fold(self.group_permissions | self.other_permissions, |acc, perm| acc | *perm)
    }

    /// UID of the owner.
    #[must_use]
    pub fn owner_id(&self) -> u32 {
        self.owner_id
    }

    /// Change the owner. If `uid` has a named-user entry, that entry becomes the owner's
    /// permissions and is removed from the named users; otherwise the owner permissions are kept
    /// as they are. The previous owner gets no entry of its own.
    ///
    /// ```
    /// use posix_permissions::{PermissionModel, Permissions};
    /// let mut model = PermissionModel::new(1000, 1000);
    /// model.set_user(5000, Permissions::EXECUTE);
    /// model.set_owner_id(5000);
    /// assert_eq!(model.owner_permissions(), Permissions::EXECUTE);
    /// assert_eq!(model.extra_users().count(), 0);
    /// ```
    pub fn set_owner_id(&mut self, uid: u32) {
        if let Some(perm) = self.users.remove(&uid) {
            self.owner_permissions = perm;
        }
        self.owner_id = uid;
    }

    #[must_use]
    pub fn owner_permissions(&self) -> Permissions {
        self.owner_permissions
    }

    pub fn set_owner_permissions(&mut self, perm: Permissions) {
        self.owner_permissions = perm;
    }

    /// GID of the owning group.
    #[must_use]
    pub fn group_id(&self) -> u32 {
        self.group_id
    }

    /// Change the owning group. Same promotion rule as [`PermissionModel::set_owner_id()`].
    pub fn set_group_id(&mut self, gid: u32) {
        if let Some(perm) = self.groups.remove(&gid) {
            self.group_permissions = perm;
        }
        self.group_id = gid;
    }

    #[must_use]
    pub fn group_permissions(&self) -> Permissions {
        self.group_permissions
    }

    pub fn set_group_permissions(&mut self, perm: Permissions) {
        self.group_permissions = perm;
    }

    #[must_use]
    pub fn other_permissions(&self) -> Permissions {
        self.other_permissions
    }

    pub fn set_other_permissions(&mut self, perm: Permissions) {
        self.other_permissions = perm;
    }

    /// Permissions of user `uid`: the owner permissions if `uid` owns the file, else its named-user
    /// entry, if any.
    #[must_use]
    pub fn user(&self, uid: u32) -> Option<Permissions> {
        if uid == self.owner_id {
            Some(self.owner_permissions)
        } else {
            self.users.get(&uid).copied()
        }
    }

    /// Set the permissions of user `uid`. For the owner this sets the owner permissions, for anybody
    /// else a named-user entry is added or updated.
    ///
    /// `perm` is not checked: bits without meaning for ACL entries are passed through.
    pub fn set_user(&mut self, uid: u32, perm: Permissions) {
        if uid == self.owner_id {
            self.owner_permissions = perm;
        } else {
            self.users.insert(uid, perm);
        }
    }

    /// [`PermissionModel::set_user()`] for each pair, in iteration order. When a UID
    /// repeats, the last pair wins.
    pub fn extend_users<I>(&mut self, perms: I)
    where
        I: IntoIterator<Item = (u32, Permissions)>,
    {
        for (uid, perm) in perms {
            self.set_user(uid, perm);
        }
    }

    /// Remove the named-user entry of `uid`. If found, returns its permissions, otherwise `None`.
    ///
    /// # Errors
    /// * `AclError::InvalidArgument`: `uid` is the owner, whose permissions cannot be removed.
    pub fn remove_user(&mut self, uid: u32) -> Result<Option<Permissions>, AclError> {
        if uid == self.owner_id {
            return Err(AclError::InvalidArgument(
                "the owner's permissions cannot be removed",
            ));
        }
        Ok(self.users.remove(&uid))
    }

    /// Named-user entries in ascending UID order. Never contains the owner.
    pub fn extra_users(&self) -> impl Iterator<Item = (u32, Permissions)> + '_ {
        self.users.iter().map(|(&uid, &perm)| (uid, perm))
    }

    /// Permissions of group `gid`: the owning group permissions if `gid` is the owning group, else
    /// its named-group entry, if any.
    #[must_use]
    pub fn group(&self, gid: u32) -> Option<Permissions> {
        if gid == self.group_id {
            Some(self.group_permissions)
        } else {
            self.groups.get(&gid).copied()
        }
    }

    /// Set the permissions of group `gid`, see [`PermissionModel::set_user()`].
    pub fn set_group(&mut self, gid: u32, perm: Permissions) {
        if gid == self.group_id {
            self.group_permissions = perm;
        } else {
            self.groups.insert(gid, perm);
        }
    }

    /// [`PermissionModel::set_group()`] for each pair, in iteration order. When a
    /// GID repeats, the last pair wins.
    pub fn extend_groups<I>(&mut self, perms: I)
    where
        I: IntoIterator<Item = (u32, Permissions)>,
    {
        for (gid, perm) in perms {
            self.set_group(gid, perm);
        }
    }

    /// Remove the named-group entry of `gid`. If found, returns its permissions, otherwise `None`.
    ///
    /// # Errors
    /// * `AclError::InvalidArgument`: `gid` is the owning group, whose permissions cannot be
    ///   removed.
    pub fn remove_group(&mut self, gid: u32) -> Result<Option<Permissions>, AclError> {
        if gid == self.group_id {
            return Err(AclError::InvalidArgument(
                "the owning group's permissions cannot be removed",
            ));
        }
        Ok(self.groups.remove(&gid))
    }

    /// Named-group entries in ascending GID order. Never contains the owning group.
    pub fn extra_groups(&self) -> impl Iterator<Item = (u32, Permissions)> + '_ {
        self.groups.iter().map(|(&gid, &perm)| (gid, perm))
    }

    /// Drop all named-user and named-group entries, leaving a minimal ACL. Owner, group and other
    /// permissions are kept.
    pub fn clear_acls(&mut self) {
        self.users.clear();
        self.groups.clear();
    }
}

/// Text form of the exported ACL, one `getfacl -n` style entry per line.
impl fmt::Display for PermissionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.entries() {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}
