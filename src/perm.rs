use bitflags::bitflags;
use libc::mode_t;
use std::fmt;

bitflags! {
    /// Permission bits of one ACL entry or one mode class (owner, group, other).
    ///
    /// The values are the ones exchanged with the native layer, so the low three bits coincide
    /// with libacl's `ACL_EXECUTE`, `ACL_WRITE` and `ACL_READ`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Execute (search, for directories)
        const EXECUTE = 1;
        /// Write
        const WRITE = 1 << 1;
        /// Read (list, for directories)
        const READ = 1 << 2;
        /// Set-user-ID or set-group-ID on execution. Only meaningful for owner and group.
        const SET_ID = 1 << 3;
        /// Restricted deletion in directories. Only meaningful for owner.
        const STICKY = 1 << 4;

        /// Read, write and execute
        const RWX = Self::READ.bits() | Self::WRITE.bits() | Self::EXECUTE.bits();
    }
}

// (mode bit, permission) tables for each class.
const OWNER_BITS: [(mode_t, Permissions); 5] = [
    (libc::S_IRUSR, Permissions::READ),
    (libc::S_IWUSR, Permissions::WRITE),
    (libc::S_IXUSR, Permissions::EXECUTE),
    (libc::S_ISUID, Permissions::SET_ID),
    (libc::S_ISVTX, Permissions::STICKY),
];
const GROUP_BITS: [(mode_t, Permissions); 4] = [
    (libc::S_IRGRP, Permissions::READ),
    (libc::S_IWGRP, Permissions::WRITE),
    (libc::S_IXGRP, Permissions::EXECUTE),
    (libc::S_ISGID, Permissions::SET_ID),
];
const OTHER_BITS: [(mode_t, Permissions); 3] = [
    (libc::S_IROTH, Permissions::READ),
    (libc::S_IWOTH, Permissions::WRITE),
    (libc::S_IXOTH, Permissions::EXECUTE),
];

fn from_table(mode: u32, table: &[(mode_t, Permissions)]) -> Permissions {
    table
        .iter()
        .filter(|(bit, _)| mode & *bit as u32 != 0)
        .fold(Permissions::empty(), |acc, (_, perm)| acc | *perm)
}

fn to_table(perm: Permissions, table: &[(mode_t, Permissions)]) -> u32 {
    table
        .iter()
        .filter(|(_, flag)| perm.contains(*flag))
        .fold(0, |acc, (bit, _)| acc | *bit as u32)
}

impl Permissions {
    /// Owner class of a file mode (`st_mode`), including the set-user-ID and sticky bits.
    ///
    /// ```
    /// use posix_permissions::Permissions;
    /// assert_eq!(
    ///     Permissions::owner_from_mode(0o4750),
    ///     Permissions::RWX | Permissions::SET_ID
    /// );
    /// ```
    #[must_use]
    pub fn owner_from_mode(mode: u32) -> Permissions {
        from_table(mode, &OWNER_BITS)
    }

    /// Group class of a file mode, including the set-group-ID bit.
    #[must_use]
    pub fn group_from_mode(mode: u32) -> Permissions {
        from_table(mode, &GROUP_BITS)
    }

    /// Other class of a file mode.
    #[must_use]
    pub fn other_from_mode(mode: u32) -> Permissions {
        from_table(mode, &OTHER_BITS)
    }

    /// Compose a `chmod` mode from the three class permissions. Bits that have no meaning for a
    /// class (e.g. `STICKY` on the group) are dropped.
    ///
    /// ```
    /// use posix_permissions::Permissions;
    /// let mode = Permissions::mode_bits(
    ///     Permissions::RWX,
    ///     Permissions::READ | Permissions::EXECUTE,
    ///     Permissions::READ | Permissions::STICKY,
    /// );
    /// assert_eq!(mode, 0o754);
    /// ```
    #[must_use]
    pub fn mode_bits(owner: Permissions, group: Permissions, other: Permissions) -> u32 {
        to_table(owner, &OWNER_BITS) | to_table(group, &GROUP_BITS) | to_table(other, &OTHER_BITS)
    }

    /// The part of these permissions that a libacl permset can hold.
    #[must_use]
    pub fn acl_bits(self) -> Permissions {
        self & Permissions::RWX
    }
}

/// `getfacl` style rendering, e.g. `r-x`.
impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.contains(Permissions::READ) { 'r' } else { '-' },
            if self.contains(Permissions::WRITE) { 'w' } else { '-' },
            if self.contains(Permissions::EXECUTE) { 'x' } else { '-' },
        )
    }
}
