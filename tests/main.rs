//! Integration tests for public API.
//!
//! For internal unit tests, use top-level `src/tests.rs` instead.

use posix_permissions::TagType::*;
use posix_permissions::{
    AclEntry, AclError, AclKind, BaseRecord, NativeError, NativeOp, PermissionModel,
    PermissionProvider, Permissions, TagType, Transport, QUALIFIER_UNUSED,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const R: Permissions = Permissions::READ;
const W: Permissions = Permissions::WRITE;
const X: Permissions = Permissions::EXECUTE;
const RWX: Permissions = Permissions::RWX;

fn entry(tag_type: TagType, qualifier: i32, permissions: Permissions) -> AclEntry {
    AclEntry {
        tag_type,
        qualifier,
        permissions,
    }
}

fn base(owner: u32, group: u32) -> BaseRecord {
    BaseRecord {
        owner_id: owner as i32,
        owner_permissions: RWX,
        group_id: group as i32,
        group_permissions: R | X,
        other_permissions: R,
        acl_size: 0,
    }
}

/// Model from the end-to-end scenario: owner and group 1000, two named users and two named groups.
fn full_fixture() -> PermissionModel {
    let mut model = PermissionModel::new(1000, 1000);
    model.set_owner_permissions(RWX);
    model.set_group_permissions(R | W);
    model.set_other_permissions(R);
    model.set_user(2000, R | W);
    model.set_user(3000, R);
    model.set_group(2000, R);
    model.set_group(3000, R);
    model
}

#[test]
fn new() {
    let model = PermissionModel::new(1000, 100);
    assert_eq!(model.owner_id(), 1000);
    assert_eq!(model.group_id(), 100);
    assert_eq!(model.owner_permissions(), Permissions::empty());
    assert_eq!(model.group_permissions(), Permissions::empty());
    assert_eq!(model.other_permissions(), Permissions::empty());
    assert_eq!(model.extra_users().count(), 0);
    assert_eq!(model.extra_groups().count(), 0);
    assert_eq!(
        model.to_string(),
        "user::---\ngroup::---\nother::---\nmask::---\n"
    );
}

#[test]
fn export_scenario() {
    let (base, entries) = full_fixture().to_acl();
    assert_eq!(
        entries,
        [
            entry(UserObj, 1000, RWX),
            entry(GroupObj, 1000, R | W),
            entry(Other, QUALIFIER_UNUSED, R),
            entry(User, 2000, R | W),
            entry(User, 3000, R),
            entry(Group, 2000, R),
            entry(Group, 3000, R),
            entry(Mask, QUALIFIER_UNUSED, R | W),
        ]
    );
    assert_eq!(
        base,
        BaseRecord {
            owner_id: 1000,
            owner_permissions: RWX,
            group_id: 1000,
            group_permissions: R | W,
            other_permissions: R,
            acl_size: 8,
        }
    );
    assert_eq!(base.mode(), 0o764);
}

#[test]
fn display() {
    assert_eq!(
        full_fixture().to_string(),
        "user::rwx\ngroup::rw-\nother::r--\n\
         user:2000:rw-\nuser:3000:r--\ngroup:2000:r--\ngroup:3000:r--\n\
         mask::rw-\n"
    );
}

/// Named entries come out sorted by id, whatever the insertion order.
#[test]
fn export_order() {
    let mut model = PermissionModel::new(0, 0);
    model.set_group(30, R);
    model.set_user(9, X);
    model.set_group(10, W);
    model.set_user(3, R);
    let quals: Vec<_> = model
        .entries()
        .iter()
        .map(|e| (e.tag_type, e.qualifier))
        .collect();
    assert_eq!(
        quals,
        [
            (UserObj, 0),
            (GroupObj, 0),
            (Other, -1),
            (User, 3),
            (User, 9),
            (Group, 10),
            (Group, 30),
            (Mask, -1),
        ]
    );
}

#[test]
fn mask() {
    let mut model = PermissionModel::new(1, 1);
    // Owner permissions do not affect mask.
    model.set_owner_permissions(RWX);
    assert_eq!(model.mask(), Permissions::empty());
    model.set_other_permissions(R);
    assert_eq!(model.mask(), R);
    model.set_user(2, W);
    model.set_group(3, X);
    assert_eq!(model.mask(), RWX);
    model.clear_acls();
    assert_eq!(model.mask(), R);
    assert_eq!(model.entries().len(), 4);
}

#[test]
fn import() {
    let entries = [
        entry(UserObj, -1, Permissions::empty()),
        entry(User, 1000, X),
        entry(User, 2000, R | W),
        entry(GroupObj, -1, Permissions::empty()),
        entry(Group, 100, X),
        entry(Group, 200, R),
        entry(Mask, -1, Permissions::empty()),
        entry(Other, -1, RWX),
    ];
    let model = PermissionModel::from_acl(&base(1000, 100), &entries);
    // Base record wins over the ACL's UserObj/GroupObj/Other entries.
    assert_eq!(model.owner_permissions(), RWX);
    assert_eq!(model.group_permissions(), R | X);
    assert_eq!(model.other_permissions(), R);
    // Entries naming the owner or owning group are skipped.
    assert_eq!(model.extra_users().collect::<Vec<_>>(), [(2000, R | W)]);
    assert_eq!(model.extra_groups().collect::<Vec<_>>(), [(200, R)]);
}

#[test]
fn import_minimal_acl() {
    let entries = [
        entry(UserObj, 0, RWX),
        entry(GroupObj, 0, R),
        entry(Other, 0, R),
    ];
    let model = PermissionModel::from_acl(&base(5, 6), &entries);
    assert_eq!(model.extra_users().count(), 0);
    assert_eq!(model.extra_groups().count(), 0);
    assert_eq!(model.owner_id(), 5);
    assert_eq!(model.group_id(), 6);
}

#[test]
fn round_trip() {
    let model = full_fixture();
    let (base, entries) = model.to_acl();
    assert_eq!(PermissionModel::from_acl(&base, &entries), model);
}

/// Ids above `i32::MAX` survive the signed wire format.
#[test]
fn round_trip_large_ids() {
    let mut model = PermissionModel::new(u32::MAX - 1, 4_000_000_000);
    model.set_user(u32::MAX, R);
    model.set_group(3_000_000_000, W);
    let (base, entries) = model.to_acl();
    assert_eq!(base.owner(), u32::MAX - 1);
    assert_eq!(PermissionModel::from_acl(&base, &entries), model);
}

#[test]
fn set_owner_id_promotes() {
    let mut model = full_fixture();
    model.set_user(5000, X);
    model.set_owner_id(5000);
    assert_eq!(model.owner_id(), 5000);
    assert_eq!(model.owner_permissions(), X);
    assert_eq!(model.user(5000), Some(X));
    assert!(model.extra_users().all(|(uid, _)| uid != 5000));
    // The previous owner does not get an entry.
    assert_eq!(model.user(1000), None);
}

#[test]
fn set_owner_id_keeps_permissions() {
    let mut model = full_fixture();
    model.set_owner_id(4000);
    assert_eq!(model.owner_permissions(), RWX);
    assert_eq!(model.extra_users().count(), 2);
}

#[test]
fn set_group_id_promotes() {
    let mut model = full_fixture();
    model.set_group_id(3000);
    assert_eq!(model.group_permissions(), R);
    assert_eq!(model.extra_groups().collect::<Vec<_>>(), [(2000, R)]);
    assert_eq!(model.group(1000), None);

    model.set_group_id(7);
    assert_eq!(model.group_permissions(), R);
    assert_eq!(model.group_id(), 7);
}

#[test]
fn user_lookup() {
    let mut model = full_fixture();
    assert_eq!(model.user(1000), Some(RWX));
    assert_eq!(model.user(2000), Some(R | W));
    assert_eq!(model.user(1234), None);

    // Setting the owner goes to the owner permissions, not a named entry.
    model.set_user(1000, R);
    assert_eq!(model.owner_permissions(), R);
    assert_eq!(model.extra_users().count(), 2);

    // Bits without ACL meaning are passed through.
    model.set_user(2000, Permissions::STICKY);
    assert_eq!(model.user(2000), Some(Permissions::STICKY));
}

#[test]
fn group_lookup() {
    let mut model = full_fixture();
    assert_eq!(model.group(1000), Some(R | W));
    assert_eq!(model.group(3000), Some(R));
    assert_eq!(model.group(1), None);

    model.set_group(1000, X);
    assert_eq!(model.group_permissions(), X);
    assert_eq!(model.extra_groups().count(), 2);
}

#[test]
fn extend_last_write_wins() {
    let mut model = PermissionModel::new(1, 1);
    model.extend_users(vec![(5, R), (6, W), (5, X), (1, RWX)]);
    assert_eq!(model.extra_users().collect::<Vec<_>>(), [(5, X), (6, W)]);
    assert_eq!(model.owner_permissions(), RWX);

    model.extend_groups([(9, R), (9, W)]);
    assert_eq!(model.group(9), Some(W));
    model.extend_groups(std::iter::empty());
    assert_eq!(model.extra_groups().count(), 1);
}

#[test]
fn remove() {
    let mut model = full_fixture();
    assert_eq!(model.remove_user(2000).unwrap(), Some(R | W));
    assert_eq!(model.remove_user(2000).unwrap(), None);
    assert_eq!(model.remove_user(4242).unwrap(), None);
    assert_eq!(model.remove_group(3000).unwrap(), Some(R));
    assert_eq!(model.entries().len(), 6);
}

#[test]
fn remove_owner_fails() {
    let mut model = full_fixture();
    let err = model.remove_user(1000).unwrap_err();
    assert!(matches!(err, AclError::InvalidArgument(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = model.remove_group(1000).unwrap_err();
    assert!(matches!(err, AclError::InvalidArgument(_)));
    assert_eq!(model, full_fixture());
}

#[test]
fn clear_acls() {
    let mut model = full_fixture();
    model.clear_acls();
    assert_eq!(model.extra_users().count(), 0);
    assert_eq!(model.extra_groups().count(), 0);
    assert_eq!(model.owner_permissions(), RWX);
    assert_eq!(model.group_permissions(), R | W);
    assert_eq!(model.other_permissions(), R);
    assert_eq!(model.to_string(), "user::rwx\ngroup::rw-\nother::r--\nmask::rw-\n");
}

/// Keeps what was applied per path and ACL kind.
#[derive(Default)]
struct MemoryTransport {
    files: RefCell<HashMap<(PathBuf, AclKind), (BaseRecord, Vec<AclEntry>)>>,
}

impl Transport for MemoryTransport {
    fn query_permissions(
        &self,
        path: &Path,
        kind: AclKind,
    ) -> Result<(BaseRecord, Vec<AclEntry>), AclError> {
        self.files
            .borrow()
            .get(&(path.to_path_buf(), kind))
            .cloned()
            .ok_or_else(|| NativeError::new(NativeOp::Open, libc::ENOENT).into())
    }

    fn apply_permissions(
        &self,
        path: &Path,
        kind: AclKind,
        base: &BaseRecord,
        entries: &[AclEntry],
    ) -> Result<(), AclError> {
        self.files
            .borrow_mut()
            .insert((path.to_path_buf(), kind), (*base, entries.to_vec()));
        Ok(())
    }
}

#[test]
fn provider_round_trip() {
    let provider = PermissionProvider::new(MemoryTransport::default());
    let model = full_fixture();
    provider.write("/a", AclKind::Access, &model).unwrap();

    let files = provider.transport().files.borrow();
    let (base, entries) = &files[&(PathBuf::from("/a"), AclKind::Access)];
    assert_eq!(base.acl_size, 8);
    assert_eq!(entries, &model.entries());
    drop(files);

    assert_eq!(provider.read("/a", AclKind::Access).unwrap(), model);
    // Kinds are kept apart.
    let err = provider.read("/a", AclKind::Default).unwrap_err();
    assert!(matches!(err, AclError::NotFound(_)));
}

#[test]
fn provider_by_reference() {
    let transport = MemoryTransport::default();
    let provider = PermissionProvider::new(&transport);
    provider
        .write("/d", AclKind::Default, &PermissionModel::new(0, 0))
        .unwrap();
    assert!(transport
        .files
        .borrow()
        .contains_key(&(PathBuf::from("/d"), AclKind::Default)));
}

#[cfg(feature = "native")]
mod native {
    use super::*;
    use posix_permissions::NativeTransport;
    use std::fs::{self, OpenOptions};
    use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
    use tempfile::{tempdir, TempDir};

    /// Helper to create empty test files
    fn test_file(dir: &TempDir, name: &str, mode: u32) -> PathBuf {
        let path = dir.path().join(name);
        OpenOptions::new()
            .create_new(true)
            .write(true)
            .mode(mode)
            .open(&path)
            .unwrap();
        // Not subject to umask
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o7777
    }

    #[test]
    fn read_file_with_no_acl() {
        let dir = tempdir().unwrap();
        let path = test_file(&dir, "test.file", 0o640);

        let (base, entries) = NativeTransport
            .query_permissions(&path, AclKind::Access)
            .unwrap();
        // On Linux, this is missing the "mask" entry
        assert_eq!(base.acl_size, 3);
        assert_eq!(entries.len(), 3);
        assert_eq!(base.owner_permissions, R | W);
        assert_eq!(base.group_permissions, R);
        assert_eq!(base.other_permissions, Permissions::empty());

        let model = PermissionModel::from_acl(&base, &entries);
        assert_eq!(model.extra_users().count(), 0);
        assert_eq!(model.to_string(), "user::rw-\ngroup::r--\nother::---\nmask::r--\n");
    }

    /// Make sure that the model survives the write+read round-trip
    #[test]
    fn writeread() {
        let dir = tempdir().unwrap();
        let path = test_file(&dir, "test.file", 0o640);
        let provider = PermissionProvider::native();

        let mut model = provider.read(&path, AclKind::Access).unwrap();
        model.set_owner_permissions(RWX);
        // Using UID/GID 55555 that is likely undefined on Linux systems
        model.set_user(55555, R);
        model.set_group(55555, Permissions::empty());
        provider.write(&path, AclKind::Access, &model).unwrap();

        assert_eq!(mode_of(&path), 0o740);
        assert_eq!(provider.read(&path, AclKind::Access).unwrap(), model);

        let (base, entries) = NativeTransport
            .query_permissions(&path, AclKind::Access)
            .unwrap();
        assert_eq!(base.acl_size, 6);
        assert!(entries.contains(&AclEntry::user(55555, R)));
        assert!(entries.contains(&AclEntry::unqualified(Mask, R)));
    }

    #[test]
    fn write_clears_acl() {
        let dir = tempdir().unwrap();
        let path = test_file(&dir, "test.file", 0o600);
        let provider = PermissionProvider::native();

        let mut model = provider.read(&path, AclKind::Access).unwrap();
        model.set_user(55555, Permissions::empty());
        provider.write(&path, AclKind::Access, &model).unwrap();
        model.clear_acls();
        provider.write(&path, AclKind::Access, &model).unwrap();

        let read = provider.read(&path, AclKind::Access).unwrap();
        assert_eq!(read.extra_users().count(), 0);
        assert_eq!(mode_of(&path), 0o600);
    }

    #[test]
    fn default_acl() {
        let dir = tempdir().unwrap();
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o750)).unwrap();
        let provider = PermissionProvider::native();

        // No default ACL yet: base record only.
        let (_, entries) = NativeTransport
            .query_permissions(dir.path(), AclKind::Default)
            .unwrap();
        assert!(entries.is_empty());

        let mut model = provider.read(dir.path(), AclKind::Default).unwrap();
        assert_eq!(model.owner_permissions(), RWX);
        model.set_other_permissions(R);
        model.set_user(55555, R | X);
        provider.write(dir.path(), AclKind::Default, &model).unwrap();

        // The directory's own mode is untouched.
        assert_eq!(mode_of(dir.path()), 0o750);
        let read = provider.read(dir.path(), AclKind::Default).unwrap();
        assert_eq!(read.extra_users().collect::<Vec<_>>(), [(55555, R | X)]);
        // Base record comes from the directory, not from the default ACL.
        assert_eq!(read.other_permissions(), Permissions::empty());

        // Access ACL of the directory stays minimal.
        let access = provider.read(dir.path(), AclKind::Access).unwrap();
        assert_eq!(access.extra_users().count(), 0);
    }

    /// Default ACL on a non-directory fails
    #[test]
    fn default_acl_file() {
        let dir = tempdir().unwrap();
        let path = test_file(&dir, "test.file", 0o644);

        let err = PermissionProvider::native()
            .read(&path, AclKind::Default)
            .unwrap_err();
        // That's a confusing error, but it is what Linux reports.
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn read_not_found() {
        let err = PermissionProvider::native()
            .read("file_not_found", AclKind::Access)
            .unwrap_err();
        assert!(matches!(err, AclError::NotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let native = err.native().unwrap();
        assert_eq!(native.op, NativeOp::Open);
        assert_eq!(native.errno, libc::ENOENT);
        assert_eq!(
            err.to_string(),
            "not found: open failed: No such file or directory (os error 2)"
        );
    }

    #[test]
    fn write_not_found() {
        let model = PermissionModel::new(0, 0);
        let err = PermissionProvider::native()
            .write("file_not_found", AclKind::Access, &model)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    /// A named entry without a mask fails validation, before anything is changed.
    #[test]
    fn write_invalid_acl() {
        let dir = tempdir().unwrap();
        let path = test_file(&dir, "test.file", 0o640);
        let (mut base, _) = NativeTransport
            .query_permissions(&path, AclKind::Access)
            .unwrap();
        base.other_permissions = RWX;

        let entries = [
            AclEntry::unqualified(UserObj, RWX),
            AclEntry::unqualified(GroupObj, R),
            AclEntry::unqualified(Other, R),
            AclEntry::user(55555, R),
        ];
        let err = NativeTransport
            .apply_permissions(&path, AclKind::Access, &base, &entries)
            .unwrap_err();
        assert!(matches!(err, AclError::InvalidAcl(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(mode_of(&path), 0o640);
    }

    #[test]
    fn write_duplicate_entries() {
        let dir = tempdir().unwrap();
        let path = test_file(&dir, "test.file", 0o640);
        let (base, _) = NativeTransport
            .query_permissions(&path, AclKind::Access)
            .unwrap();

        let mut entries = PermissionModel::from_acl(&base, &[]).entries();
        entries.push(AclEntry::unqualified(Other, R));
        let err = NativeTransport
            .apply_permissions(&path, AclKind::Access, &base, &entries)
            .unwrap_err();
        assert!(matches!(err, AclError::InvalidAcl(_)));
    }

    /// Set-user-ID goes through the mode and is not lost when the ACL is set afterwards.
    #[test]
    fn write_keeps_set_id() {
        let dir = tempdir().unwrap();
        let path = test_file(&dir, "test.file", 0o640);
        let provider = PermissionProvider::native();

        let mut model = provider.read(&path, AclKind::Access).unwrap();
        model.set_owner_permissions(RWX | Permissions::SET_ID);
        model.set_group_permissions(R);
        model.set_user(55555, R | W);
        provider.write(&path, AclKind::Access, &model).unwrap();

        // Group bits show the mask.
        assert_eq!(mode_of(&path), 0o4760);
        let read = provider.read(&path, AclKind::Access).unwrap();
        assert_eq!(read.owner_permissions(), RWX | Permissions::SET_ID);
        assert_eq!(read.user(55555), Some(R | W));
    }

    #[test]
    fn write_sticky_directory() {
        let dir = tempdir().unwrap();
        let provider = PermissionProvider::native();

        let mut model = provider.read(dir.path(), AclKind::Access).unwrap();
        model.set_owner_permissions(RWX | Permissions::STICKY);
        model.set_group_permissions(R | X);
        model.set_other_permissions(Permissions::empty());
        provider.write(dir.path(), AclKind::Access, &model).unwrap();

        assert_eq!(mode_of(dir.path()), 0o1750);
        let read = provider.read(dir.path(), AclKind::Access).unwrap();
        assert_eq!(read.owner_permissions(), RWX | Permissions::STICKY);
    }

    /// With named entries the group mode bits hold the mask, so the group permissions read back
    /// are the mask. The ACL's own group entry keeps what was written.
    #[test]
    fn group_reads_back_as_mask() {
        let dir = tempdir().unwrap();
        let path = test_file(&dir, "test.file", 0o600);
        let provider = PermissionProvider::native();

        let mut model = provider.read(&path, AclKind::Access).unwrap();
        model.set_group_permissions(R);
        model.set_user(55555, R | W);
        provider.write(&path, AclKind::Access, &model).unwrap();

        let read = provider.read(&path, AclKind::Access).unwrap();
        assert_eq!(read.group_permissions(), R | W);
        assert_eq!(read.mask(), R | W);

        let (base, entries) = NativeTransport
            .query_permissions(&path, AclKind::Access)
            .unwrap();
        assert_eq!(base.group_permissions, R | W);
        assert!(entries.contains(&AclEntry::unqualified(GroupObj, R)));
        assert!(entries.contains(&AclEntry::unqualified(Mask, R | W)));
    }

    /// Owner and group are changed with `fchown`. Without root that is refused before the ACL is
    /// touched.
    #[test]
    fn write_changes_owner() {
        let dir = tempdir().unwrap();
        let path = test_file(&dir, "test.file", 0o640);
        let provider = PermissionProvider::native();

        let mut model = provider.read(&path, AclKind::Access).unwrap();
        model.set_owner_id(55555);
        model.set_group_id(44444);
        model.set_user(1234, R | W);
        let result = provider.write(&path, AclKind::Access, &model);

        let meta = fs::metadata(&path).unwrap();
        if unsafe { libc::geteuid() } == 0 {
            result.unwrap();
            assert_eq!(meta.uid(), 55555);
            assert_eq!(meta.gid(), 44444);
            let read = provider.read(&path, AclKind::Access).unwrap();
            assert_eq!(read.owner_id(), 55555);
            assert_eq!(read.group_id(), 44444);
            assert_eq!(read.user(1234), Some(R | W));
        } else {
            let err = result.unwrap_err();
            assert!(matches!(err, AclError::AccessDenied(_)));
            assert_eq!(err.native().map(|e| e.op), Some(NativeOp::Chown));
            assert_eq!(meta.uid(), unsafe { libc::geteuid() });
            let read = provider.read(&path, AclKind::Access).unwrap();
            assert_eq!(read.extra_users().count(), 0);
            assert_eq!(mode_of(&path), 0o640);
        }
    }

    /// Reads and writes from several threads, each on its own file.
    #[test]
    fn concurrent_sessions() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..4)
            .map(|i| test_file(&dir, &format!("test{}.file", i), 0o600))
            .collect();
        let provider = PermissionProvider::native();

        std::thread::scope(|s| {
            for (i, path) in paths.iter().enumerate() {
                let provider = &provider;
                s.spawn(move || {
                    for round in 0..25 {
                        let mut model = provider.read(path, AclKind::Access).unwrap();
                        model.set_user(50000 + round, R);
                        model.set_group(60000 + i as u32, W);
                        provider.write(path, AclKind::Access, &model).unwrap();
                    }
                });
            }
        });

        for (i, path) in paths.iter().enumerate() {
            let model = provider.read(path, AclKind::Access).unwrap();
            assert_eq!(model.extra_users().count(), 25);
            assert_eq!(
                model.extra_groups().collect::<Vec<_>>(),
                [(60000 + i as u32, W)]
            );
        }
    }
}
