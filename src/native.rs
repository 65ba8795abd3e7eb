//! `Transport` backed by libc and libacl.
use crate::entry::{AclEntry, BaseRecord, TagType, QUALIFIER_UNUSED};
use crate::error::{AclError, NativeError, NativeOp};
use crate::iter::RawAclIterator;
use crate::transport::{AclKind, Transport};
use crate::util::{check_pointer, check_return, path_to_cstring, AclHandle, AutoPtr};
use crate::Permissions;
use acl_sys::{
    acl_add_perm, acl_clear_perms, acl_create_entry, acl_entry_t, acl_get_fd, acl_get_file,
    acl_get_permset, acl_get_qualifier, acl_get_tag_type, acl_init, acl_permset_t, acl_set_fd,
    acl_set_file, acl_set_qualifier, acl_set_tag_type, acl_tag_t, acl_valid, ACL_EXECUTE,
    ACL_READ, ACL_TYPE_DEFAULT, ACL_WRITE,
};
use std::ffi::CString;
use std::fs::{self, File};
use std::os::raw::c_void;
use std::os::unix::fs::{fchown, MetadataExt, PermissionsExt};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr::null_mut;
use std::sync::{Mutex, PoisonError};

/// Held for the whole of every read or write sequence. libacl and the file system calls are
/// not assumed to be safe to interleave between threads.
static NATIVE_LOCK: Mutex<()> = Mutex::new(());

const PERM_BITS: [(Permissions, u32); 3] = [
    (Permissions::READ, ACL_READ),
    (Permissions::WRITE, ACL_WRITE),
    (Permissions::EXECUTE, ACL_EXECUTE),
];

/// Reads and writes permissions of real files through `open`, `fstat`, `fchown`, `fchmod` and the
/// libacl API.
///
/// ```no_run
/// use posix_permissions::{AclKind, NativeTransport, Transport};
/// use std::path::Path;
/// let (base, entries) = NativeTransport
///     .query_permissions(Path::new("/etc/shells"), AclKind::Access)
///     .unwrap();
/// assert_eq!(base.acl_size as usize, entries.len());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeTransport;

impl Transport for NativeTransport {
    fn query_permissions(
        &self,
        path: &Path,
        kind: AclKind,
    ) -> Result<(BaseRecord, Vec<AclEntry>), AclError> {
        log::debug!("reading {} {}", path.display(), kind);
        let _guard = NATIVE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let result = ReadSession::open(path, kind).and_then(|(session, base)| {
            let entries = session.read_entries()?;
            Ok((base, entries))
        });
        result.map_err(|err| {
            log::warn!("reading {} {} failed: {}", path.display(), kind, err);
            AclError::from(err)
        })
    }

    fn apply_permissions(
        &self,
        path: &Path,
        kind: AclKind,
        base: &BaseRecord,
        entries: &[AclEntry],
    ) -> Result<(), AclError> {
        log::debug!(
            "writing {} {} with {} entries",
            path.display(),
            kind,
            entries.len()
        );
        let _guard = NATIVE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        WriteSession::open(path)
            .and_then(|session| session.apply(kind, base, entries))
            .map_err(|err| {
                log::warn!("writing {} {} failed: {}", path.display(), kind, err);
                AclError::from(err)
            })
    }
}

fn open(path: &Path) -> Result<(File, CString), NativeError> {
    let c_path = path_to_cstring(path)?;
    let file = File::open(path).map_err(|err| NativeError::from_io(NativeOp::Open, &err))?;
    Ok((file, c_path))
}

fn fstat(file: &File) -> Result<fs::Metadata, NativeError> {
    file.metadata()
        .map_err(|err| NativeError::from_io(NativeOp::Fstat, &err))
}

/// Open descriptor plus the ACL obtained through it, between reading the base record and
/// reading the entries. Both are released when the session is dropped.
struct ReadSession {
    _file: File,
    acl: AclHandle,
}

impl ReadSession {
    fn open(path: &Path, kind: AclKind) -> Result<(ReadSession, BaseRecord), NativeError> {
        let (file, c_path) = open(path)?;
        let meta = fstat(&file)?;
        let mode = meta.mode();

        let raw = match kind {
            AclKind::Access => unsafe { acl_get_fd(file.as_raw_fd()) },
            // acl_get_fd() can only return the access ACL.
            AclKind::Default => unsafe { acl_get_file(c_path.as_ptr(), ACL_TYPE_DEFAULT) },
        };
        let acl = AclHandle::new(raw, NativeOp::GetAcl)?;

        let mut acl_size = 0;
        for entry in RawAclIterator::new(&acl) {
            entry?;
            acl_size += 1;
        }

        let base = BaseRecord {
            owner_id: meta.uid() as i32,
            owner_permissions: Permissions::owner_from_mode(mode),
            group_id: meta.gid() as i32,
            group_permissions: Permissions::group_from_mode(mode),
            other_permissions: Permissions::other_from_mode(mode),
            acl_size,
        };
        Ok((ReadSession { _file: file, acl }, base))
    }

    fn read_entries(self) -> Result<Vec<AclEntry>, NativeError> {
        RawAclIterator::new(&self.acl)
            .map(|entry| entry.and_then(decode_entry))
            .collect()
    }
}

/// Convert C type `acl_entry_t` to `AclEntry`
fn decode_entry(entry: acl_entry_t) -> Result<AclEntry, NativeError> {
    let mut tag: acl_tag_t = 0;
    check_return(
        unsafe { acl_get_tag_type(entry, &mut tag) },
        NativeOp::GetTagType,
    )?;
    let tag_type = TagType::from_raw(tag)
        .ok_or_else(|| NativeError::new(NativeOp::InvalidTagType, libc::EINVAL))?;

    let qualifier = if tag_type.has_qualifier() {
        let id = AutoPtr(unsafe { acl_get_qualifier(entry) } as *mut u32);
        check_pointer(id.0, NativeOp::GetQualifier)?;
        unsafe { *id.0 as i32 }
    } else {
        QUALIFIER_UNUSED
    };

    let mut permset: acl_permset_t = null_mut();
    check_return(
        unsafe { acl_get_permset(entry, &mut permset) },
        NativeOp::GetPermset,
    )?;
    let bits = unsafe { *(permset as *const u32) };
    let permissions = PERM_BITS
        .iter()
        .filter(|(_, bit)| bits & *bit != 0)
        .fold(Permissions::empty(), |acc, (perm, _)| acc | *perm);

    let entry = AclEntry {
        tag_type,
        qualifier,
        permissions,
    };
    log::trace!("read entry {}", entry);
    Ok(entry)
}

/// Open descriptor used for the whole of a write sequence.
struct WriteSession {
    file: File,
    c_path: CString,
}

impl WriteSession {
    fn open(path: &Path) -> Result<WriteSession, NativeError> {
        let (file, c_path) = open(path)?;
        Ok(WriteSession { file, c_path })
    }

    /// The ACL is built and validated before anything on disk changes.
    fn apply(
        self,
        kind: AclKind,
        base: &BaseRecord,
        entries: &[AclEntry],
    ) -> Result<(), NativeError> {
        let raw = unsafe { acl_init(entries.len() as i32) };
        let mut acl = AclHandle::new(raw, NativeOp::InitAcl)?;
        for entry in entries {
            encode_entry(&mut acl, entry)?;
        }
        check_return(unsafe { acl_valid(acl.as_raw()) }, NativeOp::ValidateAcl)?;

        if kind == AclKind::Access {
            self.apply_owner_and_mode(base)?;
        }

        let ret = match kind {
            AclKind::Access => unsafe { acl_set_fd(self.file.as_raw_fd(), acl.as_raw()) },
            AclKind::Default => unsafe {
                acl_set_file(self.c_path.as_ptr(), ACL_TYPE_DEFAULT, acl.as_raw())
            },
        };
        check_return(ret, NativeOp::SetAcl)
    }

    /// `fchown` only the ids that differ, then `fchmod`.
    fn apply_owner_and_mode(&self, base: &BaseRecord) -> Result<(), NativeError> {
        let meta = fstat(&self.file)?;
        let owner = Some(base.owner()).filter(|&uid| uid != meta.uid());
        let group = Some(base.group()).filter(|&gid| gid != meta.gid());
        if owner.is_some() || group.is_some() {
            fchown(&self.file, owner, group)
                .map_err(|err| NativeError::from_io(NativeOp::Chown, &err))?;
        }
        self.file
            .set_permissions(fs::Permissions::from_mode(base.mode()))
            .map_err(|err| NativeError::from_io(NativeOp::Chmod, &err))
    }
}

fn encode_entry(acl: &mut AclHandle, entry: &AclEntry) -> Result<(), NativeError> {
    log::trace!("write entry {}", entry);
    let mut raw: acl_entry_t = null_mut();
    check_return(
        unsafe { acl_create_entry(acl.as_mut_ptr(), &mut raw) },
        NativeOp::CreateEntry,
    )?;
    check_return(
        unsafe { acl_set_tag_type(raw, entry.tag_type.to_raw()) },
        NativeOp::SetTagType,
    )?;
    if entry.tag_type.has_qualifier() {
        let id = entry.id();
        check_return(
            unsafe { acl_set_qualifier(raw, &id as *const u32 as *const c_void) },
            NativeOp::SetQualifier,
        )?;
    }

    // The permset is a reference into the entry, changes to it need not be written back.
    let mut permset: acl_permset_t = null_mut();
    check_return(
        unsafe { acl_get_permset(raw, &mut permset) },
        NativeOp::GetPermset,
    )?;
    check_return(unsafe { acl_clear_perms(permset) }, NativeOp::ClearPerms)?;
    for (perm, bit) in PERM_BITS.iter() {
        if entry.permissions.contains(*perm) {
            check_return(unsafe { acl_add_perm(permset, *bit) }, NativeOp::AddPerm)?;
        }
    }
    Ok(())
}
