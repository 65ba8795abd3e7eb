use crate::error::{NativeError, NativeOp};
use crate::util::AclHandle;
use acl_sys::{acl_entry_t, acl_get_entry, ACL_FIRST_ENTRY, ACL_NEXT_ENTRY};
use std::ptr::null_mut;

/// Walks the entries of a libacl ACL. libacl keeps the cursor inside the ACL itself, so only one
/// iterator may be alive per handle; the shared borrow of the handle does not prevent that.
pub(crate) struct RawAclIterator<'a> {
    acl: &'a AclHandle,
    next: i32,
    done: bool,
}

impl<'a> RawAclIterator<'a> {
    pub(crate) fn new(acl: &'a AclHandle) -> RawAclIterator<'a> {
        RawAclIterator {
            acl,
            next: ACL_FIRST_ENTRY,
            done: false,
        }
    }
}

impl<'a> Iterator for RawAclIterator<'a> {
    type Item = Result<acl_entry_t, NativeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut entry: acl_entry_t = null_mut();
        // The returned entry is owned by the ACL itself, no need to free it.
        let ret = unsafe { acl_get_entry(self.acl.as_raw(), self.next, &mut entry) };
        match ret {
            1 => {
                self.next = ACL_NEXT_ENTRY;
                Some(Ok(entry))
            }
            0 => {
                self.done = true;
                None
            }
            _ => {
                self.done = true;
                Some(Err(NativeError::last_os_error(NativeOp::GetEntry)))
            }
        }
    }
}
