use crate::RuntimeError;
use std::ffi::{CStr, CString};
use tracing::debug;

const INITIAL_BUF_LEN: usize = 1024;
const MAX_BUF_LEN: usize = 1 << 20;

/// Lookup of UNIX group ids by group name.
pub trait GroupLookup {
    fn group_id(&self, name: &str) -> Result<u32, RuntimeError>;
}

/// The host group database. Every call is a fresh lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGroups;

impl GroupLookup for SystemGroups {
    fn group_id(&self, name: &str) -> Result<u32, RuntimeError> {
        resolve_group_id(name)
    }
}

/// Resolve a group name to its gid through `getgrnam_r`.
pub fn resolve_group_id(name: &str) -> Result<u32, RuntimeError> {
    let Ok(c_name) = CString::new(name) else {
        return Err(RuntimeError::GroupNotFound(name.to_owned()));
    };
    match getgrnam_gid(&c_name)? {
        Some(gid) => {
            debug!("group '{name}' has gid {gid}");
            Ok(gid)
        }
        None => Err(RuntimeError::GroupNotFound(name.to_owned())),
    }
}

/// Safe wrapper around libc::getgrnam_r().
#[allow(unsafe_code)]
fn getgrnam_gid(name: &CStr) -> Result<Option<u32>, std::io::Error> {
    let mut buf_len = INITIAL_BUF_LEN;
    loop {
        let mut buf: Vec<libc::c_char> = vec![0; buf_len];
        // SAFETY: `group` is plain old data (pointers and integers); an
        // all-zero value is valid and is overwritten by getgrnam_r on success.
        let mut group: libc::group = unsafe { std::mem::zeroed() };
        let mut result: *mut libc::group = std::ptr::null_mut();

        // SAFETY: all pointers are valid for the duration of the call, `buf`
        // is writable for `buf.len()` bytes, and `name` is NUL-terminated.
        let rc = unsafe {
            libc::getgrnam_r(
                name.as_ptr(),
                &mut group,
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
            )
        };

        if rc == libc::ERANGE && buf_len < MAX_BUF_LEN {
            buf_len *= 2;
            continue;
        }
        return match rc {
            0 if result.is_null() => Ok(None),
            0 => Ok(Some(group.gr_gid)),
            // Several libcs report "no such group" through these codes.
            libc::ENOENT | libc::ESRCH | libc::EBADF | libc::EPERM => Ok(None),
            code => Err(std::io::Error::from_raw_os_error(code)),
        };
    }
}
