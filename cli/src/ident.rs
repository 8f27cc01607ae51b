//! Numeric identity resolution via the system databases.
//!
//! The engine only applies numeric ids; translating the names given on the
//! command line (or in the environment) into ids happens here, using the
//! thread-safe `getpwnam_r`/`getgrnam_r` lookups.

use std::ffi::CString;
use std::mem::MaybeUninit;
use std::ptr;

/// Look up a user name and return its uid.
///
/// Returns None when the name does not exist or the lookup fails; the
/// caller decides how to fall back.
pub fn user_id(name: &str) -> Option<u32> {
    let c_name = CString::new(name).ok()?;
    let mut buffer = vec![0_u8; 4096];
    loop {
        let mut pwd = MaybeUninit::<libc::passwd>::zeroed();
        let mut result: *mut libc::passwd = ptr::null_mut();
        // SAFETY: all arguments are valid pointers for the duration of the
        // call; `buffer` is the scratch space getpwnam_r writes into.
        let errno = unsafe {
            libc::getpwnam_r(
                c_name.as_ptr(),
                pwd.as_mut_ptr(),
                buffer.as_mut_ptr() as *mut libc::c_char,
                buffer.len(),
                &mut result,
            )
        };

        if errno == 0 {
            if result.is_null() {
                return None;
            }
            // SAFETY: `result` is non-null, so getpwnam_r initialized `pwd`.
            let pwd = unsafe { pwd.assume_init() };
            return Some(pwd.pw_uid);
        }
        if errno == libc::ERANGE {
            buffer.resize(buffer.len().saturating_mul(2), 0);
            if buffer.len() > 1024 * 1024 {
                return None;
            }
            continue;
        }
        return None;
    }
}

/// Look up a group name and return its gid.
pub fn group_id(name: &str) -> Option<u32> {
    let c_name = CString::new(name).ok()?;
    let mut buffer = vec![0_u8; 4096];
    loop {
        let mut grp = MaybeUninit::<libc::group>::zeroed();
        let mut result: *mut libc::group = ptr::null_mut();
        // SAFETY: same contract as getpwnam_r above.
        let errno = unsafe {
            libc::getgrnam_r(
                c_name.as_ptr(),
                grp.as_mut_ptr(),
                buffer.as_mut_ptr() as *mut libc::c_char,
                buffer.len(),
                &mut result,
            )
        };

        if errno == 0 {
            if result.is_null() {
                return None;
            }
            // SAFETY: `result` is non-null, so getgrnam_r initialized `grp`.
            let grp = unsafe { grp.assume_init() };
            return Some(grp.gr_gid);
        }
        if errno == libc::ERANGE {
            buffer.resize(buffer.len().saturating_mul(2), 0);
            if buffer.len() > 1024 * 1024 {
                return None;
            }
            continue;
        }
        return None;
    }
}

/// Host name for the result-file header.
pub fn hostname() -> String {
    let mut buffer = vec![0_u8; 256];
    // SAFETY: the buffer is valid for the given length; gethostname
    // NUL-terminates on success.
    let rc = unsafe {
        libc::gethostname(buffer.as_mut_ptr() as *mut libc::c_char, buffer.len())
    };
    if rc != 0 {
        return String::from("unknown");
    }
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).into_owned()
}
