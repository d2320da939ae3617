#![allow(unsafe_code)]

use std::ffi::{CStr, CString};
use std::io;

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        mod linux;
        pub use self::linux::hardware_addr;
    } else {
        pub fn hardware_addr(_name: &str) -> io::Result<[u8; 6]> {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "hardware address lookup is not supported on this platform",
            ))
        }
    }
}

fn c_name(name: &str) -> io::Result<CString> {
    CString::new(name).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "interface name contains NUL"))
}

/// Look up the index of the interface called `name`.
pub fn if_nametoindex(name: &str) -> io::Result<u32> {
    let name = c_name(name)?;
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    if index == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(index)
}

/// Names of every interface on the system, in index order.
pub fn interface_names() -> io::Result<Vec<String>> {
    let list = unsafe { libc::if_nameindex() };
    if list.is_null() {
        return Err(io::Error::last_os_error());
    }

    let mut names = Vec::new();
    let mut entry = list;
    unsafe {
        while (*entry).if_index != 0 && !(*entry).if_name.is_null() {
            names.push(CStr::from_ptr((*entry).if_name).to_string_lossy().into_owned());
            entry = entry.add(1);
        }
        libc::if_freenameindex(list);
    }
    Ok(names)
}

/// The host name of this machine, if it has one.
pub fn hostname() -> Option<String> {
    let mut buf = [0 as libc::c_char; 256];
    let res = unsafe { libc::gethostname(buf.as_mut_ptr(), buf.len() - 1) };
    if res != 0 {
        return None;
    }
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unknown_interface() {
        assert!(if_nametoindex("no-such-if0").is_err());
        assert!(if_nametoindex("bad\0name").is_err());
    }

    #[test]
    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn test_loopback_listed() {
        let names = interface_names().unwrap();
        assert!(names.iter().any(|n| n == "lo"));
        assert!(if_nametoindex("lo").unwrap() > 0);
    }
}
