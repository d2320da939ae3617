use std::io;

#[repr(C)]
#[derive(Debug)]
struct ifreq_hwaddr {
    ifr_name: [libc::c_char; libc::IF_NAMESIZE],
    ifr_hwaddr: libc::sockaddr,
    // the kernel's ifreq union is 24 bytes wide
    _pad: [u8; 8],
}

fn ifreq_for(name: &str) -> io::Result<ifreq_hwaddr> {
    if name.len() >= libc::IF_NAMESIZE {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "interface name too long"));
    }
    let mut ifreq = ifreq_hwaddr {
        ifr_name: [0; libc::IF_NAMESIZE],
        ifr_hwaddr: unsafe { core::mem::zeroed() },
        _pad: [0; 8],
    };
    for (i, byte) in name.as_bytes().iter().enumerate() {
        ifreq.ifr_name[i] = *byte as libc::c_char
    }
    Ok(ifreq)
}

/// Read the link-layer address of the interface called `name`.
pub fn hardware_addr(name: &str) -> io::Result<[u8; 6]> {
    let mut ifreq = ifreq_for(name)?;

    let fd = unsafe { libc::socket(libc::AF_INET6, libc::SOCK_DGRAM | libc::SOCK_CLOEXEC, 0) };
    if fd == -1 {
        return Err(io::Error::last_os_error());
    }
    let res = unsafe {
        libc::ioctl(
            fd,
            libc::SIOCGIFHWADDR as _,
            &mut ifreq as *mut ifreq_hwaddr,
        )
    };
    let err = io::Error::last_os_error();
    unsafe { libc::close(fd) };
    if res == -1 {
        return Err(err);
    }

    let mut addr = [0; 6];
    for (dst, src) in addr.iter_mut().zip(ifreq.ifr_hwaddr.sa_data.iter()) {
        *dst = *src as u8;
    }
    Ok(addr)
}
