/*! Network interface logic.

The `iface` module identifies the interface a client runs on (name, index,
link-layer address) and defines the [Configurator] through which committed
leases are applied to the host's network stack.

[Configurator]: trait.Configurator.html
*/

use core::fmt;
use std::io;
use std::net::Ipv6Addr;

/// The interface a client is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    name: String,
    index: u32,
    hardware_addr: [u8; 6],
}

impl Interface {
    pub fn new(name: &str, index: u32, hardware_addr: [u8; 6]) -> Interface {
        Interface {
            name: name.to_owned(),
            index,
            hardware_addr,
        }
    }

    /// Look up `name` on this host.
    ///
    /// An interface without a link-layer address (a tunnel, or one whose
    /// address reads as all zero) borrows the first non-zero address of
    /// any other interface, so the client still gets a stable DUID.
    #[cfg(feature = "phy-udp_socket")]
    pub fn lookup(name: &str) -> io::Result<Interface> {
        use crate::phy::sys;

        let index = sys::if_nametoindex(name)?;
        let mut hardware_addr = sys::hardware_addr(name).unwrap_or([0; 6]);
        if hardware_addr == [0; 6] {
            net_debug!("{} has no hardware address, scanning other interfaces", name);
            for other in sys::interface_names()?.iter().filter(|n| *n != name) {
                match sys::hardware_addr(other) {
                    Ok(addr) if addr != [0; 6] => {
                        hardware_addr = addr;
                        break;
                    }
                    _ => continue,
                }
            }
        }

        Ok(Interface::new(name, index, hardware_addr))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn hardware_addr(&self) -> [u8; 6] {
        self.hardware_addr
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.index)
    }
}

/// Applies committed lease data to the host's network stack.
///
/// Failures are logged by the caller and never stop the client.
pub trait Configurator: Send {
    /// Add an address (or a delegated prefix) to the interface.
    fn set_address(&mut self, addr: Ipv6Addr, prefix_len: u8) -> io::Result<()>;

    fn set_netmask(&mut self, netmask: Ipv6Addr) -> io::Result<()>;

    /// Register a DNS resolver.
    fn set_dns_server(&mut self, addr: Ipv6Addr) -> io::Result<()>;

    /// Called for every address lost when a lease ends.
    fn remove_address(&mut self, _addr: Ipv6Addr) -> io::Result<()> {
        Ok(())
    }
}

/// The netmask of a `prefix_len` bit prefix.
pub fn prefix_to_netmask(prefix_len: u8) -> Ipv6Addr {
    let bits = match prefix_len {
        0 => 0,
        len if len >= 128 => u128::MAX,
        len => u128::MAX << (128 - len as u32),
    };
    Ipv6Addr::from(bits)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_prefix_to_netmask() {
        assert_eq!(prefix_to_netmask(0), Ipv6Addr::UNSPECIFIED);
        assert_eq!(prefix_to_netmask(64), "ffff:ffff:ffff:ffff::".parse::<Ipv6Addr>().unwrap());
        assert_eq!(prefix_to_netmask(56), "ffff:ffff:ffff:ff00::".parse::<Ipv6Addr>().unwrap());
        assert_eq!(prefix_to_netmask(128), Ipv6Addr::from(u128::MAX));
        assert_eq!(prefix_to_netmask(200), Ipv6Addr::from(u128::MAX));
    }

    #[test]
    fn test_interface_display() {
        let iface = Interface::new("eth0", 2, [2, 0, 0, 0, 0, 1]);
        assert_eq!(iface.to_string(), "eth0#2");
        assert_eq!(iface.hardware_addr(), [2, 0, 0, 0, 0, 1]);
    }

    #[test]
    #[cfg(all(feature = "phy-udp_socket", any(target_os = "linux", target_os = "android")))]
    fn test_lookup_unknown_interface() {
        assert!(Interface::lookup("no-such-if0").is_err());
    }
}
