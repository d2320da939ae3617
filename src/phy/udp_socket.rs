use std::io;
use std::net::{Ipv6Addr, SocketAddrV6};

use socket2::{Domain, Protocol, Socket, Type};

use crate::iface::Interface;
use crate::phy::Transport;
use crate::time::Duration;
use crate::wire::{ALL_DHCP_RELAY_AGENTS_AND_SERVERS, DHCPV6_CLIENT_PORT, DHCPV6_SERVER_PORT};

/// A UDP socket on the DHCPv6 client port, bound to one interface.
#[derive(Debug)]
pub struct UdpSocket {
    socket: std::net::UdpSocket,
    destination: SocketAddrV6,
}

impl UdpSocket {
    /// Open and bind the client port on `iface`.
    ///
    /// Binding to the device needs `CAP_NET_RAW` on Linux; without it the
    /// socket stays bound to every interface and the scope id alone selects
    /// the outgoing one.
    pub fn new(iface: &Interface) -> io::Result<UdpSocket> {
        let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_only_v6(true)?;
        socket.set_reuse_address(true)?;

        #[cfg(any(target_os = "linux", target_os = "android"))]
        if let Err(err) = socket.bind_device(Some(iface.name().as_bytes())) {
            net_debug!("DHCPv6 cannot bind to device {}: {}", iface.name(), err);
        }

        let local = SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, DHCPV6_CLIENT_PORT, 0, 0);
        socket.bind(&local.into())?;

        let destination = SocketAddrV6::new(
            ALL_DHCP_RELAY_AGENTS_AND_SERVERS,
            DHCPV6_SERVER_PORT,
            0,
            iface.index(),
        );
        Ok(UdpSocket {
            socket: socket.into(),
            destination,
        })
    }
}

impl Transport for UdpSocket {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        #[cfg(feature = "verbose")]
        net_trace!("DHCPv6 tx {:02x?}", payload);
        self.socket.send_to(payload, self.destination)?;
        Ok(())
    }

    fn recv(&mut self, buffer: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        // a zero read timeout means "block forever"
        let timeout = timeout.total_millis().max(1);
        self.socket
            .set_read_timeout(Some(core::time::Duration::from_millis(timeout)))?;
        match self.socket.recv_from(buffer) {
            Ok((len, _from)) => {
                #[cfg(feature = "verbose")]
                net_trace!("DHCPv6 rx from {}: {:02x?}", _from, &buffer[..len]);
                Ok(Some(len))
            }
            Err(err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.kind() == io::ErrorKind::TimedOut
                    || err.kind() == io::ErrorKind::Interrupted =>
            {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
