/*! Access to the network.

The `phy` module provides the [Transport] trait through which a client
exchanges DHCPv6 datagrams, and an implementation backed by a UDP socket
bound to one interface.

A client sends every message to `ff02::1:2` port 547 on its interface and
receives replies on port 546. A [Transport] only moves datagrams; matching
replies to requests is done by the caller.

[Transport]: trait.Transport.html
*/

use std::io;

use crate::time::Duration;

#[cfg(feature = "phy-udp_socket")]
pub(crate) mod sys;

#[cfg(feature = "phy-udp_socket")]
mod udp_socket;

#[cfg(feature = "phy-udp_socket")]
pub use self::udp_socket::UdpSocket;

/// A datagram link to the DHCPv6 servers of one interface.
pub trait Transport: Send {
    /// Send one message to All_DHCP_Relay_Agents_and_Servers.
    fn send(&mut self, payload: &[u8]) -> io::Result<()>;

    /// Wait at most `timeout` for one datagram.
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    fn recv(&mut self, buffer: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        (**self).send(payload)
    }

    fn recv(&mut self, buffer: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        (**self).recv(buffer, timeout)
    }
}
