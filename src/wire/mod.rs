/*! Low-level packet access and construction.

The `wire` module deals with the packet *representation*. It provides a zero-copy
view over a DHCPv6 message buffer ([Dhcpv6Packet]), a restartable iterator over
the option records of any TLV buffer ([options]), and in-place views over the
lease records that the client keeps in wire form ([IaAddress], [IaPrefix]).

Parsing is lenient where the protocol engine needs it to be: an option whose
declared length runs past the end of the buffer ends the iteration instead of
failing the whole message.

[Dhcpv6Packet]: dhcpv6/struct.Packet.html
[options]: dhcpv6/fn.options.html
[IaAddress]: dhcpv6/struct.IaAddress.html
[IaPrefix]: dhcpv6/struct.IaPrefix.html
*/

mod field {
    pub type Field = ::core::ops::Range<usize>;
    pub type Rest = ::core::ops::RangeFrom<usize>;
}

pub mod dhcpv6;

use core::fmt;

pub use self::dhcpv6::{
    client_id_option, options, parse_options, Dhcpv6Option, Dhcpv6OptionWriter, IaAddrRepr,
    IaAddress, IaHeader, IaPrefix, IaPrefixRepr, MessageType as Dhcpv6MessageType, OptionRecord,
    Packet as Dhcpv6Packet, StatusCode as Dhcpv6StatusCode,
    ALL_DHCP_RELAY_AGENTS_AND_SERVERS, CLIENT_PORT as DHCPV6_CLIENT_PORT,
    SERVER_PORT as DHCPV6_SERVER_PORT,
};

/// Parsing a packet failed.
///
/// Either it is malformed, or it is not supported by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error;

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "wire::Error")
    }
}

pub type Result<T> = core::result::Result<T, Error>;
