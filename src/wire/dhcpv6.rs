// See https://datatracker.ietf.org/doc/html/rfc8415 for the DHCPv6 specification.

use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;
use core::ops::Range;
use std::net::Ipv6Addr;

use super::{Error, Result};

pub const SERVER_PORT: u16 = 547;
pub const CLIENT_PORT: u16 = 546;

/// The All_DHCP_Relay_Agents_and_Servers link-scoped multicast group.
pub const ALL_DHCP_RELAY_AGENTS_AND_SERVERS: Ipv6Addr =
    Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0x0001, 0x0002);

/// Longest server DUID a client keeps.
pub const MAX_DUID_LEN: usize = 130;
/// Identity association id used for both the IA_NA and the IA_PD.
pub const IAID: u32 = 1;
/// Lifetime and timer value meaning "infinity".
pub const INFINITY: u32 = u32::MAX;

/// Size of an option header (code + length).
pub const OPTION_HEADER_LEN: usize = 4;

enum_with_unknown! {
    /// The possible message types of a DHCP packet.
    pub enum MessageType(u8) {
        Solicit = 1,
        Advertise = 2,
        Request = 3,
        Confirm = 4,
        Renew = 5,
        Rebind = 6,
        Reply = 7,
        Release = 8,
        Decline = 9,
        Reconfigure = 10,
        InformationRequest = 11,
        RelayForw = 12,
        RelayRepl = 13,
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Solicit => write!(f, "solicit"),
            Self::Advertise => write!(f, "advertise"),
            Self::Request => write!(f, "request"),
            Self::Confirm => write!(f, "confirm"),
            Self::Renew => write!(f, "renew"),
            Self::Rebind => write!(f, "rebind"),
            Self::Reply => write!(f, "reply"),
            Self::Release => write!(f, "release"),
            Self::Decline => write!(f, "decline"),
            Self::Reconfigure => write!(f, "reconfigure"),
            Self::InformationRequest => write!(f, "information-request"),
            Self::RelayForw => write!(f, "relay-forw"),
            Self::RelayRepl => write!(f, "relay-repl"),
            Self::Unknown(a) => write!(f, "unknown({a})"),
        }
    }
}

enum_with_unknown! {
    pub enum StatusCode(u16) {
        Success = 0,
        UnspecFail = 1,
        NoAddrsAvail = 2,
        NoBinding = 3,
        NotOnLink = 4,
        UseMulticast = 5,
        NoPrefixAvail = 6
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::Success => write!(f, "success"),
            Self::UnspecFail => write!(f, "unspec-fail"),
            Self::NoAddrsAvail => write!(f, "no-addrs-avail"),
            Self::NoBinding => write!(f, "no-binding"),
            Self::NotOnLink => write!(f, "not-on-link"),
            Self::UseMulticast => write!(f, "use-multicast"),
            Self::NoPrefixAvail => write!(f, "no-prefix-avail"),
            Self::Unknown(a) => write!(f, "unknown({a})"),
        }
    }
}

impl StatusCode {
    /// Read the code at the start of a STATUS_CODE option's data.
    pub fn from_option(data: &[u8]) -> Option<StatusCode> {
        if data.len() < 2 {
            return None;
        }
        Some(StatusCode::from(NetworkEndian::read_u16(data)))
    }
}

pub mod field {
    #![allow(non_snake_case)]
    #![allow(unused)]

    use crate::wire::field::*;

    pub const MTYPE: usize = 0;
    pub const XID: Field = 1..4;
    pub const OPTIONS: Rest = 4..;

    // Every option, at any nesting level, has the same header:
    //
    //     0                   1                   2                   3
    //     0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |          option-code          |           option-len          |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |                          option-data                          |
    //    |                      (option-len octets)                      |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const OPT_CODE: Field = 0..2;
    pub const OPT_LEN: Field = 2..4;
    pub const OPT_DATA: Rest = 4..;

    pub const OPT_CLIENTID: u16 = 1;
    pub const OPT_SERVERID: u16 = 2;

    // IA_NA and IA_PD share the same 12 byte header, followed by the
    // encapsulated IA_ADDR / IA_PREFIX / STATUS_CODE options:
    //
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |          OPTION_IA_NA         |          option-len           |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |                        IAID (4 octets)                        |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |                              T1                               |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |                              T2                               |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    .                         IA_NA-options                         .
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const OPT_IA_NA: u16 = 3;
    pub const OPT_IA_PD: u16 = 25;
    pub const IA_IAID: Field = 0..4;
    pub const IA_T1: Field = 4..8;
    pub const IA_T2: Field = 8..12;
    pub const IA_OPTIONS: Rest = 12..;

    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |          OPTION_IAADDR        |          option-len           |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |                 IPv6-address (16 octets)                      |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |                      preferred-lifetime                       |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |                        valid-lifetime                         |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    .                        IAaddr-options                         .
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const OPT_IAADDR: u16 = 5;
    pub const IAADDR_ADDRESS: Field = 0..16;
    pub const IAADDR_PREFERRED: Field = 16..20;
    pub const IAADDR_VALID: Field = 20..24;
    pub const IAADDR_LEN: usize = 24;

    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |        OPTION_IAPREFIX        |          option-len           |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |                      preferred-lifetime                       |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |                        valid-lifetime                         |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    | prefix-length |                                               |
    //    +-+-+-+-+-+-+-+-+          IPv6-prefix                          |
    //    |                           (16 octets)                         |
    //    |               +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |               |                                               .
    //    +-+-+-+-+-+-+-+-+                                               .
    //    .                       IAprefix-options                        .
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const OPT_IAPREFIX: u16 = 26;
    pub const IAPREFIX_PREFERRED: Field = 0..4;
    pub const IAPREFIX_VALID: Field = 4..8;
    pub const IAPREFIX_PREFIX_LEN: usize = 8;
    pub const IAPREFIX_PREFIX: Field = 9..25;
    pub const IAPREFIX_LEN: usize = 25;

    pub const OPT_ORO: u16 = 6;
    pub const OPT_PREFERENCE: u16 = 7;
    /// Hundredths of a second since the start of the exchange.
    pub const OPT_ELAPSED_TIME: u16 = 8;
    pub const OPT_RELAY_MSG: u16 = 9;
    pub const OPT_AUTH: u16 = 11;
    pub const OPT_UNICAST: u16 = 12;

    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |       OPTION_STATUS_CODE      |         option-len            |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |          status-code          |                               |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               |
    //    .                        status-message                         .
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const OPT_STATUS_CODE: u16 = 13;
    pub const OPT_RAPID_COMMIT: u16 = 14;
    pub const OPT_USER_CLASS: u16 = 15;
    pub const OPT_VENDOR_CLASS: u16 = 16;
    pub const OPT_VENDOR_OPTS: u16 = 17;
    pub const OPT_INTERFACE_ID: u16 = 18;
    /// One byte message type the server wants the client to send.
    pub const OPT_RECONF_MSG: u16 = 19;
    pub const OPT_RECONF_ACCEPT: u16 = 20;
    pub const OPT_SIP_SERVER_D: u16 = 21;
    pub const OPT_SIP_SERVER_A: u16 = 22;
    pub const OPT_DNS_SERVERS: u16 = 23;
    pub const OPT_DOMAIN_LIST: u16 = 24;
    pub const OPT_INFORMATION_REFRESH_TIME: u16 = 32;

    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |          OPTION_FQDN          |         option-len            |
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //    |   flags       |                                               |
    //    +-+-+-+-+-+-+-+-+                                               |
    //    .                          domain-name                          .
    //    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const OPT_FQDN: u16 = 39;

    // The NTP server option encapsulates one sub-option per server.
    pub const OPT_NTP_SERVER: u16 = 56;
    pub const NTP_SUBOPTION_SRV_ADDR: u16 = 1;
    pub const NTP_SUBOPTION_MC_ADDR: u16 = 2;
    pub const NTP_SUBOPTION_SRV_FQDN: u16 = 3;
}

/// A representation of a single DHCP option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Dhcpv6Option<'a> {
    pub kind: u16,
    pub data: &'a [u8],
}

/// Position of one option record inside a buffer.
///
/// This is a view by offset: it stays meaningful only until the buffer
/// it was produced from is mutated.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct OptionRecord {
    pub kind: u16,
    pub len: u16,
    /// Offset of the option header.
    pub offset: usize,
}

impl OptionRecord {
    /// Byte range of the option data.
    pub fn value(&self) -> Range<usize> {
        let start = self.offset + OPTION_HEADER_LEN;
        start..start + self.len as usize
    }

    /// Byte range of the whole record, header included.
    pub fn span(&self) -> Range<usize> {
        self.offset..self.value().end
    }

    pub fn data<'b>(&self, buffer: &'b [u8]) -> &'b [u8] {
        &buffer[self.value()]
    }
}

/// Iterator over the option records of a TLV buffer.
///
/// Iteration ends, without an error, at the first record whose declared
/// length would run past the end of the buffer.
#[derive(Debug, Clone)]
pub struct Options<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for Options<'a> {
    type Item = OptionRecord;

    fn next(&mut self) -> Option<OptionRecord> {
        let rest = self.buffer.get(self.offset..)?;
        if rest.len() < OPTION_HEADER_LEN {
            return None;
        }

        let kind = NetworkEndian::read_u16(&rest[field::OPT_CODE]);
        let len = NetworkEndian::read_u16(&rest[field::OPT_LEN]);
        if rest.len() < OPTION_HEADER_LEN + len as usize {
            self.offset = self.buffer.len();
            return None;
        }

        let record = OptionRecord {
            kind,
            len,
            offset: self.offset,
        };
        self.offset = record.span().end;
        Some(record)
    }
}

/// Return an iterator over the option records of `buffer`.
#[inline]
pub fn options(buffer: &[u8]) -> Options<'_> {
    Options { buffer, offset: 0 }
}

/// Return an iterator over the options.
#[inline]
pub fn parse_options(buf: &[u8]) -> impl Iterator<Item = Dhcpv6Option<'_>> + '_ {
    options(buf).map(move |record| Dhcpv6Option {
        kind: record.kind,
        data: record.data(buf),
    })
}

/// Appends options to a growable message buffer.
#[derive(Debug)]
pub struct Dhcpv6OptionWriter<'a> {
    buffer: &'a mut Vec<u8>,
}

impl<'a> Dhcpv6OptionWriter<'a> {
    pub fn new(buffer: &'a mut Vec<u8>) -> Self {
        Self { buffer }
    }

    /// Emit a [`Dhcpv6Option`].
    pub fn emit(&mut self, option: Dhcpv6Option<'_>) -> Result<()> {
        if option.data.len() > u16::MAX as usize {
            return Err(Error);
        }

        let mut header = [0; OPTION_HEADER_LEN];
        NetworkEndian::write_u16(&mut header[field::OPT_CODE], option.kind);
        NetworkEndian::write_u16(&mut header[field::OPT_LEN], option.data.len() as u16);
        self.buffer.extend_from_slice(&header);
        self.buffer.extend_from_slice(option.data);
        Ok(())
    }

    /// Append already encoded option records verbatim.
    pub fn emit_raw(&mut self, records: &[u8]) {
        self.buffer.extend_from_slice(records)
    }

    /// Start an option whose data is appended afterwards. Returns the
    /// mark to hand to [`finish`](#method.finish).
    pub fn begin(&mut self, kind: u16) -> usize {
        let mark = self.buffer.len();
        let mut header = [0; OPTION_HEADER_LEN];
        NetworkEndian::write_u16(&mut header[field::OPT_CODE], kind);
        self.buffer.extend_from_slice(&header);
        mark
    }

    /// Patch the length of an option started with [`begin`](#method.begin).
    pub fn finish(&mut self, mark: usize) -> Result<()> {
        let len = self.buffer.len() - mark - OPTION_HEADER_LEN;
        if len > u16::MAX as usize {
            return Err(Error);
        }
        let header = &mut self.buffer[mark..mark + OPTION_HEADER_LEN];
        NetworkEndian::write_u16(&mut header[field::OPT_LEN], len as u16);
        Ok(())
    }

    /// Append raw bytes to the option started last.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data)
    }
}

/// A read/write wrapper around a Dynamic Host Configuration Protocol packet buffer.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Imbue a raw octet buffer with DHCP packet structure.
    pub const fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error)` if the buffer is too short.
    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if len < field::OPTIONS.start {
            Err(Error)
        } else {
            Ok(())
        }
    }

    /// Consume the packet, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Returns the message type.
    pub fn message_type(&self) -> MessageType {
        MessageType::from(self.buffer.as_ref()[field::MTYPE])
    }

    /// Returns the transaction ID.
    ///
    /// The transaction ID is a random 24 bit number chosen by the client
    /// to associate responses with the request they answer.
    pub fn transaction_id(&self) -> u32 {
        let field = &self.buffer.as_ref()[field::XID];
        NetworkEndian::read_u24(field)
    }

    /// Return the encoded options that follow the header.
    #[inline]
    pub fn options_bytes(&self) -> &[u8] {
        &self.buffer.as_ref()[field::OPTIONS]
    }

    /// Return an iterator over the options.
    #[inline]
    pub fn options(&self) -> impl Iterator<Item = Dhcpv6Option<'_>> + '_ {
        parse_options(self.options_bytes())
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Sets the message type.
    pub fn set_message_type(&mut self, value: MessageType) {
        let field = &mut self.buffer.as_mut()[field::MTYPE];
        *field = value.into();
    }

    /// Sets the transaction ID. Only the low 24 bits are kept.
    pub fn set_transaction_id(&mut self, value: u32) {
        let field = &mut self.buffer.as_mut()[field::XID];
        NetworkEndian::write_u24(field, value & 0x00ff_ffff)
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> fmt::Display for Packet<&'a T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "DHCPv6 {} xid={:06x}",
            self.message_type(),
            self.transaction_id()
        )?;
        for option in self.options() {
            write!(f, " opt{}[{}]", option.kind, option.data.len())?;
        }
        Ok(())
    }
}

/// The fixed part of an IA_NA or IA_PD option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct IaHeader {
    pub iaid: u32,
    pub t1: u32,
    pub t2: u32,
}

impl IaHeader {
    pub const LEN: usize = 12;

    /// Parse the header at the start of the IA option data.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::LEN {
            return Err(Error);
        }
        Ok(Self {
            iaid: NetworkEndian::read_u32(&data[field::IA_IAID]),
            t1: NetworkEndian::read_u32(&data[field::IA_T1]),
            t2: NetworkEndian::read_u32(&data[field::IA_T2]),
        })
    }

    pub fn emit(&self, data: &mut [u8]) {
        NetworkEndian::write_u32(&mut data[field::IA_IAID], self.iaid);
        NetworkEndian::write_u32(&mut data[field::IA_T1], self.t1);
        NetworkEndian::write_u32(&mut data[field::IA_T2], self.t2);
    }
}

impl fmt::Display for IaHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "iaid={} t1={} t2={}", self.iaid, self.t1, self.t2)
    }
}

fn check_record(buffer: &[u8], kind: u16, min_len: usize) -> Result<()> {
    if buffer.len() < OPTION_HEADER_LEN + min_len {
        return Err(Error);
    }
    let declared = NetworkEndian::read_u16(&buffer[field::OPT_LEN]) as usize;
    if NetworkEndian::read_u16(&buffer[field::OPT_CODE]) != kind || declared < min_len {
        return Err(Error);
    }
    Ok(())
}

/// A read/write wrapper around a complete IA_ADDR option, header included.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct IaAddress<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> IaAddress<T> {
    /// Length of a record carrying no IAaddr-options.
    pub const RECORD_LEN: usize = OPTION_HEADER_LEN + field::IAADDR_LEN;

    pub const fn new_unchecked(buffer: T) -> IaAddress<T> {
        IaAddress { buffer }
    }

    /// Wrap `buffer` after checking that it holds an IA_ADDR record
    /// long enough for every accessor.
    pub fn new_checked(buffer: T) -> Result<IaAddress<T>> {
        check_record(buffer.as_ref(), field::OPT_IAADDR, field::IAADDR_LEN)?;
        Ok(Self::new_unchecked(buffer))
    }

    fn data(&self) -> &[u8] {
        &self.buffer.as_ref()[field::OPT_DATA]
    }

    pub fn address(&self) -> Ipv6Addr {
        let mut octets = [0; 16];
        octets.copy_from_slice(&self.data()[field::IAADDR_ADDRESS]);
        Ipv6Addr::from(octets)
    }

    pub fn preferred_lifetime(&self) -> u32 {
        NetworkEndian::read_u32(&self.data()[field::IAADDR_PREFERRED])
    }

    pub fn valid_lifetime(&self) -> u32 {
        NetworkEndian::read_u32(&self.data()[field::IAADDR_VALID])
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> IaAddress<T> {
    fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[field::OPT_DATA]
    }

    pub fn set_preferred_lifetime(&mut self, value: u32) {
        NetworkEndian::write_u32(&mut self.data_mut()[field::IAADDR_PREFERRED], value)
    }

    pub fn set_valid_lifetime(&mut self, value: u32) {
        NetworkEndian::write_u32(&mut self.data_mut()[field::IAADDR_VALID], value)
    }
}

/// A read/write wrapper around a complete IA_PREFIX option, header included.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct IaPrefix<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> IaPrefix<T> {
    /// Length of a record carrying no IAprefix-options.
    pub const RECORD_LEN: usize = OPTION_HEADER_LEN + field::IAPREFIX_LEN;

    pub const fn new_unchecked(buffer: T) -> IaPrefix<T> {
        IaPrefix { buffer }
    }

    /// Wrap `buffer` after checking that it holds an IA_PREFIX record
    /// long enough for every accessor.
    pub fn new_checked(buffer: T) -> Result<IaPrefix<T>> {
        check_record(buffer.as_ref(), field::OPT_IAPREFIX, field::IAPREFIX_LEN)?;
        Ok(Self::new_unchecked(buffer))
    }

    fn data(&self) -> &[u8] {
        &self.buffer.as_ref()[field::OPT_DATA]
    }

    pub fn preferred_lifetime(&self) -> u32 {
        NetworkEndian::read_u32(&self.data()[field::IAPREFIX_PREFERRED])
    }

    pub fn valid_lifetime(&self) -> u32 {
        NetworkEndian::read_u32(&self.data()[field::IAPREFIX_VALID])
    }

    pub fn prefix_len(&self) -> u8 {
        self.data()[field::IAPREFIX_PREFIX_LEN]
    }

    pub fn prefix(&self) -> Ipv6Addr {
        let mut octets = [0; 16];
        octets.copy_from_slice(&self.data()[field::IAPREFIX_PREFIX]);
        Ipv6Addr::from(octets)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> IaPrefix<T> {
    fn data_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[field::OPT_DATA]
    }

    pub fn set_preferred_lifetime(&mut self, value: u32) {
        NetworkEndian::write_u32(&mut self.data_mut()[field::IAPREFIX_PREFERRED], value)
    }

    pub fn set_valid_lifetime(&mut self, value: u32) {
        NetworkEndian::write_u32(&mut self.data_mut()[field::IAPREFIX_VALID], value)
    }
}

/// Read the (preferred, valid) lifetimes of an IA_ADDR or IA_PREFIX record.
pub fn lease_lifetimes(record: &[u8]) -> Result<(u32, u32)> {
    if let Ok(addr) = IaAddress::new_checked(record) {
        return Ok((addr.preferred_lifetime(), addr.valid_lifetime()));
    }
    let prefix = IaPrefix::new_checked(record)?;
    Ok((prefix.preferred_lifetime(), prefix.valid_lifetime()))
}

/// Rewrite the lifetimes of an IA_ADDR or IA_PREFIX record in place.
///
/// The record shape is validated before anything is written.
pub fn patch_lease_lifetimes(record: &mut [u8], preferred: u32, valid: u32) -> Result<()> {
    if IaAddress::new_checked(&*record).is_ok() {
        let mut addr = IaAddress::new_unchecked(record);
        addr.set_preferred_lifetime(preferred);
        addr.set_valid_lifetime(valid);
        return Ok(());
    }
    let mut prefix = IaPrefix::new_checked(record)?;
    prefix.set_preferred_lifetime(preferred);
    prefix.set_valid_lifetime(valid);
    Ok(())
}

/// A high-level representation of an IA_ADDR record.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct IaAddrRepr {
    pub address: Ipv6Addr,
    pub preferred_lifetime: u32,
    pub valid_lifetime: u32,
}

impl IaAddrRepr {
    pub fn parse<T: AsRef<[u8]>>(record: &IaAddress<T>) -> Result<Self> {
        Ok(Self {
            address: record.address(),
            preferred_lifetime: record.preferred_lifetime(),
            valid_lifetime: record.valid_lifetime(),
        })
    }

    pub const fn buffer_len(&self) -> usize {
        IaAddress::<&[u8]>::RECORD_LEN
    }

    /// Emit a full record into the first `buffer_len()` bytes of `buffer`.
    pub fn emit(&self, buffer: &mut [u8]) -> Result<()> {
        let buffer = buffer.get_mut(..self.buffer_len()).ok_or(Error)?;
        NetworkEndian::write_u16(&mut buffer[field::OPT_CODE], field::OPT_IAADDR);
        NetworkEndian::write_u16(&mut buffer[field::OPT_LEN], field::IAADDR_LEN as u16);
        buffer[OPTION_HEADER_LEN..][field::IAADDR_ADDRESS].copy_from_slice(&self.address.octets());
        let mut record = IaAddress::new_unchecked(buffer);
        record.set_preferred_lifetime(self.preferred_lifetime);
        record.set_valid_lifetime(self.valid_lifetime);
        Ok(())
    }
}

impl fmt::Display for IaAddrRepr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}(preferred-lifetime={} valid-lifetime={})",
            self.address, self.preferred_lifetime, self.valid_lifetime
        )
    }
}

/// A high-level representation of an IA_PREFIX record.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct IaPrefixRepr {
    pub prefix: Ipv6Addr,
    pub prefix_len: u8,
    pub preferred_lifetime: u32,
    pub valid_lifetime: u32,
}

impl IaPrefixRepr {
    pub fn parse<T: AsRef<[u8]>>(record: &IaPrefix<T>) -> Result<Self> {
        Ok(Self {
            prefix: record.prefix(),
            prefix_len: record.prefix_len(),
            preferred_lifetime: record.preferred_lifetime(),
            valid_lifetime: record.valid_lifetime(),
        })
    }

    pub const fn buffer_len(&self) -> usize {
        IaPrefix::<&[u8]>::RECORD_LEN
    }

    /// Emit a full record into the first `buffer_len()` bytes of `buffer`.
    pub fn emit(&self, buffer: &mut [u8]) -> Result<()> {
        let buffer = buffer.get_mut(..self.buffer_len()).ok_or(Error)?;
        NetworkEndian::write_u16(&mut buffer[field::OPT_CODE], field::OPT_IAPREFIX);
        NetworkEndian::write_u16(&mut buffer[field::OPT_LEN], field::IAPREFIX_LEN as u16);
        let data = &mut buffer[OPTION_HEADER_LEN..];
        data[field::IAPREFIX_PREFIX_LEN] = self.prefix_len;
        data[field::IAPREFIX_PREFIX].copy_from_slice(&self.prefix.octets());
        let mut record = IaPrefix::new_unchecked(buffer);
        record.set_preferred_lifetime(self.preferred_lifetime);
        record.set_valid_lifetime(self.valid_lifetime);
        Ok(())
    }
}

impl fmt::Display for IaPrefixRepr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/{}(preferred-lifetime={} valid-lifetime={})",
            self.prefix, self.prefix_len, self.preferred_lifetime, self.valid_lifetime
        )
    }
}

/// Build the complete CLIENTID option for a link-layer DUID (type 3,
/// hardware type 1) derived from an Ethernet address.
pub fn client_id_option(hardware_addr: &[u8; 6]) -> [u8; 14] {
    let mut option = [0; 14];
    NetworkEndian::write_u16(&mut option[field::OPT_CODE], field::OPT_CLIENTID);
    NetworkEndian::write_u16(&mut option[field::OPT_LEN], 10);
    // DUID-LL
    NetworkEndian::write_u16(&mut option[4..6], 3);
    // Ethernet
    NetworkEndian::write_u16(&mut option[6..8], 1);
    option[8..].copy_from_slice(hardware_addr);
    option
}

/// Append `name` in uncompressed DNS wire format.
pub fn emit_dns_name(name: &str, out: &mut Vec<u8>) -> Result<()> {
    for label in name.split('.').filter(|label| !label.is_empty()) {
        if label.len() > 63 {
            return Err(Error);
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    Ok(())
}

/// Decode a sequence of uncompressed DNS names, stopping at the first
/// malformed one.
pub fn parse_dns_names(mut data: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut name = String::new();
    while let Some((&len, rest)) = data.split_first() {
        let len = len as usize;
        if len == 0 {
            if !name.is_empty() {
                names.push(core::mem::take(&mut name));
            }
            data = rest;
            continue;
        }
        if len > 63 || rest.len() < len {
            break;
        }
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(&String::from_utf8_lossy(&rest[..len]));
        data = &rest[len..];
    }
    names
}
