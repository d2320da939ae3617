#![no_main]
use dhcp6c::client::select_server;
use dhcp6c::wire::dhcpv6::{lease_lifetimes, parse_dns_names, patch_lease_lifetimes};
use dhcp6c::wire::{options, Dhcpv6Packet, IaAddress, IaHeader, IaPrefix};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = Dhcpv6Packet::new_checked(data) {
        let _ = format!("{}", packet);
    }

    let mut copy = data.to_vec();
    for record in options(data) {
        let tlv = &data[record.span()];
        if let Ok(addr) = IaAddress::new_checked(tlv) {
            let _ = addr.address();
        }
        if let Ok(prefix) = IaPrefix::new_checked(tlv) {
            let _ = prefix.prefix();
        }
        if let Ok(header) = IaHeader::parse(record.data(data)) {
            let nested = &record.data(data)[IaHeader::LEN..];
            assert!(options(nested).all(|inner| inner.span().end <= nested.len()));
            let _ = header.t1.max(header.t2);
        }
        if let Ok((preferred, valid)) = lease_lifetimes(tlv) {
            let tlv = &mut copy[record.span()];
            assert!(patch_lease_lifetimes(tlv, valid, preferred).is_ok());
        }
    }

    let _ = parse_dns_names(data);
    let _ = select_server(data);
});
