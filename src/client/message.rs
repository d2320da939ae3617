use std::net::Ipv6Addr;

use super::context::Context;
use super::IaMode;
use crate::storage::Category;
use crate::time::Duration;
use crate::wire::dhcpv6::{emit_dns_name, field, IAID};
use crate::wire::{
    Dhcpv6MessageType as MessageType, Dhcpv6Option, Dhcpv6OptionWriter, Dhcpv6Packet, IaHeader,
    IaPrefixRepr, Result,
};

impl Context {
    /// Serialize a message of `message_type` from the current store.
    ///
    /// `elapsed` is the time since the first transmission of this
    /// exchange; it is sent in hundredths of a second.
    pub(crate) fn build_message(
        &self,
        message_type: MessageType,
        xid: u32,
        elapsed: Duration,
    ) -> Result<Vec<u8>> {
        let mut buffer = vec![0; field::OPTIONS.start];
        let mut packet = Dhcpv6Packet::new_unchecked(&mut buffer[..]);
        packet.set_message_type(message_type);
        packet.set_transaction_id(xid);

        let mut writer = Dhcpv6OptionWriter::new(&mut buffer);
        let hundredths = (elapsed.total_millis() / 10).min(0xffff) as u16;
        writer.emit(Dhcpv6Option {
            kind: field::OPT_ELAPSED_TIME,
            data: &hundredths.to_be_bytes(),
        })?;

        let oro = writer.begin(field::OPT_ORO);
        writer.push(self.store.view(Category::RequestedOptions));
        if message_type == MessageType::InformationRequest {
            writer.push(&field::OPT_INFORMATION_REFRESH_TIME.to_be_bytes());
        }
        writer.finish(oro)?;

        writer.emit_raw(self.store.view(Category::ClientId));
        writer.emit_raw(self.store.view(Category::ServerId));
        if message_type == MessageType::InformationRequest {
            return Ok(buffer);
        }

        if message_type == MessageType::Solicit {
            writer.emit(Dhcpv6Option {
                kind: field::OPT_RECONF_ACCEPT,
                data: &[],
            })?;
        }

        if let Some(hostname) = self.config.hostname.as_deref() {
            let mut data = vec![self.config.fqdn_flags.bits()];
            emit_dns_name(hostname, &mut data)?;
            writer.emit(Dhcpv6Option {
                kind: field::OPT_FQDN,
                data: &data,
            })?;
        }

        let acquiring = matches!(message_type, MessageType::Solicit | MessageType::Request);
        let ia_na = self.store.view(Category::IaNa);
        if self.ia_mode != IaMode::None && (acquiring || !ia_na.is_empty()) {
            emit_ia(&mut writer, field::OPT_IA_NA, ia_na)?;
        }

        if self.config.request_prefix {
            let ia_pd = self.store.view(Category::IaPd);
            if !ia_pd.is_empty() {
                emit_ia(&mut writer, field::OPT_IA_PD, ia_pd)?;
            } else if acquiring {
                let hint = IaPrefixRepr {
                    prefix: Ipv6Addr::UNSPECIFIED,
                    prefix_len: self.config.prefix_length_hint,
                    preferred_lifetime: 0,
                    valid_lifetime: 0,
                };
                let mut record = vec![0; hint.buffer_len()];
                hint.emit(&mut record)?;
                emit_ia(&mut writer, field::OPT_IA_PD, &record)?;
            }
        }

        Ok(buffer)
    }
}

/// Emit an IA_NA or IA_PD carrying `records`, with T1 and T2 left to the
/// server.
fn emit_ia(writer: &mut Dhcpv6OptionWriter, kind: u16, records: &[u8]) -> Result<()> {
    let mark = writer.begin(kind);
    let mut header = [0; IaHeader::LEN];
    IaHeader {
        iaid: IAID,
        t1: 0,
        t2: 0,
    }
    .emit(&mut header);
    writer.push(&header);
    writer.emit_raw(records);
    writer.finish(mark)
}
