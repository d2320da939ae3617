use byteorder::{ByteOrder, NetworkEndian};

use super::context::Context;
use super::{IaMode, Mode};
use crate::storage::Category;
use crate::wire::dhcpv6::{field, MAX_DUID_LEN, OPTION_HEADER_LEN};
use crate::wire::{parse_options, Dhcpv6StatusCode as StatusCode, IaHeader};

const FLAG_NOADDRAVAIL: u8 = 0x01;
const FLAG_RECONFIGURE: u8 = 0x02;

/// A server that answered SOLICIT.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerCandidate {
    pub has_noaddravail: bool,
    pub wants_reconfigure: bool,
    pub preference: i32,
    pub duid: heapless::Vec<u8, MAX_DUID_LEN>,
}

impl ServerCandidate {
    /// Size of one record in the candidate buffer: flags, preference,
    /// DUID length and a DUID slot of the largest accepted size.
    pub const RECORD_LEN: usize = 1 + 4 + 1 + MAX_DUID_LEN;

    pub fn emit(&self, record: &mut [u8]) {
        let mut flags = 0;
        if self.has_noaddravail {
            flags |= FLAG_NOADDRAVAIL;
        }
        if self.wants_reconfigure {
            flags |= FLAG_RECONFIGURE;
        }
        record[0] = flags;
        NetworkEndian::write_i32(&mut record[1..5], self.preference);
        record[5] = self.duid.len() as u8;
        record[6..6 + self.duid.len()].copy_from_slice(&self.duid);
    }

    pub fn parse(record: &[u8]) -> Option<ServerCandidate> {
        if record.len() < Self::RECORD_LEN {
            return None;
        }
        let duid_len = record[5] as usize;
        let duid = heapless::Vec::from_slice(record.get(6..6 + duid_len)?).ok()?;
        Some(ServerCandidate {
            has_noaddravail: record[0] & FLAG_NOADDRAVAIL != 0,
            wants_reconfigure: record[0] & FLAG_RECONFIGURE != 0,
            preference: NetworkEndian::read_i32(&record[1..5]),
            duid,
        })
    }

    /// The SERVERID option naming this server.
    pub fn server_id_option(&self) -> Vec<u8> {
        let mut option = vec![0; OPTION_HEADER_LEN];
        NetworkEndian::write_u16(&mut option[field::OPT_CODE], field::OPT_SERVERID);
        NetworkEndian::write_u16(&mut option[field::OPT_LEN], self.duid.len() as u16);
        option.extend_from_slice(&self.duid);
        option
    }
}

/// Pick the candidate with the highest preference from a buffer of
/// candidate records. Ties go to the first one received.
///
/// Also returns whether every candidate reported NoAddrsAvail.
pub fn select_server(candidates: &[u8]) -> (Option<ServerCandidate>, bool) {
    let mut best: Option<ServerCandidate> = None;
    let mut seen = false;
    let mut all_noaddravail = true;

    for record in candidates.chunks_exact(ServerCandidate::RECORD_LEN) {
        let candidate = match ServerCandidate::parse(record) {
            Some(candidate) => candidate,
            None => continue,
        };
        seen = true;
        all_noaddravail &= candidate.has_noaddravail;
        if best
            .as_ref()
            .map_or(true, |best| best.preference < candidate.preference)
        {
            best = Some(candidate);
        }
    }

    (best, seen && all_noaddravail)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdvertVerdict {
    Accepted,
    /// No SERVERID, nothing to select.
    Ignored,
    /// NoAddrsAvail while addresses are mandatory.
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selection {
    Selected(Mode),
    /// Solicit again without asking for addresses.
    Retry,
    NoServer,
}

impl Context {
    /// Score an ADVERTISE and record it as a candidate.
    pub(crate) fn handle_advert(&mut self, advert: &[u8]) -> AdvertVerdict {
        let mut candidate = ServerCandidate::default();
        let mut has_server_id = false;

        for option in parse_options(advert) {
            match option.kind {
                field::OPT_SERVERID if !option.data.is_empty() => {
                    if let Ok(duid) = heapless::Vec::from_slice(option.data) {
                        candidate.duid = duid;
                        has_server_id = true;
                    }
                }
                field::OPT_STATUS_CODE => match StatusCode::from_option(option.data) {
                    Some(StatusCode::NoAddrsAvail) => {
                        if self.ia_mode == IaMode::Force {
                            net_debug!("DHCPv6 server has no addresses, aborting");
                            return AdvertVerdict::Abort;
                        }
                        penalize_noaddravail(&mut candidate);
                    }
                    Some(StatusCode::NoPrefixAvail) => candidate.preference -= 2000,
                    _ => {}
                },
                field::OPT_PREFERENCE if !option.data.is_empty() && candidate.preference >= 0 => {
                    candidate.preference = option.data[0] as i32;
                }
                field::OPT_RECONF_ACCEPT => candidate.wants_reconfigure = true,
                field::OPT_IA_PD if self.config.request_prefix => {
                    let nested = option.data.get(IaHeader::LEN..).unwrap_or_default();
                    for inner in parse_options(nested) {
                        match inner.kind {
                            field::OPT_IAPREFIX => candidate.preference += 2000,
                            field::OPT_STATUS_CODE
                                if StatusCode::from_option(inner.data)
                                    == Some(StatusCode::NoPrefixAvail) =>
                            {
                                candidate.preference -= 2000
                            }
                            _ => {}
                        }
                    }
                }
                field::OPT_IA_NA if self.ia_mode != IaMode::None => {
                    let nested = option.data.get(IaHeader::LEN..).unwrap_or_default();
                    let noaddravail = parse_options(nested).any(|inner| {
                        inner.kind == field::OPT_STATUS_CODE
                            && StatusCode::from_option(inner.data) == Some(StatusCode::NoAddrsAvail)
                    });
                    if noaddravail {
                        if self.ia_mode == IaMode::Force {
                            net_debug!("DHCPv6 server has no addresses, aborting");
                            return AdvertVerdict::Abort;
                        }
                        penalize_noaddravail(&mut candidate);
                    }
                }
                _ => {}
            }
        }

        if !has_server_id {
            net_debug!("DHCPv6 ignoring advertise without server id");
            return AdvertVerdict::Ignored;
        }

        net_debug!(
            "DHCPv6 candidate: preference {}, noaddravail {}, reconfigure {}",
            candidate.preference,
            candidate.has_noaddravail,
            candidate.wants_reconfigure
        );
        let mut record = [0; ServerCandidate::RECORD_LEN];
        candidate.emit(&mut record);
        self.store.append(Category::ServerCandidates, &record);
        AdvertVerdict::Accepted
    }

    /// Adopt the best candidate as the server of this session.
    ///
    /// With `allow_retry`, a `Try` session where every server lacks
    /// addresses falls back to soliciting without IA_NA.
    pub(crate) fn commit_advert(&mut self, allow_retry: bool) -> Selection {
        let (best, all_noaddravail) = select_server(self.store.view(Category::ServerCandidates));
        self.store.clear(Category::ServerCandidates);

        if allow_retry && all_noaddravail && self.ia_mode == IaMode::Try {
            net_debug!("DHCPv6 no server has addresses, soliciting without IA_NA");
            self.ia_mode = IaMode::None;
            return Selection::Retry;
        }

        let best = match best {
            Some(best) => best,
            None => return Selection::NoServer,
        };
        self.store.clear(Category::ServerId);
        self.store.append(Category::ServerId, &best.server_id_option());
        self.accept_reconfigure = best.wants_reconfigure;

        let mode = if self.config.request_prefix || self.ia_mode != IaMode::None {
            Mode::Stateful
        } else {
            Mode::Stateless
        };
        net_debug!(
            "DHCPv6 selected server with preference {}, {:?}",
            best.preference,
            mode
        );
        Selection::Selected(mode)
    }
}

fn penalize_noaddravail(candidate: &mut ServerCandidate) {
    if !candidate.has_noaddravail {
        candidate.has_noaddravail = true;
        candidate.preference -= 1000;
    }
}
