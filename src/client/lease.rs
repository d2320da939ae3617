use std::net::Ipv6Addr;

use byteorder::{ByteOrder, NetworkEndian};

use super::context::Context;
use super::exchange::{Exchange, Outcome};
use super::select::Selection;
use super::{LeaseEvent, LeaseSnapshot, Mode};
use crate::storage::Category;
use crate::time::Duration;
use crate::wire::dhcpv6::{
    field, lease_lifetimes, patch_lease_lifetimes, IAID, INFINITY, OPTION_HEADER_LEN,
};
use crate::wire::{
    options, parse_options, Dhcpv6MessageType as MessageType, Dhcpv6StatusCode as StatusCode,
    IaAddress, IaHeader, IaPrefix,
};
use crate::{Error, Result};

/// Pause between two attempts to get a lease.
const RESTART_DELAY: Duration = Duration::from_secs(1);

/// Categories refreshed wholesale by every REPLY.
const REPLY_CATEGORIES: [Category; 6] = [
    Category::Dns,
    Category::Search,
    Category::SntpIp,
    Category::SntpFqdn,
    Category::SipIp,
    Category::SipFqdn,
];

fn age(lifetime: u32, elapsed: u32) -> u32 {
    match lifetime {
        INFINITY => INFINITY,
        lifetime => lifetime.saturating_sub(elapsed),
    }
}

fn age_records(buffer: &mut [u8], elapsed: u32) {
    let records: Vec<_> = options(buffer).collect();
    for record in records {
        let tlv = &mut buffer[record.span()];
        let aged = lease_lifetimes(tlv).and_then(|(preferred, valid)| {
            patch_lease_lifetimes(tlv, age(preferred, elapsed), age(valid, elapsed))
        });
        if aged.is_err() {
            net_trace!("DHCPv6 skipping malformed lease record");
        }
    }
}

/// The status carried inside an IA, if any.
fn ia_status(ia_options: &[u8]) -> Option<StatusCode> {
    parse_options(ia_options)
        .find(|option| option.kind == field::OPT_STATUS_CODE)
        .and_then(|option| StatusCode::from_option(option.data))
}

impl Context {
    /// Count `elapsed` seconds off every lease lifetime.
    pub(super) fn age_leases(&mut self, elapsed: u32) {
        age_records(self.store.view_mut(Category::IaNa), elapsed);
        age_records(self.store.view_mut(Category::IaPd), elapsed);
    }

    /// Drop every lease whose valid lifetime reached zero.
    fn remove_expired(&mut self, category: Category) -> bool {
        let mut removed = false;
        loop {
            let buffer = self.store.view(category);
            let expired = options(buffer)
                .find(|record| matches!(lease_lifetimes(&buffer[record.span()]), Ok((_, 0))));
            let record = match expired {
                Some(record) => record,
                None => return removed,
            };
            net_debug!(
                "DHCPv6 {} lease {} expired",
                category,
                describe(&buffer[record.span()])
            );
            self.store
                .splice_out(category, record.offset, record.span().len());
            removed = true;
        }
    }

    /// Merge the IA_ADDR and IA_PREFIX records of one IA into the store.
    ///
    /// Known leases get the new lifetimes, others are appended without
    /// their nested options.
    fn parse_ia(&mut self, ia_options: &[u8]) {
        for record in options(ia_options) {
            let (category, key, record_len) = match record.kind {
                field::OPT_IAADDR => (
                    Category::IaNa,
                    field::IAADDR_ADDRESS,
                    IaAddress::<&[u8]>::RECORD_LEN,
                ),
                field::OPT_IAPREFIX => (
                    Category::IaPd,
                    field::IAPREFIX_PREFIX_LEN..field::IAPREFIX_PREFIX.end,
                    IaPrefix::<&[u8]>::RECORD_LEN,
                ),
                _ => continue,
            };

            let tlv = &ia_options[record.span()];
            let (preferred, valid) = match lease_lifetimes(tlv) {
                Ok(lifetimes) => lifetimes,
                Err(_) => continue,
            };
            if preferred > valid {
                net_debug!(
                    "DHCPv6 lease {} prefers {}s past its {}s validity",
                    describe(tlv),
                    preferred,
                    valid
                );
            }

            let tlv = &tlv[..record_len];
            let wanted = &tlv[OPTION_HEADER_LEN..][key.clone()];
            let stored = self.store.view(category);
            let existing = options(stored).find(|local| {
                local.kind == record.kind
                    && local.data(stored).get(key.clone()) == Some(wanted)
            });

            match existing {
                Some(local) => {
                    let local = &mut self.store.view_mut(category)[local.span()];
                    if patch_lease_lifetimes(local, preferred, valid).is_err() {
                        net_trace!("DHCPv6 skipping malformed stored lease");
                    }
                }
                None => {
                    net_debug!("DHCPv6 new lease {}", describe(tlv));
                    if let Some(slot) = self.store.resize(category, record_len as isize) {
                        slot.copy_from_slice(tlv);
                        NetworkEndian::write_u16(
                            &mut slot[field::OPT_LEN],
                            (record_len - OPTION_HEADER_LEN) as u16,
                        );
                    }
                }
            }
        }
    }

    /// Smallest valid lifetime among the stored leases.
    fn min_valid_lifetime(&self) -> u32 {
        [Category::IaNa, Category::IaPd]
            .iter()
            .flat_map(|category| {
                let buffer = self.store.view(*category);
                options(buffer).filter_map(move |record| {
                    lease_lifetimes(&buffer[record.span()])
                        .ok()
                        .map(|(_, valid)| valid)
                })
            })
            .min()
            .unwrap_or(INFINITY)
    }

    /// Process the options of a REPLY received `elapsed` seconds into the
    /// exchange. Returns whether the lease or the configuration changed.
    pub(crate) fn handle_reply(&mut self, reply: &[u8], elapsed: u32) -> bool {
        let mut updated = false;
        self.t1 = INFINITY;
        self.t2 = INFINITY;
        self.t3 = INFINITY;
        self.age_leases(elapsed);

        let ia_na_len = self.store.len(Category::IaNa);
        let ia_pd_len = self.store.len(Category::IaPd);
        let old_lens = REPLY_CATEGORIES.map(|category| self.store.len(category));

        for record in options(reply) {
            let data = record.data(reply);
            match record.kind {
                field::OPT_IA_NA | field::OPT_IA_PD => {
                    let header = match IaHeader::parse(data) {
                        Ok(header) => header,
                        Err(_) => continue,
                    };
                    if header.iaid != IAID || header.t2 < header.t1 {
                        net_debug!("DHCPv6 ignoring IA {}", header);
                        continue;
                    }
                    let ia_options = &data[IaHeader::LEN..];
                    match ia_status(ia_options) {
                        None | Some(StatusCode::Success) => {}
                        Some(status) => {
                            net_debug!("DHCPv6 skipping IA with status {}", status);
                            continue;
                        }
                    }

                    if header.t1 > 0 {
                        self.t1 = self.t1.min(header.t1);
                    }
                    if header.t2 > 0 {
                        self.t2 = self.t2.min(header.t2);
                    }
                    // prefix holders get every refresh, with the new timers
                    if record.kind == field::OPT_IA_PD && self.config.request_prefix {
                        updated = true;
                    }
                    self.parse_ia(ia_options);
                }
                field::OPT_DNS_SERVERS => {
                    if data.len() % 16 == 0 {
                        self.store.append(Category::Dns, data);
                    }
                }
                field::OPT_DOMAIN_LIST => self.store.append(Category::Search, data),
                field::OPT_NTP_SERVER => {
                    for suboption in parse_options(data) {
                        match suboption.kind {
                            field::NTP_SUBOPTION_SRV_ADDR | field::NTP_SUBOPTION_MC_ADDR
                                if suboption.data.len() == 16 =>
                            {
                                self.store.append(Category::SntpIp, suboption.data)
                            }
                            field::NTP_SUBOPTION_SRV_FQDN if !suboption.data.is_empty() => {
                                self.store.append(Category::SntpFqdn, suboption.data)
                            }
                            _ => {}
                        }
                    }
                }
                field::OPT_SIP_SERVER_A => {
                    if !data.is_empty() && data.len() % 16 == 0 {
                        self.store.append(Category::SipIp, data);
                    }
                }
                field::OPT_SIP_SERVER_D => self.store.append(Category::SipFqdn, data),
                field::OPT_INFORMATION_REFRESH_TIME => {
                    if data.len() >= 4 {
                        self.t1 = self.t1.min(NetworkEndian::read_u32(data));
                    }
                }
                field::OPT_CLIENTID | field::OPT_SERVERID => {}
                _ => self
                    .store
                    .append(Category::CustomOptions, &reply[record.span()]),
            }
        }

        for (category, old_len) in REPLY_CATEGORIES.iter().zip(old_lens) {
            updated |= self.store.commit(*category, old_len);
        }
        updated |= self.store.len(Category::IaNa) != ia_na_len;
        updated |= self.store.len(Category::IaPd) != ia_pd_len;
        updated |= self.remove_expired(Category::IaPd);
        updated |= self.remove_expired(Category::IaNa);

        let valid = self.min_valid_lifetime();
        self.t1 = self.t1.min(valid);
        self.t2 = self.t2.min(valid);
        self.t3 = self.t3.min(valid);
        net_debug!(
            "DHCPv6 reply processed: t1={} t2={} t3={} updated={}",
            self.t1,
            self.t2,
            self.t3,
            updated
        );
        updated
    }

    /// Process a RECONFIGURE received `elapsed` seconds into the wait.
    /// Returns the exchange the server asked for.
    pub(crate) fn handle_reconfigure(&mut self, message: &[u8], elapsed: u32) -> Exchange {
        let mut next = Exchange::Renew;
        for option in parse_options(message) {
            if option.kind == field::OPT_RECONF_MSG && option.data.len() == 1 {
                match MessageType::from(option.data[0]) {
                    MessageType::Renew => next = Exchange::Renew,
                    MessageType::InformationRequest => next = Exchange::InformationRequest,
                    _ => {}
                }
            }
        }

        net_debug!("DHCPv6 reconfigure requests {}", next);
        self.elapse(elapsed);
        self.remove_expired(Category::IaPd);
        self.remove_expired(Category::IaNa);
        next
    }

    /// A REBIND reply may come from any server: adopt it as the new
    /// server, then process it as a REPLY. `None` if it is unusable.
    pub(crate) fn handle_rebind_reply(&mut self, reply: &[u8], elapsed: u32) -> Option<bool> {
        self.handle_advert(reply);
        match self.commit_advert(false) {
            Selection::Selected(_) => Some(self.handle_reply(reply, elapsed)),
            _ => None,
        }
    }

    /// SOLICIT, then REQUEST or INFORMATION-REQUEST.
    pub(crate) fn single_request(&mut self) -> Result<(Mode, LeaseSnapshot)> {
        self.ia_mode = self.config.ia_mode;
        for category in [
            Category::ServerId,
            Category::ServerCandidates,
            Category::IaPd,
            Category::SntpIp,
            Category::SntpFqdn,
            Category::SipIp,
            Category::SipFqdn,
            Category::CustomOptions,
        ] {
            self.store.clear(category);
        }

        let mode = match self.exchange(Exchange::Solicit)? {
            Outcome::Selected(mode) => mode,
            _ => return Err(Error::NoServer),
        };
        let (next, event) = match mode {
            Mode::Stateless => (Exchange::InformationRequest, LeaseEvent::Informed),
            Mode::Stateful => (Exchange::Request, LeaseEvent::Bound),
        };
        self.exchange(next)?;
        Ok((mode, self.switch_process(event)))
    }

    /// Wait for T1 or a RECONFIGURE; after a RECONFIGURE, run the
    /// exchange it asked for.
    fn poll_reconfigure(&mut self) -> Result<Outcome> {
        match self.timed_exchange(Exchange::Poll)? {
            Outcome::Reconfigure(next) => self.exchange(next),
            outcome => Ok(outcome),
        }
    }

    /// Keep the session selected by `single_request` alive until it is
    /// lost or the client is cancelled, then let go of it.
    pub(crate) fn lease(&mut self, mode: Mode) {
        match mode {
            Mode::Stateless => self.lease_stateless(),
            Mode::Stateful => self.lease_stateful(),
        }
        self.unbind();
    }

    fn lease_stateless(&mut self) {
        while !self.shared.is_cancelled() {
            match self.poll_reconfigure() {
                Ok(_) => {
                    self.switch_process(LeaseEvent::Informed);
                    continue;
                }
                Err(Error::Cancelled) => break,
                Err(_) => {}
            }
            if self.shared.is_cancelled() {
                break;
            }

            if let Err(err) = self.exchange(Exchange::InformationRequest) {
                net_debug!("DHCPv6 information refresh failed: {}", err);
                break;
            }
            self.switch_process(LeaseEvent::Informed);
        }
    }

    fn lease_stateful(&mut self) {
        while !self.shared.is_cancelled() {
            match self.poll_reconfigure() {
                Ok(_) => {
                    self.switch_process(LeaseEvent::Updated);
                    continue;
                }
                Err(Error::Cancelled) => break,
                Err(_) => {}
            }
            if self.shared.is_cancelled() {
                break;
            }

            let had_na = !self.store.is_empty(Category::IaNa);
            let had_pd = !self.store.is_empty(Category::IaPd);
            let kind = if had_na || had_pd {
                Exchange::Renew
            } else {
                Exchange::Request
            };
            let result = self.timed_exchange(kind);
            if self.shared.is_cancelled() {
                break;
            }
            if result.is_ok() {
                self.switch_process(LeaseEvent::Updated);
                continue;
            }

            net_debug!("DHCPv6 {} failed, rebinding", kind);
            self.store.clear(Category::ServerId);
            let result = self.exchange(Exchange::Rebind);
            let lost = (had_na && self.store.is_empty(Category::IaNa))
                || (had_pd && self.store.is_empty(Category::IaPd));
            match result {
                Ok(_) if !lost => {
                    self.switch_process(LeaseEvent::Rebound);
                }
                Ok(_) => {
                    net_debug!("DHCPv6 rebind lost leases, restarting");
                    break;
                }
                Err(err) => {
                    net_debug!("DHCPv6 rebind failed: {}", err);
                    break;
                }
            }
        }
    }

    /// Release what is left, withdraw the addresses and report `unbound`.
    fn unbind(&mut self) {
        let has_leases =
            !self.store.is_empty(Category::IaNa) || !self.store.is_empty(Category::IaPd);
        if has_leases && !self.store.is_empty(Category::ServerId) {
            if let Err(err) = self.exchange(Exchange::Release) {
                net_debug!("DHCPv6 release not acknowledged: {}", err);
            }
        }

        let ia_na = self.store.view(Category::IaNa);
        let removed: Vec<Ipv6Addr> = options(ia_na)
            .filter_map(|record| IaAddress::new_checked(&ia_na[record.span()]).ok())
            .map(|addr| addr.address())
            .collect();
        for addr in removed {
            net_debug!("DHCPv6 removing address {}/128", addr);
            if let Some(configurator) = self.configurator.as_mut() {
                if let Err(err) = configurator.remove_address(addr) {
                    net_error!("DHCPv6 cannot remove address {}: {}", addr, err);
                }
            }
        }

        self.store.clear(Category::IaNa);
        self.store.clear(Category::IaPd);
        self.store.clear(Category::ServerId);
        self.switch_process(LeaseEvent::Unbound);
    }

    /// The worker loop: acquire a lease, keep it, start over, until
    /// cancelled.
    pub(crate) fn run(&mut self) {
        net_debug!("DHCPv6 worker started on {}", self.iface);
        while !self.shared.is_cancelled() {
            match self.single_request() {
                Ok((mode, _)) => self.lease(mode),
                Err(Error::Cancelled) => break,
                Err(err) => {
                    net_debug!("DHCPv6 request failed: {}", err);
                    if self.shared.sleep(RESTART_DELAY) {
                        break;
                    }
                }
            }
        }
        net_debug!("DHCPv6 worker on {} exiting", self.iface);
    }
}

fn describe(tlv: &[u8]) -> String {
    if let Ok(addr) = IaAddress::new_checked(tlv) {
        return addr.address().to_string();
    }
    match IaPrefix::new_checked(tlv) {
        Ok(prefix) => format!("{}/{}", prefix.prefix(), prefix.prefix_len()),
        Err(_) => String::from("?"),
    }
}
