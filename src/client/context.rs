use std::net::Ipv6Addr;
use std::sync::Arc;

use byteorder::{ByteOrder, NetworkEndian};

use super::{Config, IaMode, LeaseEvent, LeaseSnapshot, Shared};
use crate::iface::{prefix_to_netmask, Configurator, Interface};
use crate::phy::Transport;
use crate::rand::{EntropySource, SystemEntropy};
use crate::storage::{Category, OptionStore};
use crate::time::{Clock, SystemClock};
use crate::wire::dhcpv6::{field, parse_dns_names, INFINITY};
use crate::wire::{client_id_option, options, parse_options, IaAddress, IaPrefix};

/// Options every message asks for, ahead of the configured ones.
const DEFAULT_ORO: [u16; 5] = [
    field::OPT_DNS_SERVERS,
    field::OPT_DOMAIN_LIST,
    field::OPT_NTP_SERVER,
    field::OPT_SIP_SERVER_A,
    field::OPT_SIP_SERVER_D,
];

/// Everything one DHCPv6 session owns.
///
/// Only one thread touches a context at a time: the caller of
/// `request_once`, or the worker started by `request_async`.
pub(crate) struct Context {
    pub(super) iface: Interface,
    pub(super) transport: Box<dyn Transport>,
    pub(super) rand: Box<dyn EntropySource>,
    pub(super) clock: Box<dyn Clock>,
    pub(super) configurator: Option<Box<dyn Configurator>>,
    pub(super) config: Config,
    pub(super) store: OptionStore,
    /// Seconds until RENEW.
    pub(super) t1: u32,
    /// Seconds until REBIND.
    pub(super) t2: u32,
    /// Seconds until the first lease expires.
    pub(super) t3: u32,
    /// Address leasing for the current session; `Try` degrades to `None`
    /// when no server has addresses.
    pub(super) ia_mode: IaMode,
    pub(super) accept_reconfigure: bool,
    pub(super) shared: Arc<Shared>,
    pub(super) on_update: Option<Box<dyn FnMut(&LeaseSnapshot) + Send>>,
}

impl Context {
    pub(crate) fn new(
        iface: Interface,
        transport: Box<dyn Transport>,
        config: Config,
        shared: Arc<Shared>,
    ) -> Context {
        let mut store = OptionStore::new();
        store.append(
            Category::ClientId,
            &client_id_option(&iface.hardware_addr()),
        );

        let extra = config
            .request_options
            .iter()
            .filter(|code| !DEFAULT_ORO.contains(code));
        for code in DEFAULT_ORO.iter().chain(extra) {
            let mut bytes = [0; 2];
            NetworkEndian::write_u16(&mut bytes, *code);
            store.append(Category::RequestedOptions, &bytes);
        }

        Context {
            iface,
            transport,
            rand: Box::new(SystemEntropy),
            clock: Box::new(SystemClock::new()),
            configurator: None,
            ia_mode: config.ia_mode,
            config,
            store,
            t1: 0,
            t2: 0,
            t3: 0,
            accept_reconfigure: false,
            shared,
            on_update: None,
        }
    }

    /// Copy the current lease state out of the store.
    pub(super) fn snapshot(&self, event: LeaseEvent) -> LeaseSnapshot {
        let mut snapshot = LeaseSnapshot {
            event,
            t1: self.t1,
            t2: self.t2,
            t3: self.t3,
            ..Default::default()
        };

        let ia_na = self.store.view(Category::IaNa);
        for record in options(ia_na) {
            if let Ok(addr) = IaAddress::new_checked(&ia_na[record.span()]) {
                snapshot.address = Some(addr.address());
            }
        }

        let ia_pd = self.store.view(Category::IaPd);
        for record in options(ia_pd) {
            if let Ok(prefix) = IaPrefix::new_checked(&ia_pd[record.span()]) {
                snapshot.prefix = Some(prefix.prefix());
                snapshot.prefix_len = prefix.prefix_len();
                snapshot.netmask = Some(prefix_to_netmask(prefix.prefix_len()));
            }
        }

        snapshot.dns_servers = addresses(self.store.view(Category::Dns));
        snapshot.dns = snapshot.dns_servers.first().copied();
        snapshot.search_domains = parse_dns_names(self.store.view(Category::Search));
        snapshot.ntp_servers = addresses(self.store.view(Category::SntpIp));
        snapshot.ntp_names = parse_dns_names(self.store.view(Category::SntpFqdn));
        snapshot.sip_servers = addresses(self.store.view(Category::SipIp));
        snapshot.sip_domains = parse_dns_names(self.store.view(Category::SipFqdn));
        snapshot.custom_options = parse_options(self.store.view(Category::CustomOptions))
            .map(|option| (option.kind, option.data.to_vec()))
            .collect();
        snapshot
    }

    /// Publish a lease event: apply it to the network stack, hand it to
    /// the update callback and record it as the latest lease.
    pub(super) fn switch_process(&mut self, event: LeaseEvent) -> LeaseSnapshot {
        net_info!("DHCPv6 {} on {}", event, self.iface);
        let snapshot = self.snapshot(event);
        // custom options are reported once
        self.store.clear(Category::CustomOptions);

        if event != LeaseEvent::Unbound {
            self.apply(&snapshot);
        }
        if let Some(on_update) = self.on_update.as_mut() {
            on_update(&snapshot);
        }
        self.shared.publish(snapshot.clone());
        snapshot
    }

    fn apply(&mut self, snapshot: &LeaseSnapshot) {
        let configurator = match self.configurator.as_mut() {
            Some(configurator) => configurator,
            None => return,
        };

        if let Some(addr) = snapshot.address {
            if let Err(err) = configurator.set_address(addr, 128) {
                net_error!("DHCPv6 cannot set address {}: {}", addr, err);
            }
        }
        if let Some(prefix) = snapshot.prefix {
            if let Err(err) = configurator.set_address(prefix, snapshot.prefix_len) {
                net_error!(
                    "DHCPv6 cannot set prefix {}/{}: {}",
                    prefix,
                    snapshot.prefix_len,
                    err
                );
            }
        }
        if let Some(netmask) = snapshot.netmask {
            if let Err(err) = configurator.set_netmask(netmask) {
                net_error!("DHCPv6 cannot set netmask {}: {}", netmask, err);
            }
        }
        if let Some(dns) = snapshot.dns {
            if let Err(err) = configurator.set_dns_server(dns) {
                net_error!("DHCPv6 cannot set DNS server {}: {}", dns, err);
            }
        }
    }

    /// Count `elapsed` seconds off the timers and every lease lifetime.
    pub(super) fn elapse(&mut self, elapsed: u32) {
        for timer in [&mut self.t1, &mut self.t2, &mut self.t3] {
            if *timer != INFINITY {
                *timer = timer.saturating_sub(elapsed);
            }
        }
        self.age_leases(elapsed);
    }
}

fn addresses(data: &[u8]) -> Vec<Ipv6Addr> {
    data.chunks_exact(16)
        .map(|chunk| {
            let mut octets = [0; 16];
            octets.copy_from_slice(chunk);
            Ipv6Addr::from(octets)
        })
        .collect()
}
