/*! The DHCPv6 client.

A [Client] owns everything one interface's DHCPv6 session needs: the
transport, the entropy source and clock, and the option store holding
identifiers and leases in wire form. It can be driven in two ways:

 - [Client::request_once] runs SOLICIT followed by REQUEST (or
   INFORMATION-REQUEST) on the calling thread and returns the lease.
 - [Client::request_async] starts a worker thread which acquires a lease
   and keeps it alive (RENEW, REBIND, RECONFIGURE) until cancelled,
   reporting every change to a callback.

[Client]: struct.Client.html
[Client::request_once]: struct.Client.html#method.request_once
[Client::request_async]: struct.Client.html#method.request_async
*/

#[cfg(feature = "async")]
use core::task::Waker;
use core::fmt;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::iface::{Configurator, Interface};
use crate::phy::Transport;
use crate::rand::EntropySource;
use crate::time::{Clock, Duration};
use crate::{Error, Result};

mod context;
mod exchange;
mod lease;
mod message;
mod select;
mod set;
mod shared;
#[cfg(feature = "async")]
mod waker;

pub use self::exchange::{Exchange, RetxParams};
pub use self::select::{select_server, ServerCandidate};
pub use self::set::{ClientHandle, ClientSet, ClientStorage};

use self::context::Context;
use self::shared::Shared;

bitflags::bitflags! {
    /// Flags of the client FQDN option.
    pub struct FqdnFlags: u8 {
        /// Ask the server to update the AAAA record itself.
        const SERVER_UPDATE = 0b001;
        const OVERRIDE = 0b010;
        /// Ask the server not to touch DNS at all.
        const NO_UPDATE = 0b100;
    }
}

/// How hard to ask for addresses (IA_NA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IaMode {
    /// Never request addresses.
    None,
    /// Request addresses, but fall back to a session without them when
    /// no server has any.
    Try,
    /// Request addresses and give up on servers that have none.
    Force,
}

/// The kind of session selected after SOLICIT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Configuration only, via INFORMATION-REQUEST.
    Stateless,
    /// Address and/or prefix leases, via REQUEST and RENEW.
    Stateful,
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub ia_mode: IaMode,
    /// Request a delegated prefix (IA_PD).
    pub request_prefix: bool,
    /// Prefix length hinted to the server, 0 for no preference.
    pub prefix_length_hint: u8,
    /// Exchange timeout for SOLICIT, REQUEST and INFORMATION-REQUEST.
    /// Values below 3 seconds are raised to 3 seconds.
    pub request_timeout: Duration,
    /// Option codes requested in addition to the DNS, domain list, NTP
    /// and SIP options.
    pub request_options: Vec<u16>,
    /// Host name sent in the FQDN option. Not sent when `None`.
    pub hostname: Option<String>,
    pub fqdn_flags: FqdnFlags,
    /// Longest a blocking receive runs before the cancellation flag is
    /// checked again.
    pub poll_interval: Duration,
    /// SOLICIT, REQUEST and INFORMATION-REQUEST are delayed by up to ten
    /// times this value.
    pub initial_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ia_mode: IaMode::Try,
            request_prefix: true,
            prefix_length_hint: 0,
            request_timeout: Duration::from_secs(10),
            request_options: Vec::new(),
            hostname: None,
            fqdn_flags: FqdnFlags::empty(),
            poll_interval: Duration::from_millis(100),
            initial_delay: Duration::from_millis(1),
        }
    }
}

/// What caused a [LeaseSnapshot] to be published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LeaseEvent {
    /// A stateful session started.
    Bound,
    /// Configuration was obtained or refreshed without leases.
    Informed,
    /// A RENEW, REQUEST or RECONFIGURE refreshed the session.
    Updated,
    /// The session moved to another server through REBIND.
    Rebound,
    /// The session ended and every lease was dropped.
    #[default]
    Unbound,
}

impl fmt::Display for LeaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LeaseEvent::Bound => write!(f, "bound"),
            LeaseEvent::Informed => write!(f, "informed"),
            LeaseEvent::Updated => write!(f, "updated"),
            LeaseEvent::Rebound => write!(f, "rebound"),
            LeaseEvent::Unbound => write!(f, "unbound"),
        }
    }
}

/// A copy of the lease state at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeaseSnapshot {
    pub event: LeaseEvent,
    /// The last leased address.
    pub address: Option<Ipv6Addr>,
    /// The last delegated prefix.
    pub prefix: Option<Ipv6Addr>,
    pub prefix_len: u8,
    /// Netmask of the delegated prefix.
    pub netmask: Option<Ipv6Addr>,
    /// The first DNS server.
    pub dns: Option<Ipv6Addr>,
    pub dns_servers: Vec<Ipv6Addr>,
    pub search_domains: Vec<String>,
    pub ntp_servers: Vec<Ipv6Addr>,
    pub ntp_names: Vec<String>,
    pub sip_servers: Vec<Ipv6Addr>,
    pub sip_domains: Vec<String>,
    /// Seconds until RENEW, `u32::MAX` for never.
    pub t1: u32,
    /// Seconds until REBIND, `u32::MAX` for never.
    pub t2: u32,
    /// Seconds until the first lease expires, `u32::MAX` for never.
    pub t3: u32,
    /// Options in the last reply that the client does not interpret.
    pub custom_options: Vec<(u16, Vec<u8>)>,
}

/// Cancels whatever the client it came from is doing, from any thread.
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    /// Ask the client to stop. A worker still sends its RELEASE.
    pub fn cancel(&self) {
        self.shared.cancel()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.shared.is_cancelled())
            .finish()
    }
}

/// A DHCPv6 client bound to one interface.
pub struct Client {
    iface: Interface,
    context: Option<Context>,
    worker: Option<JoinHandle<Context>>,
    shared: Arc<Shared>,
}

impl Client {
    /// Open a client on `ifname` with the default configuration.
    #[cfg(feature = "phy-udp_socket")]
    pub fn open(ifname: &str) -> Result<Client> {
        Self::open_with_config(ifname, Config::default())
    }

    /// Open a client on `ifname`.
    ///
    /// The client DUID is derived from the interface's hardware address.
    /// When `config.hostname` is unset, the system host name is used.
    #[cfg(feature = "phy-udp_socket")]
    pub fn open_with_config(ifname: &str, mut config: Config) -> Result<Client> {
        let iface = Interface::lookup(ifname).map_err(|err| {
            net_debug!("DHCPv6 interface {} lookup failed: {}", ifname, err);
            Error::NoSuchInterface(ifname.to_owned())
        })?;
        let transport = crate::phy::UdpSocket::new(&iface)?;
        if config.hostname.is_none() {
            config.hostname = crate::phy::sys::hostname();
        }
        Ok(Client::new(iface, Box::new(transport), config))
    }

    /// Create a client over an already open transport.
    pub fn new(iface: Interface, transport: Box<dyn Transport>, config: Config) -> Client {
        let shared = Arc::new(Shared::new());
        let context = Context::new(iface.clone(), transport, config, shared.clone());
        net_debug!("DHCPv6 client opened on {}", iface);
        Client {
            iface,
            context: Some(context),
            worker: None,
            shared,
        }
    }

    /// Replace the entropy source.
    pub fn with_entropy(mut self, rand: Box<dyn EntropySource>) -> Client {
        if let Some(cx) = self.context.as_mut() {
            cx.rand = rand;
        }
        self
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Client {
        if let Some(cx) = self.context.as_mut() {
            cx.clock = clock;
        }
        self
    }

    /// Apply committed leases to the network stack through `configurator`.
    pub fn with_configurator(mut self, configurator: Box<dyn Configurator>) -> Client {
        if let Some(cx) = self.context.as_mut() {
            cx.configurator = Some(configurator);
        }
        self
    }

    pub fn interface(&self) -> &Interface {
        &self.iface
    }

    /// Acquire a lease on the calling thread.
    ///
    /// Runs SOLICIT, then REQUEST for a stateful session or
    /// INFORMATION-REQUEST for a stateless one.
    pub fn request_once(&mut self) -> Result<LeaseSnapshot> {
        if self.worker.is_some() {
            return Err(Error::AlreadyRunning);
        }
        let cx = self.context.as_mut().ok_or(Error::Closed)?;
        self.shared.reset();
        let (_, snapshot) = cx.single_request()?;
        Ok(snapshot)
    }

    /// Start the background worker, which keeps a lease until cancelled
    /// and calls `on_update` for every change.
    pub fn request_async<F>(&mut self, on_update: F) -> Result<()>
    where
        F: FnMut(&LeaseSnapshot) + Send + 'static,
    {
        if self.worker.is_some() {
            return Err(Error::AlreadyRunning);
        }
        let mut cx = self.context.take().ok_or(Error::Closed)?;
        self.shared.reset();
        cx.on_update = Some(Box::new(on_update));

        let worker = std::thread::Builder::new()
            .name(format!("dhcp6c-{}", self.iface.name()))
            .spawn(move || {
                cx.run();
                cx
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// The worker notices within one poll interval, then releases its
    /// leases, which takes at most three more seconds.
    pub fn cancel(&mut self) {
        self.shared.cancel();
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(mut cx) => {
                    cx.on_update = None;
                    self.context = Some(cx);
                }
                Err(_) => net_error!("DHCPv6 worker for {} panicked", self.iface),
            }
        }
    }

    /// Cancel, then free the transport and all stored options.
    pub fn close(mut self) {
        self.cancel();
        if let Some(mut cx) = self.context.take() {
            cx.store.release();
        }
        net_debug!("DHCPv6 client on {} closed", self.iface);
    }

    /// A handle which cancels this client from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: self.shared.clone(),
        }
    }

    /// The most recently published lease.
    pub fn latest_lease(&self) -> Option<LeaseSnapshot> {
        self.shared.latest()
    }

    /// Register a waker.
    ///
    /// The waker is woken every time the worker publishes a new
    /// [LeaseSnapshot].
    ///
    /// Notes:
    ///
    /// - Only one waker can be registered at a time. If another waker was previously registered,
    ///   it is overwritten and will no longer be woken.
    /// - The Waker is woken only once. Once woken, you must register it again to receive more wakes.
    #[cfg(feature = "async")]
    pub fn register_waker(&self, waker: &Waker) {
        self.shared.register_waker(waker)
    }

    /// Adds another waker.
    ///
    /// - The Waker is woken only once. Once woken, you must register it again to receive more wakes.
    #[cfg(feature = "async")]
    pub fn add_waker(&self, waker: &Waker) {
        self.shared.add_waker(waker)
    }

    /// Clears all the wakers registered with this client.
    #[cfg(feature = "async")]
    pub fn clear_wakers(&self) {
        self.shared.clear_wakers()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Client")
            .field("iface", &self.iface)
            .field("running", &self.worker.is_some())
            .field("closed", &(self.context.is_none() && self.worker.is_none()))
            .finish()
    }
}
