#![deny(unsafe_code)]

//! A DHCPv6 client engine.
//!
//! The crate obtains IPv6 addresses (IA_NA), delegated prefixes (IA_PD)
//! and configuration (DNS servers, search domains, NTP and SIP servers)
//! from DHCPv6 servers on one interface, and keeps them alive.
//!
//! # Table of contents
//!
//! * **wire**: zero-copy views over DHCPv6 messages and the option
//!   records kept in wire form.
//! * **storage**: the per-category option store.
//! * **phy**: the [phy::Transport] trait and its UDP implementation.
//! * **iface**: the interface a client is bound to, and the
//!   [iface::Configurator] through which leases are applied.
//! * **client**: the protocol engine: server selection, exchanges with
//!   retransmission, lease bookkeeping and the lease worker.
//!
//! # Example
//!
//! ```no_run
//! use dhcp6c::{Client, Config, IaMode};
//!
//! let config = Config {
//!     ia_mode: IaMode::Try,
//!     request_prefix: true,
//!     ..Config::default()
//! };
//! let mut client = Client::open_with_config("eth0", config)?;
//! client.request_async(|lease| println!("{}: {:?}", lease.event, lease.address))?;
//! // ...
//! client.close();
//! # Ok::<(), dhcp6c::Error>(())
//! ```

#[macro_use]
mod macros;

mod error;

pub mod client;
pub mod iface;
pub mod phy;
pub mod rand;
pub mod storage;
pub mod time;
pub mod wire;

pub use self::client::{
    CancelHandle, Client, Config, Exchange, FqdnFlags, IaMode, LeaseEvent, LeaseSnapshot, Mode,
};
pub use self::error::{Error, Result};
