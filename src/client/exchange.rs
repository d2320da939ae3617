use core::fmt;

use super::context::Context;
use super::select::{AdvertVerdict, Selection};
use super::Mode;
use crate::rand::{jitter, EntropySource};
use crate::storage::Category;
use crate::time::Duration;
use crate::wire::dhcpv6::{field, INFINITY};
use crate::wire::{options, Dhcpv6MessageType as MessageType, Dhcpv6Packet};
use crate::{Error, Result};

/// Largest datagram a client accepts.
const RECV_BUFFER_LEN: usize = 1536;

/// Refresh time of a stateless session whose server sent none.
pub(crate) const IRT_DEFAULT: u32 = 86400;

/// One request/response exchange with the servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    /// Wait for T1 or a RECONFIGURE, sending nothing.
    Poll,
    Solicit,
    Request,
    Renew,
    Rebind,
    Release,
    Decline,
    InformationRequest,
}

/// Retransmission parameters of one kind of exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetxParams {
    /// Whether the first transmission is delayed by a random amount.
    pub initial_delay: bool,
    /// Initial retransmission timeout, in seconds.
    pub init_timeout: u64,
    /// Maximum retransmission timeout, in seconds.
    pub max_timeout: u64,
}

impl Exchange {
    pub const fn params(self) -> RetxParams {
        let (initial_delay, init_timeout, max_timeout) = match self {
            Exchange::Poll => (false, 1, 120),
            Exchange::Solicit => (true, 1, 120),
            Exchange::Request => (true, 1, 30),
            Exchange::Renew => (false, 10, 600),
            Exchange::Rebind => (false, 10, 600),
            Exchange::Release => (false, 1, 600),
            Exchange::Decline => (false, 1, 3),
            Exchange::InformationRequest => (true, 1, 120),
        };
        RetxParams {
            initial_delay,
            init_timeout,
            max_timeout,
        }
    }

    /// The message sent in each round, `None` for a wait.
    pub fn message_type(self) -> Option<MessageType> {
        match self {
            Exchange::Poll => None,
            Exchange::Solicit => Some(MessageType::Solicit),
            Exchange::Request => Some(MessageType::Request),
            Exchange::Renew => Some(MessageType::Renew),
            Exchange::Rebind => Some(MessageType::Rebind),
            Exchange::Release => Some(MessageType::Release),
            Exchange::Decline => Some(MessageType::Decline),
            Exchange::InformationRequest => Some(MessageType::InformationRequest),
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.message_type() {
            Some(message_type) => write!(f, "{message_type}"),
            None => write!(f, "poll"),
        }
    }
}

/// Retransmission timeouts of one exchange.
#[derive(Debug)]
pub(crate) struct Backoff {
    params: RetxParams,
    rt: u64,
}

impl Backoff {
    pub(crate) fn new(params: RetxParams) -> Backoff {
        Backoff { params, rt: 0 }
    }

    /// The timeout of the next round, in milliseconds.
    pub(crate) fn next(&mut self, rand: &mut dyn EntropySource) -> u64 {
        let init = self.params.init_timeout.saturating_mul(1000);
        let max = self.params.max_timeout.saturating_mul(1000);

        self.rt = if self.rt == 0 {
            init + jitter(rand, init)
        } else {
            self.rt.saturating_mul(2) + jitter(rand, self.rt)
        };
        if self.rt >= max {
            self.rt = max + jitter(rand, max);
        }

        net_trace!("DHCPv6 retransmission timeout {}ms", self.rt);
        self.rt
    }
}

/// The result of a successful exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// SOLICIT selected a server.
    Selected(Mode),
    /// A REPLY was processed; whether anything changed.
    Reply(bool),
    /// A RECONFIGURE asked for this exchange.
    Reconfigure(Exchange),
}

enum Response {
    Discarded,
    Collected,
    Unusable,
    Finished(Outcome),
}

impl Context {
    /// Overall timeout of `kind`, in seconds.
    fn exchange_timeout(&self, kind: Exchange) -> u32 {
        match kind {
            Exchange::Release | Exchange::Decline => 3,
            Exchange::Poll => self.t1,
            Exchange::Renew => self.t2.saturating_sub(self.t1),
            Exchange::Rebind => self.t3.saturating_sub(self.t2),
            _ => self.config.request_timeout.secs().clamp(3, u32::MAX as u64) as u32,
        }
    }

    /// Run one exchange to completion: send, retransmit with backoff, and
    /// process the first valid response.
    ///
    /// Only RELEASE ignores cancellation; it is bounded by its own three
    /// second timeout.
    pub(crate) fn exchange(&mut self, kind: Exchange) -> Result<Outcome> {
        let timeout = self.exchange_timeout(kind);
        if timeout == 0 {
            net_debug!("DHCPv6 {} has no time left", kind);
            return Err(Error::NoReply(kind));
        }

        let params = kind.params();
        let cancellable = kind != Exchange::Release;
        if params.initial_delay {
            let max = self.config.initial_delay.total_millis().saturating_mul(10);
            let delay = match max {
                0 => 0,
                max => self.rand.rand_u32() as u64 % max,
            };
            if self.shared.sleep(Duration::from_millis(delay)) {
                return Err(Error::Cancelled);
            }
        }

        net_debug!("DHCPv6 sending {} (timeout {}s)", kind, timeout);
        if kind == Exchange::Solicit {
            self.store.clear(Category::ServerCandidates);
        }

        let xid = self.rand.rand_u32() & 0x00ff_ffff;
        let start = self.clock.now();
        let deadline = start + Duration::from_secs(timeout as u64);
        let mut backoff = Backoff::new(params);
        let mut buffer = vec![0; RECV_BUFFER_LEN];
        let mut unusable = false;

        loop {
            let round_start = self.clock.now();
            let rt = backoff.next(&mut *self.rand);
            let round_end = (round_start + Duration::from_millis(rt)).min(deadline);

            if let Some(message_type) = kind.message_type() {
                match self.build_message(message_type, xid, round_start - start) {
                    Ok(message) => {
                        if let Err(err) = self.transport.send(&message) {
                            net_error!("DHCPv6 cannot send {}: {}", kind, err);
                        }
                    }
                    Err(err) => net_error!("DHCPv6 cannot build {}: {}", kind, err),
                }
            }

            loop {
                if cancellable && self.shared.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let now = self.clock.now();
                if now >= round_end {
                    break;
                }

                let wait = (round_end - now).min(self.config.poll_interval);
                let len = match self.transport.recv(&mut buffer, wait) {
                    Ok(Some(len)) => len,
                    Ok(None) => continue,
                    Err(err) => {
                        net_debug!("DHCPv6 receive failed: {}", err);
                        if self.shared.sleep(wait) && cancellable {
                            return Err(Error::Cancelled);
                        }
                        continue;
                    }
                };

                let elapsed = (self.clock.now() - start).secs().min(u32::MAX as u64) as u32;
                match self.process(kind, xid, &buffer[..len], elapsed)? {
                    Response::Finished(outcome) => return Ok(outcome),
                    Response::Unusable => unusable = true,
                    Response::Collected | Response::Discarded => {}
                }
            }

            if kind == Exchange::Solicit {
                match self.commit_advert(true) {
                    Selection::Selected(mode) => return Ok(Outcome::Selected(mode)),
                    Selection::Retry => return self.exchange(Exchange::Solicit),
                    Selection::NoServer => {}
                }
            }

            if self.clock.now() >= deadline {
                net_debug!("DHCPv6 {} timed out", kind);
                return Err(match kind {
                    Exchange::Solicit if unusable => Error::NoServer,
                    _ => Error::NoReply(kind),
                });
            }
        }
    }

    /// Validate one datagram and hand it to the handler of `kind`.
    fn process(&mut self, kind: Exchange, xid: u32, message: &[u8], elapsed: u32) -> Result<Response> {
        let packet = match Dhcpv6Packet::new_checked(message) {
            Ok(packet) => packet,
            Err(_) => {
                net_debug!("DHCPv6 discarding truncated message");
                return Ok(Response::Discarded);
            }
        };
        if !self.response_is_valid(kind, xid, &packet) {
            return Ok(Response::Discarded);
        }
        net_debug!("DHCPv6 valid {} for {} after {}s", packet.message_type(), kind, elapsed);

        let reply = packet.options_bytes();
        let response = match kind {
            Exchange::Poll => {
                let next = self.handle_reconfigure(reply, elapsed);
                Response::Finished(Outcome::Reconfigure(next))
            }
            Exchange::Solicit => match self.handle_advert(reply) {
                AdvertVerdict::Accepted => Response::Collected,
                AdvertVerdict::Ignored => Response::Unusable,
                AdvertVerdict::Abort => return Err(Error::NoAddrsAvail),
            },
            Exchange::Rebind => match self.handle_rebind_reply(reply, elapsed) {
                Some(updated) => Response::Finished(Outcome::Reply(updated)),
                None => Response::Discarded,
            },
            Exchange::Request | Exchange::Renew => {
                Response::Finished(Outcome::Reply(self.handle_reply(reply, elapsed)))
            }
            Exchange::InformationRequest => {
                let updated = self.handle_reply(reply, elapsed);
                if self.t1 == INFINITY {
                    self.t1 = IRT_DEFAULT;
                }
                Response::Finished(Outcome::Reply(updated))
            }
            Exchange::Release | Exchange::Decline => Response::Finished(Outcome::Reply(false)),
        };
        Ok(response)
    }

    fn response_is_valid(&self, kind: Exchange, xid: u32, packet: &Dhcpv6Packet<&[u8]>) -> bool {
        let message_type = packet.message_type();
        let expected = match kind {
            Exchange::Poll => self.accept_reconfigure && message_type == MessageType::Reconfigure,
            Exchange::Solicit => {
                message_type == MessageType::Advertise || message_type == MessageType::Reply
            }
            _ => message_type == MessageType::Reply,
        };
        if !expected {
            net_debug!("DHCPv6 discarding unexpected {} during {}", message_type, kind);
            return false;
        }
        // RFC 8415 has servers send RECONFIGURE with transaction id 0, so it
        // never matches the xid of our last request
        if kind != Exchange::Poll && packet.transaction_id() != xid {
            net_debug!(
                "DHCPv6 discarding {} with xid {:06x}, expected {:06x}",
                message_type,
                packet.transaction_id(),
                xid
            );
            return false;
        }

        let client_id = self.store.view(Category::ClientId);
        let server_id = self.store.view(Category::ServerId);
        let mut client_id_ok = false;
        let mut server_id_ok = server_id.is_empty();
        let reply = packet.options_bytes();
        for record in options(reply) {
            let tlv = &reply[record.span()];
            match record.kind {
                field::OPT_CLIENTID => client_id_ok = tlv == client_id,
                field::OPT_SERVERID if !server_id.is_empty() => server_id_ok = tlv == server_id,
                _ => {}
            }
        }

        if !client_id_ok {
            net_debug!("DHCPv6 discarding {} for another client", message_type);
        } else if !server_id_ok {
            net_debug!("DHCPv6 discarding {} from another server", message_type);
        }
        client_id_ok && server_id_ok
    }

    /// Run `kind`; when it times out, count the time waited off the
    /// timers and leases.
    pub(crate) fn timed_exchange(&mut self, kind: Exchange) -> Result<Outcome> {
        let start = self.clock.now();
        let result = self.exchange(kind);
        if let Err(Error::NoReply(_)) = result {
            let waited = (self.clock.now() - start).secs().min(u32::MAX as u64) as u32;
            self.elapse(waited);
        }
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rand::test::XorShift;
    use proptest::prelude::*;

    #[test]
    fn test_params_table() {
        assert_eq!(
            Exchange::Solicit.params(),
            RetxParams {
                initial_delay: true,
                init_timeout: 1,
                max_timeout: 120
            }
        );
        assert_eq!(Exchange::Renew.params().init_timeout, 10);
        assert_eq!(Exchange::Decline.params().max_timeout, 3);
        assert!(!Exchange::Release.params().initial_delay);
        assert_eq!(Exchange::Poll.message_type(), None);
    }

    #[test]
    fn test_backoff_doubles() {
        let mut rand = XorShift::new(7);
        let mut backoff = Backoff::new(Exchange::Renew.params());
        let first = backoff.next(&mut rand);
        assert!((10_000..11_000).contains(&first));
        let second = backoff.next(&mut rand);
        assert!(second >= 2 * first && second < 2 * first + first / 10 + 1);
    }

    #[test]
    fn test_backoff_clamps() {
        let mut rand = XorShift::new(3);
        let mut backoff = Backoff::new(Exchange::Decline.params());
        for _ in 0..10 {
            let rt = backoff.next(&mut rand);
            assert!(rt < 3_300);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Exchange::InformationRequest.to_string(), "information-request");
        assert_eq!(Exchange::Poll.to_string(), "poll");
    }

    #[test]
    fn test_zero_timeout_fails_without_sending() {
        let mut cx = crate::client::context::test::context();
        cx.t1 = 0;
        assert!(matches!(
            cx.exchange(Exchange::Poll),
            Err(Error::NoReply(Exchange::Poll))
        ));
    }

    static RECONFIGURE_BYTES: [u8; 23] = [
        0x0a, 0x00, 0x00, 0x00, // RECONFIGURE, xid 0
        0x00, 0x01, 0x00, 0x0a, 0x00, 0x03, 0x00, 0x01, // CLIENTID, DUID-LL
        0x02, 0x11, 0x22, 0x33, 0x44, 0x55, //
        0x00, 0x13, 0x00, 0x01, 0x05, // RECONF_MSG: renew
    ];

    #[test]
    fn test_reconfigure_ignores_transaction_id() {
        let mut cx = crate::client::context::test::context();
        cx.accept_reconfigure = true;
        let packet = Dhcpv6Packet::new_checked(&RECONFIGURE_BYTES[..]).unwrap();
        assert!(cx.response_is_valid(Exchange::Poll, 0x123456, &packet));

        cx.accept_reconfigure = false;
        assert!(!cx.response_is_valid(Exchange::Poll, 0x123456, &packet));
    }

    #[test]
    fn test_reply_must_match_transaction_id() {
        let cx = crate::client::context::test::context();
        let mut reply = RECONFIGURE_BYTES;
        reply[0] = 0x07;
        let packet = Dhcpv6Packet::new_checked(&reply[..]).unwrap();
        assert!(!cx.response_is_valid(Exchange::Renew, 0x123456, &packet));
        assert!(cx.response_is_valid(Exchange::Renew, 0, &packet));
        // a REPLY never stands in for a RECONFIGURE
        assert!(!cx.response_is_valid(Exchange::Poll, 0, &packet));
    }

    proptest! {
        #[test]
        fn test_backoff_bound(seed in any::<u64>(), rounds in 1usize..40, kind in 0usize..8) {
            let kinds = [
                Exchange::Poll,
                Exchange::Solicit,
                Exchange::Request,
                Exchange::Renew,
                Exchange::Rebind,
                Exchange::Release,
                Exchange::Decline,
                Exchange::InformationRequest,
            ];
            let params = kinds[kind].params();
            let mut rand = XorShift::new(seed);
            let mut backoff = Backoff::new(params);
            let bound = params.max_timeout * 1000 * 11 / 10;
            for _ in 0..rounds {
                prop_assert!(backoff.next(&mut rand) <= bound);
            }
        }
    }
}
