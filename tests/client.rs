use std::collections::VecDeque;
use std::io;
use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use dhcp6c::iface::Interface;
use dhcp6c::phy::Transport;
use dhcp6c::rand::EntropySource;
use dhcp6c::time::{Clock, Duration, Instant};
use dhcp6c::wire::dhcpv6::{field, IAID};
use dhcp6c::wire::{
    client_id_option, options, Dhcpv6MessageType as MessageType, Dhcpv6Option,
    Dhcpv6OptionWriter, Dhcpv6Packet, IaAddrRepr, IaHeader, IaPrefixRepr,
};
use dhcp6c::{Client, Config, Error, Exchange, IaMode, LeaseEvent, LeaseSnapshot};

const SERVER_A: &[u8] = &[0xde, 0xad, 0xbe, 0x01];
const SERVER_B: &[u8] = &[0xde, 0xad, 0xbe, 0x02];
const HARDWARE_ADDR: [u8; 6] = [0x02, 0x11, 0x22, 0x33, 0x44, 0x55];
const NO_ADDRS_AVAIL: &[u8] = &[0x00, 0x0d, 0x00, 0x02, 0x00, 0x02];

type Server = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;
type SentLog = Arc<Mutex<Vec<Vec<u8>>>>;
type Inbox = Arc<Mutex<VecDeque<Vec<u8>>>>;
type Leases = Arc<Mutex<Vec<LeaseSnapshot>>>;

#[derive(Clone, Default)]
struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    fn advance(&self, duration: Duration) {
        self.0
            .fetch_add(duration.total_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.0.load(Ordering::SeqCst))
    }
}

/// Answers every message through a scripted server. Time only moves when
/// the client waits for a datagram that is not there.
///
/// Messages pushed into the inbox arrive unsolicited, once the replies to
/// the last message sent are drained.
struct MockTransport {
    server: Server,
    pending: VecDeque<Vec<u8>>,
    inbox: Inbox,
    sent: SentLog,
    clock: ManualClock,
}

impl Transport for MockTransport {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        self.sent.lock().unwrap().push(payload.to_vec());
        let replies = (self.server)(payload);
        self.pending.extend(replies);
        Ok(())
    }

    fn recv(&mut self, buffer: &mut [u8], timeout: Duration) -> io::Result<Option<usize>> {
        let message = self
            .pending
            .pop_front()
            .or_else(|| self.inbox.lock().unwrap().pop_front());
        match message {
            Some(message) => {
                buffer[..message.len()].copy_from_slice(&message);
                Ok(Some(message.len()))
            }
            None => {
                thread::sleep(std::time::Duration::from_millis(1));
                self.clock.advance(timeout);
                Ok(None)
            }
        }
    }
}

struct Counter(u32);

impl EntropySource for Counter {
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for b in dest.iter_mut() {
            self.0 = self.0.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            *b = (self.0 >> 16) as u8;
        }
    }
}

fn setup_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn client<F>(config: Config, server: F) -> (Client, SentLog)
where
    F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
{
    let (client, sent, _) = client_with_inbox(config, server);
    (client, sent)
}

fn client_with_inbox<F>(config: Config, server: F) -> (Client, SentLog, Inbox)
where
    F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
{
    setup_logging();
    let clock = ManualClock::default();
    let sent = SentLog::default();
    let inbox = Inbox::default();
    let transport = MockTransport {
        server: Box::new(server),
        pending: VecDeque::new(),
        inbox: inbox.clone(),
        sent: sent.clone(),
        clock: clock.clone(),
    };
    let iface = Interface::new("eth0", 2, HARDWARE_ADDR);
    let client = Client::new(iface, Box::new(transport), config)
        .with_clock(Box::new(clock))
        .with_entropy(Box::new(Counter(1)));
    (client, sent, inbox)
}

/// Start the lease worker, keeping every snapshot it publishes.
fn record(client: &mut Client) -> Leases {
    let leases = Leases::default();
    let recorder = leases.clone();
    client
        .request_async(move |lease| recorder.lock().unwrap().push(lease.clone()))
        .unwrap();
    leases
}

fn events(leases: &Leases) -> Vec<LeaseEvent> {
    leases.lock().unwrap().iter().map(|lease| lease.event).collect()
}

/// Wait up to ten seconds for the published events to satisfy `done`.
fn wait_for<F>(leases: &Leases, done: F) -> bool
where
    F: Fn(&[LeaseEvent]) -> bool,
{
    for _ in 0..1000 {
        if done(&events(leases)) {
            return true;
        }
        thread::sleep(std::time::Duration::from_millis(10));
    }
    false
}

fn sent_kinds(sent: &SentLog) -> Vec<MessageType> {
    sent.lock().unwrap().iter().map(|m| message_type(m)).collect()
}

fn message_type(message: &[u8]) -> MessageType {
    Dhcpv6Packet::new_checked(message).unwrap().message_type()
}

fn find_option(message: &[u8], kind: u16) -> Option<Vec<u8>> {
    let packet = Dhcpv6Packet::new_checked(message).unwrap();
    let found = packet.options().find(|option| option.kind == kind);
    found.map(|option| option.data.to_vec())
}

/// A response to `request` from the server `server_id`, echoing its
/// transaction id and client id.
fn respond(kind: MessageType, request: &[u8], server_id: &[u8], body: &[u8]) -> Vec<u8> {
    let mut message = vec![u8::from(kind)];
    message.extend_from_slice(&request[1..4]);
    let request_options = &request[4..];
    for record in options(request_options) {
        if record.kind == field::OPT_CLIENTID {
            message.extend_from_slice(&request_options[record.span()]);
        }
    }
    let mut writer = Dhcpv6OptionWriter::new(&mut message);
    writer
        .emit(Dhcpv6Option {
            kind: field::OPT_SERVERID,
            data: server_id,
        })
        .unwrap();
    writer.emit_raw(body);
    message
}

fn preference(value: u8) -> Vec<u8> {
    vec![0x00, 0x07, 0x00, 0x01, value]
}

fn ia(kind: u16, t1: u32, t2: u32, record: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut writer = Dhcpv6OptionWriter::new(&mut body);
    let mark = writer.begin(kind);
    let mut header = [0; IaHeader::LEN];
    IaHeader { iaid: IAID, t1, t2 }.emit(&mut header);
    writer.push(&header);
    writer.push(record);
    writer.finish(mark).unwrap();
    body
}

fn ia_na(address: &str, t1: u32, t2: u32, valid: u32) -> Vec<u8> {
    let repr = IaAddrRepr {
        address: address.parse().unwrap(),
        preferred_lifetime: valid / 2,
        valid_lifetime: valid,
    };
    let mut record = vec![0; repr.buffer_len()];
    repr.emit(&mut record).unwrap();
    ia(field::OPT_IA_NA, t1, t2, &record)
}

fn ia_pd(prefix: &str, prefix_len: u8, t1: u32, t2: u32, valid: u32) -> Vec<u8> {
    let repr = IaPrefixRepr {
        prefix: prefix.parse().unwrap(),
        prefix_len,
        preferred_lifetime: valid / 2,
        valid_lifetime: valid,
    };
    let mut record = vec![0; repr.buffer_len()];
    repr.emit(&mut record).unwrap();
    ia(field::OPT_IA_PD, t1, t2, &record)
}

/// An unsolicited RECONFIGURE from `server_id`, asking for `next`.
fn reconfigure(server_id: &[u8], next: MessageType) -> Vec<u8> {
    let mut message = vec![u8::from(MessageType::Reconfigure), 0, 0, 0];
    message.extend_from_slice(&client_id_option(&HARDWARE_ADDR));
    let mut writer = Dhcpv6OptionWriter::new(&mut message);
    writer
        .emit(Dhcpv6Option {
            kind: field::OPT_SERVERID,
            data: server_id,
        })
        .unwrap();
    writer
        .emit(Dhcpv6Option {
            kind: field::OPT_RECONF_MSG,
            data: &[u8::from(next)],
        })
        .unwrap();
    message
}

fn dns(address: &str) -> Vec<u8> {
    let address: Ipv6Addr = address.parse().unwrap();
    let mut body = vec![0x00, 0x17, 0x00, 0x10];
    body.extend_from_slice(&address.octets());
    body
}

fn stateful_config() -> Config {
    Config {
        ia_mode: IaMode::Try,
        request_prefix: false,
        request_timeout: Duration::from_secs(3),
        ..Config::default()
    }
}

/// A single server leasing 2001:db8::1001.
fn simple_server(request: &[u8]) -> Vec<Vec<u8>> {
    let kind = message_type(request);
    let lease = [ia_na("2001:db8::1001", 1800, 2880, 7200), dns("2001:db8::53")].concat();
    match kind {
        MessageType::Solicit => vec![respond(MessageType::Advertise, request, SERVER_A, &lease)],
        MessageType::Request | MessageType::Renew => {
            vec![respond(MessageType::Reply, request, SERVER_A, &lease)]
        }
        MessageType::Release => vec![respond(MessageType::Reply, request, SERVER_A, &[])],
        _ => vec![],
    }
}

#[test]
fn test_request_once_binds() {
    let (mut client, sent) = client(stateful_config(), simple_server);
    let lease = client.request_once().unwrap();

    assert_eq!(lease.event, LeaseEvent::Bound);
    assert_eq!(lease.address, Some("2001:db8::1001".parse().unwrap()));
    assert_eq!(lease.dns, Some("2001:db8::53".parse().unwrap()));
    assert_eq!((lease.t1, lease.t2, lease.t3), (1800, 2880, 7200));
    assert_eq!(client.latest_lease(), Some(lease));

    let sent = sent.lock().unwrap();
    let kinds: Vec<MessageType> = sent.iter().map(|m| message_type(m)).collect();
    assert_eq!(kinds.first(), Some(&MessageType::Solicit));
    assert_eq!(kinds.last(), Some(&MessageType::Request));
    assert!(find_option(sent.last().unwrap(), field::OPT_IA_NA).is_some());
}

#[test]
fn test_highest_preference_selected() {
    let (mut client, sent) = client(stateful_config(), |request: &[u8]| {
        let lease = ia_na("2001:db8::1001", 1800, 2880, 7200);
        match message_type(request) {
            MessageType::Solicit => vec![
                respond(MessageType::Advertise, request, SERVER_A, &preference(5)),
                respond(MessageType::Advertise, request, SERVER_B, &preference(10)),
            ],
            MessageType::Request => {
                let server_id = find_option(request, field::OPT_SERVERID).unwrap();
                vec![respond(MessageType::Reply, request, &server_id, &lease)]
            }
            _ => vec![],
        }
    });
    client.request_once().unwrap();

    let sent = sent.lock().unwrap();
    let request = sent
        .iter()
        .find(|m| message_type(m) == MessageType::Request)
        .unwrap();
    assert_eq!(find_option(request, field::OPT_SERVERID).unwrap(), SERVER_B);
}

#[test]
fn test_wrong_xid_ignored() {
    let (mut client, _) = client(stateful_config(), |request: &[u8]| {
        match message_type(request) {
            MessageType::Solicit => vec![respond(MessageType::Advertise, request, SERVER_A, &[])],
            MessageType::Request => {
                let mut stale = respond(
                    MessageType::Reply,
                    request,
                    SERVER_A,
                    &ia_na("2001:db8::dead", 1800, 2880, 7200),
                );
                stale[3] ^= 0xff;
                let good = respond(
                    MessageType::Reply,
                    request,
                    SERVER_A,
                    &ia_na("2001:db8::1001", 1800, 2880, 7200),
                );
                vec![stale, good]
            }
            _ => vec![],
        }
    });
    let lease = client.request_once().unwrap();
    assert_eq!(lease.address, Some("2001:db8::1001".parse().unwrap()));
}

#[test]
fn test_stateless_information_request() {
    let config = Config {
        ia_mode: IaMode::None,
        request_prefix: false,
        request_timeout: Duration::from_secs(3),
        ..Config::default()
    };
    let (mut client, sent) = client(config, |request: &[u8]| match message_type(request) {
        MessageType::Solicit => vec![respond(MessageType::Advertise, request, SERVER_A, &[])],
        MessageType::InformationRequest => {
            vec![respond(MessageType::Reply, request, SERVER_A, &dns("2001:db8::53"))]
        }
        _ => vec![],
    });
    let lease = client.request_once().unwrap();

    assert_eq!(lease.event, LeaseEvent::Informed);
    assert_eq!(lease.address, None);
    assert_eq!(lease.dns_servers, ["2001:db8::53".parse::<Ipv6Addr>().unwrap()]);
    // no refresh time from the server: one day
    assert_eq!(lease.t1, 86400);

    let sent = sent.lock().unwrap();
    let last = sent.last().unwrap();
    assert_eq!(message_type(last), MessageType::InformationRequest);
    assert!(find_option(last, field::OPT_IA_NA).is_none());
}

#[test]
fn test_no_reply() {
    let (mut client, sent) = client(stateful_config(), |_: &[u8]| vec![]);
    assert!(matches!(
        client.request_once(),
        Err(Error::NoReply(Exchange::Solicit))
    ));
    // 3 seconds with a first timeout of about one second
    assert!(sent.lock().unwrap().len() >= 2);
}

#[test]
fn test_advertise_without_server_id() {
    let (mut client, _) = client(stateful_config(), |request: &[u8]| {
        let mut advertise = vec![u8::from(MessageType::Advertise)];
        advertise.extend_from_slice(&request[1..4]);
        let request_options = &request[4..];
        for record in options(request_options) {
            if record.kind == field::OPT_CLIENTID {
                advertise.extend_from_slice(&request_options[record.span()]);
            }
        }
        vec![advertise]
    });
    assert!(matches!(client.request_once(), Err(Error::NoServer)));
}

#[test]
fn test_force_mode_no_addresses() {
    let config = Config {
        ia_mode: IaMode::Force,
        ..stateful_config()
    };
    let (mut client, _) = client(config, |request: &[u8]| {
        vec![respond(MessageType::Advertise, request, SERVER_A, NO_ADDRS_AVAIL)]
    });
    assert!(matches!(client.request_once(), Err(Error::NoAddrsAvail)));
}

#[test]
fn test_worker_releases_on_cancel() {
    let (mut client, sent) = client(stateful_config(), simple_server);
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorder = events.clone();
    client
        .request_async(move |lease| recorder.lock().unwrap().push(lease.event))
        .unwrap();
    assert!(client.is_running());
    assert!(matches!(client.request_once(), Err(Error::AlreadyRunning)));

    for _ in 0..500 {
        if events.lock().unwrap().contains(&LeaseEvent::Bound) {
            break;
        }
        thread::sleep(std::time::Duration::from_millis(10));
    }

    let started = std::time::Instant::now();
    client.cancel_handle().cancel();
    client.cancel();
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert!(!client.is_running());

    let events = events.lock().unwrap();
    assert_eq!(events.first(), Some(&LeaseEvent::Bound));
    assert_eq!(events.last(), Some(&LeaseEvent::Unbound));
    assert_eq!(client.latest_lease().unwrap().event, LeaseEvent::Unbound);

    let sent = sent.lock().unwrap();
    let release = sent.last().unwrap();
    assert_eq!(message_type(release), MessageType::Release);
    assert_eq!(find_option(release, field::OPT_SERVERID).unwrap(), SERVER_A);
    assert!(find_option(release, field::OPT_IA_NA).is_some());
}

#[test]
fn test_request_after_cancel() {
    let (mut client, _) = client(stateful_config(), simple_server);
    client.request_async(|_| {}).unwrap();
    client.cancel();
    // the session can be started again on the calling thread
    let lease = client.request_once().unwrap();
    assert_eq!(lease.event, LeaseEvent::Bound);
    client.close();
}

#[test]
fn test_cancel_handle_interrupts_request() {
    let config = Config {
        request_timeout: Duration::from_secs(600),
        ..stateful_config()
    };
    let (mut client, _) = client(config, |_: &[u8]| vec![]);
    let handle = client.cancel_handle();
    let canceller = thread::spawn(move || {
        thread::sleep(std::time::Duration::from_millis(50));
        handle.cancel();
    });
    assert!(matches!(client.request_once(), Err(Error::Cancelled)));
    canceller.join().unwrap();
}


#[test]
fn test_try_mode_solicits_again_without_addresses() {
    let config = Config {
        request_prefix: true,
        ..stateful_config()
    };
    let (mut client, sent) = client(config, |request: &[u8]| {
        let delegation = ia_pd("2001:db8:100::", 56, 1800, 2880, 7200);
        match message_type(request) {
            MessageType::Solicit if find_option(request, field::OPT_IA_NA).is_some() => {
                vec![respond(MessageType::Advertise, request, SERVER_A, NO_ADDRS_AVAIL)]
            }
            MessageType::Solicit => {
                vec![respond(MessageType::Advertise, request, SERVER_A, &delegation)]
            }
            MessageType::Request => {
                vec![respond(MessageType::Reply, request, SERVER_A, &delegation)]
            }
            _ => vec![],
        }
    });
    let lease = client.request_once().unwrap();

    assert_eq!(lease.event, LeaseEvent::Bound);
    assert_eq!(lease.address, None);
    assert_eq!(lease.prefix, Some("2001:db8:100::".parse().unwrap()));

    let sent = sent.lock().unwrap();
    let solicits: Vec<&Vec<u8>> = sent
        .iter()
        .filter(|m| message_type(m) == MessageType::Solicit)
        .collect();
    assert_eq!(solicits.len(), 2);
    assert!(find_option(solicits[0], field::OPT_IA_NA).is_some());
    assert!(find_option(solicits[1], field::OPT_IA_NA).is_none());
    assert!(find_option(solicits[1], field::OPT_IA_PD).is_some());

    let request = sent.last().unwrap();
    assert_eq!(message_type(request), MessageType::Request);
    assert!(find_option(request, field::OPT_IA_NA).is_none());
    assert!(find_option(request, field::OPT_IA_PD).is_some());
}

#[test]
fn test_delegated_prefix_in_snapshot() {
    let config = Config {
        request_prefix: true,
        ..stateful_config()
    };
    let (mut client, _) = client(config, |request: &[u8]| {
        let lease = [
            ia_na("2001:db8::1001", 1800, 2880, 7200),
            ia_pd("2001:db8:4200::", 48, 1800, 2880, 7200),
        ]
        .concat();
        match message_type(request) {
            MessageType::Solicit => {
                vec![respond(MessageType::Advertise, request, SERVER_A, &lease)]
            }
            MessageType::Request => vec![respond(MessageType::Reply, request, SERVER_A, &lease)],
            _ => vec![],
        }
    });
    let lease = client.request_once().unwrap();

    assert_eq!(lease.address, Some("2001:db8::1001".parse().unwrap()));
    assert_eq!(lease.prefix, Some("2001:db8:4200::".parse().unwrap()));
    assert_eq!(lease.prefix_len, 48);
    assert_eq!(lease.netmask, Some("ffff:ffff:ffff::".parse().unwrap()));
}

#[test]
fn test_rebind_moves_to_new_server() {
    let (mut client, sent, _) = client_with_inbox(stateful_config(), |request: &[u8]| {
        let lease = ia_na("2001:db8::1001", 10, 20, 100);
        match message_type(request) {
            MessageType::Solicit => {
                vec![respond(MessageType::Advertise, request, SERVER_A, &lease)]
            }
            MessageType::Request => vec![respond(MessageType::Reply, request, SERVER_A, &lease)],
            // only the server answering REBIND is still up
            MessageType::Renew => vec![],
            MessageType::Rebind => vec![respond(MessageType::Reply, request, SERVER_B, &lease)],
            MessageType::Release => {
                let server_id = find_option(request, field::OPT_SERVERID).unwrap();
                vec![respond(MessageType::Reply, request, &server_id, &[])]
            }
            _ => vec![],
        }
    });
    let leases = record(&mut client);
    assert!(wait_for(&leases, |events| events.contains(&LeaseEvent::Rebound)));
    client.cancel();

    let events = events(&leases);
    assert_eq!(&events[..2], [LeaseEvent::Bound, LeaseEvent::Rebound]);
    assert_eq!(events.last(), Some(&LeaseEvent::Unbound));

    let kinds = sent_kinds(&sent);
    assert_eq!(
        &kinds[..4],
        [
            MessageType::Solicit,
            MessageType::Request,
            MessageType::Renew,
            MessageType::Rebind
        ]
    );
    let sent = sent.lock().unwrap();
    let rebind = &sent[3];
    assert!(find_option(rebind, field::OPT_SERVERID).is_none());
    assert!(find_option(rebind, field::OPT_IA_NA).is_some());

    let release = sent.last().unwrap();
    assert_eq!(message_type(release), MessageType::Release);
    assert_eq!(find_option(release, field::OPT_SERVERID).unwrap(), SERVER_B);
}

#[test]
fn test_rebind_losing_lease_starts_over() {
    let (mut client, sent, _) = client_with_inbox(stateful_config(), |request: &[u8]| {
        let lease = ia_na("2001:db8::1001", 10, 20, 100);
        match message_type(request) {
            MessageType::Solicit => {
                vec![respond(MessageType::Advertise, request, SERVER_A, &lease)]
            }
            MessageType::Request => vec![respond(MessageType::Reply, request, SERVER_A, &lease)],
            MessageType::Rebind => {
                let revoked = ia_na("2001:db8::1001", 0, 0, 0);
                vec![respond(MessageType::Reply, request, SERVER_B, &revoked)]
            }
            _ => vec![],
        }
    });
    let leases = record(&mut client);
    assert!(wait_for(&leases, |events| events.len() >= 3));
    client.cancel();

    let events = events(&leases);
    assert_eq!(
        &events[..3],
        [LeaseEvent::Bound, LeaseEvent::Unbound, LeaseEvent::Bound]
    );
    assert_eq!(leases.lock().unwrap()[1].address, None);

    let kinds = sent_kinds(&sent);
    assert_eq!(
        &kinds[..6],
        [
            MessageType::Solicit,
            MessageType::Request,
            MessageType::Renew,
            MessageType::Rebind,
            MessageType::Solicit,
            MessageType::Request
        ]
    );
}

#[test]
fn test_reconfigure_triggers_renew() {
    let (mut client, sent, inbox) = client_with_inbox(stateful_config(), |request: &[u8]| {
        let lease = ia_na("2001:db8::1001", 1800, 2880, 7200);
        let reconf_accept = [0x00, 0x14, 0x00, 0x00];
        match message_type(request) {
            MessageType::Solicit => {
                let advert = [lease, reconf_accept.to_vec()].concat();
                vec![respond(MessageType::Advertise, request, SERVER_A, &advert)]
            }
            MessageType::Request | MessageType::Renew | MessageType::Release => {
                vec![respond(MessageType::Reply, request, SERVER_A, &lease)]
            }
            _ => vec![],
        }
    });
    let leases = record(&mut client);
    assert!(wait_for(&leases, |events| events == [LeaseEvent::Bound]));

    inbox
        .lock()
        .unwrap()
        .push_back(reconfigure(SERVER_A, MessageType::Renew));
    assert!(wait_for(&leases, |events| events.contains(&LeaseEvent::Updated)));
    client.cancel();

    let events = events(&leases);
    assert_eq!(&events[..2], [LeaseEvent::Bound, LeaseEvent::Updated]);

    let kinds = sent_kinds(&sent);
    assert_eq!(
        &kinds[..3],
        [MessageType::Solicit, MessageType::Request, MessageType::Renew]
    );
    let renew = sent.lock().unwrap()[2].clone();
    assert_eq!(find_option(&renew, field::OPT_SERVERID).unwrap(), SERVER_A);
}

#[test]
fn test_reconfigure_ignored_without_reconf_accept() {
    let (mut client, sent, inbox) = client_with_inbox(stateful_config(), simple_server);
    let leases = record(&mut client);
    assert!(wait_for(&leases, |events| events == [LeaseEvent::Bound]));

    inbox
        .lock()
        .unwrap()
        .push_back(reconfigure(SERVER_A, MessageType::Renew));
    while !inbox.lock().unwrap().is_empty() {
        thread::sleep(std::time::Duration::from_millis(10));
    }
    client.cancel();

    assert_eq!(events(&leases), [LeaseEvent::Bound, LeaseEvent::Unbound]);
    assert!(!sent_kinds(&sent).contains(&MessageType::Renew));
}

#[test]
fn test_renew_revoking_address_reports_update() {
    let (mut client, sent, _) = client_with_inbox(stateful_config(), |request: &[u8]| {
        match message_type(request) {
            MessageType::Solicit | MessageType::Request => {
                let lease = ia_na("2001:db8::1001", 2, 3, 10);
                let kind = match message_type(request) {
                    MessageType::Solicit => MessageType::Advertise,
                    _ => MessageType::Reply,
                };
                vec![respond(kind, request, SERVER_A, &lease)]
            }
            MessageType::Renew => {
                let revoked = ia_na("2001:db8::1001", 0, 0, 0);
                vec![respond(MessageType::Reply, request, SERVER_A, &revoked)]
            }
            _ => vec![],
        }
    });
    let leases = record(&mut client);
    assert!(wait_for(&leases, |events| events.contains(&LeaseEvent::Updated)));
    client.cancel();

    let leases = leases.lock().unwrap();
    assert_eq!(leases[0].event, LeaseEvent::Bound);
    assert_eq!(leases[0].address, Some("2001:db8::1001".parse().unwrap()));
    assert_eq!(leases[1].event, LeaseEvent::Updated);
    assert_eq!(leases[1].address, None);
    assert_eq!(leases.last().unwrap().event, LeaseEvent::Unbound);

    // nothing left to release
    assert!(!sent_kinds(&sent).contains(&MessageType::Release));
}
