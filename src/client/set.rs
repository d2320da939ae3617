use core::fmt;
use managed::ManagedSlice;

use super::Client;

/// Opaque struct with space for storing one client.
///
/// This is public so you can use it to allocate space for storing
/// clients when creating a [ClientSet].
#[derive(Debug, Default)]
pub struct ClientStorage {
    inner: Option<Client>,
}

impl ClientStorage {
    pub const EMPTY: Self = Self { inner: None };
}

/// A handle, identifying a client in a [ClientSet].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct ClientHandle(usize);

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A set of clients, one per interface, each with its own session.
#[derive(Debug)]
pub struct ClientSet<'a> {
    clients: ManagedSlice<'a, ClientStorage>,
}

impl<'a> ClientSet<'a> {
    /// Create a client set using the provided storage.
    pub fn new<ClientsT>(clients: ClientsT) -> ClientSet<'a>
    where
        ClientsT: Into<ManagedSlice<'a, ClientStorage>>,
    {
        let clients = clients.into();
        ClientSet { clients }
    }

    /// Add a client to the set, and return its handle.
    ///
    /// The client is handed back if the storage is fixed-size (not a
    /// `Vec`) and is full.
    pub fn add(&mut self, client: Client) -> Result<ClientHandle, Client> {
        fn put(index: usize, slot: &mut ClientStorage, client: Client) -> ClientHandle {
            net_trace!("[{}]: adding client on {}", index, client.interface());
            *slot = ClientStorage {
                inner: Some(client),
            };
            ClientHandle(index)
        }

        for (index, slot) in self.clients.iter_mut().enumerate() {
            if slot.inner.is_none() {
                return Ok(put(index, slot, client));
            }
        }

        match self.clients {
            ManagedSlice::Borrowed(_) => {
                net_debug!("client set full, rejecting {}", client.interface());
                Err(client)
            }
            ManagedSlice::Owned(ref mut clients) => {
                clients.push(ClientStorage::EMPTY);
                let index = clients.len() - 1;
                Ok(put(index, &mut clients[index], client))
            }
        }
    }

    /// Get a client from the set by its handle.
    pub fn get(&self, handle: ClientHandle) -> Option<&Client> {
        self.clients.get(handle.0)?.inner.as_ref()
    }

    /// Get a client from the set by its handle, as mutable.
    pub fn get_mut(&mut self, handle: ClientHandle) -> Option<&mut Client> {
        self.clients.get_mut(handle.0)?.inner.as_mut()
    }

    /// Remove a client from the set, without changing its state.
    pub fn remove(&mut self, handle: ClientHandle) -> Option<Client> {
        net_trace!("[{}]: removing", handle.0);
        self.clients.get_mut(handle.0)?.inner.take()
    }

    /// Find the client running on the interface called `ifname`.
    pub fn find(&self, ifname: &str) -> Option<ClientHandle> {
        self.iter()
            .find(|(_, client)| client.interface().name() == ifname)
            .map(|(handle, _)| handle)
    }

    /// Get an iterator to the clients.
    pub fn iter(&self) -> impl Iterator<Item = (ClientHandle, &Client)> {
        self.clients
            .iter()
            .enumerate()
            .filter_map(|(n, x)| x.inner.as_ref().map(|x| (ClientHandle(n), x)))
    }

    /// Get a mutable iterator to the clients.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ClientHandle, &mut Client)> {
        self.clients
            .iter_mut()
            .enumerate()
            .filter_map(|(n, x)| x.inner.as_mut().map(|x| (ClientHandle(n), x)))
    }

    /// Cancel every client, waiting for their workers to release.
    pub fn cancel_all(&mut self) {
        for (handle, client) in self.iter_mut() {
            net_trace!("[{}]: cancelling", handle.0);
            client.cancel();
        }
    }
}
