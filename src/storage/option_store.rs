use core::fmt;

/// The categories of data a client keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Our CLIENTID option, header included.
    ClientId,
    /// The selected server's SERVERID option, header included.
    ServerId,
    /// Fixed size server candidate records collected during SOLICIT.
    ServerCandidates,
    /// Option codes for the ORO, two bytes each.
    RequestedOptions,
    /// DNS server addresses, 16 bytes each.
    Dns,
    /// Domain search list in DNS wire format.
    Search,
    /// IA_ADDR records.
    IaNa,
    /// IA_PREFIX records.
    IaPd,
    /// Options nobody else claimed, header included.
    CustomOptions,
    SntpIp,
    SntpFqdn,
    SipIp,
    SipFqdn,
}

impl Category {
    pub const COUNT: usize = 13;

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Category::ClientId => "client-id",
            Category::ServerId => "server-id",
            Category::ServerCandidates => "server-candidates",
            Category::RequestedOptions => "oro",
            Category::Dns => "dns",
            Category::Search => "search",
            Category::IaNa => "ia-na",
            Category::IaPd => "ia-pd",
            Category::CustomOptions => "custom",
            Category::SntpIp => "sntp-ip",
            Category::SntpFqdn => "sntp-fqdn",
            Category::SipIp => "sip-ip",
            Category::SipFqdn => "sip-fqdn",
        };
        write!(f, "{name}")
    }
}

/// One growable byte buffer per [Category].
///
/// Nothing outside a single call keeps an offset into a buffer; callers
/// iterate again after every mutation. Allocation failure never panics:
/// the growth is dropped and the buffer keeps its previous length.
#[derive(Debug, Default, Clone)]
pub struct OptionStore {
    buffers: [Vec<u8>; Category::COUNT],
}

impl OptionStore {
    pub fn new() -> OptionStore {
        OptionStore::default()
    }

    /// Grow (positive `delta`) or shrink (negative `delta`) a buffer.
    ///
    /// Returns the zero-filled tail that was added, or an empty slice when
    /// shrinking. Returns `None`, leaving the buffer untouched, when the
    /// memory for the growth cannot be obtained.
    pub fn resize(&mut self, category: Category, delta: isize) -> Option<&mut [u8]> {
        let buffer = &mut self.buffers[category.index()];
        let old_len = buffer.len();
        if delta < 0 {
            buffer.truncate(old_len.saturating_sub(delta.unsigned_abs()));
            let len = buffer.len();
            return Some(&mut buffer[len..]);
        }

        let delta = delta as usize;
        if buffer.try_reserve(delta).is_err() {
            net_debug!("option store: dropping {} byte growth of {}", delta, category);
            return None;
        }
        buffer.resize(old_len + delta, 0);
        Some(&mut buffer[old_len..])
    }

    pub fn clear(&mut self, category: Category) {
        self.buffers[category.index()].clear()
    }

    /// Append `data`, silently dropping it if the buffer cannot grow.
    pub fn append(&mut self, category: Category, data: &[u8]) {
        if let Some(tail) = self.resize(category, data.len() as isize) {
            tail.copy_from_slice(data);
        }
    }

    /// Remove `len` bytes starting at `offset`, shifting the rest down.
    ///
    /// A range running past the end leaves the buffer unchanged. Returns
    /// the new length.
    pub fn splice_out(&mut self, category: Category, offset: usize, len: usize) -> usize {
        let buffer = &mut self.buffers[category.index()];
        match offset.checked_add(len) {
            Some(end) if end <= buffer.len() => {
                buffer.drain(offset..end);
            }
            _ => {}
        }
        buffer.len()
    }

    /// Replace the first `old_len` bytes with whatever follows them.
    ///
    /// Returns whether the new content differs from the old one, in
    /// length or in bytes.
    pub fn commit(&mut self, category: Category, old_len: usize) -> bool {
        let buffer = &mut self.buffers[category.index()];
        let old_len = old_len.min(buffer.len());
        let new_len = buffer.len() - old_len;
        let changed = new_len != old_len || buffer[..old_len] != buffer[old_len..];
        buffer.drain(..old_len);
        net_trace!(
            "option store: commit {} ({} bytes, changed={})",
            category,
            new_len,
            changed
        );
        changed
    }

    pub fn view(&self, category: Category) -> &[u8] {
        &self.buffers[category.index()]
    }

    pub fn view_mut(&mut self, category: Category) -> &mut [u8] {
        &mut self.buffers[category.index()]
    }

    pub fn len(&self, category: Category) -> usize {
        self.buffers[category.index()].len()
    }

    pub fn is_empty(&self, category: Category) -> bool {
        self.buffers[category.index()].is_empty()
    }

    /// Free the memory of every buffer.
    pub fn release(&mut self) {
        for buffer in self.buffers.iter_mut() {
            *buffer = Vec::new();
        }
    }
}
