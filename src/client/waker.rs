use core::task::Waker;

/// Linked list of wakers to be woken
#[derive(Debug)]
struct WakerNext {
    waker: Waker,
    next: Option<Box<WakerNext>>,
}

/// Wakers waiting for the next published lease.
#[derive(Debug)]
pub(crate) struct WakerRegistration {
    waker: Option<WakerNext>,
}

impl Drop for WakerRegistration {
    fn drop(&mut self) {
        self.wake_all()
    }
}

impl WakerRegistration {
    pub(crate) const fn new() -> Self {
        Self { waker: None }
    }

    /// Register a waker. Overwrites every previous waker.
    pub(crate) fn register(&mut self, w: &Waker) {
        match self.waker {
            // Same task, keep the old waker and skip the clone.
            Some(ref w2) if w2.next.is_none() && w2.waker.will_wake(w) => {}
            _ => {
                self.waker = Some(WakerNext {
                    waker: w.clone(),
                    next: None,
                })
            }
        }
    }

    /// Append a waker to the chain.
    pub(crate) fn add(&mut self, w: &Waker) {
        match self.waker {
            None => self.register(w),
            Some(ref mut head) => {
                let mut slot = &mut head.next;
                while let Some(next) = slot {
                    slot = &mut next.next;
                }
                *slot = Some(Box::new(WakerNext {
                    waker: w.clone(),
                    next: None,
                }));
            }
        }
    }

    /// Wake all registered wakers, if any. Each is woken once.
    pub(crate) fn wake_all(&mut self) {
        while let Some(w) = self.waker.take() {
            w.waker.wake();
            self.waker = w.next.map(|next| *next);
        }
    }

    /// Forget every waker without waking it.
    pub(crate) fn clear(&mut self) {
        // unlink iteratively so a long chain cannot overflow the stack on drop
        let mut next = self.waker.take().and_then(|w| w.next);
        while let Some(w) = next {
            next = w.next;
        }
    }
}
