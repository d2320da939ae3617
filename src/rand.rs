use ::rand::rngs::OsRng;
use ::rand::RngCore;

/// A source of random bytes for transaction ids and retransmission jitter.
pub trait EntropySource: Send {
    fn fill_bytes(&mut self, dest: &mut [u8]);

    fn rand_u32(&mut self) -> u32 {
        let mut bytes = [0; 4];
        self.fill_bytes(&mut bytes);
        u32::from_ne_bytes(bytes)
    }
}

/// The operating system's entropy source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEntropy;

impl EntropySource for SystemEntropy {
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest)
    }
}

/// Uniform jitter in `[0, time / 10)`, with a granularity of a thousandth of `time`.
pub(crate) fn jitter(rand: &mut dyn EntropySource, time: u64) -> u64 {
    time.saturating_mul((rand.rand_u32() % 1000) as u64) / 10_000
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Deterministic xorshift source.
    #[derive(Debug, Clone)]
    pub(crate) struct XorShift {
        state: u64,
    }

    impl XorShift {
        pub(crate) fn new(seed: u64) -> Self {
            Self { state: seed.max(1) }
        }
    }

    impl EntropySource for XorShift {
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for b in dest.iter_mut() {
                self.state ^= self.state << 13;
                self.state ^= self.state >> 7;
                self.state ^= self.state << 17;
                *b = (self.state >> 24) as u8;
            }
        }
    }

    #[test]
    fn test_jitter_below_tenth() {
        let mut rand = XorShift::new(42);
        for _ in 0..1000 {
            assert!(jitter(&mut rand, 1000) < 100);
        }
        assert_eq!(jitter(&mut rand, 0), 0);
    }

    #[test]
    fn test_system_entropy_fills() {
        let mut buf = [0u8; 32];
        SystemEntropy.fill_bytes(&mut buf);
        // 32 zero bytes from the OS is not a realistic outcome
        assert!(buf.iter().any(|b| *b != 0));
    }
}
