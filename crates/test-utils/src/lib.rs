use arbitrary::{Arbitrary, Unstructured};
use rand::{rngs::OsRng, RngCore};

/// Size of the random pool backing [`ArbitraryGenerator`].
const POOL_LEN: usize = 1 << 24; // 16 MiB

/// Draws `Arbitrary` values from a pool of OS randomness filled at
/// construction.
///
/// Calls consume the pool front to back, so a single instance hands out
/// independent values. The pool is never refilled.
pub struct ArbitraryGenerator {
    pool: Vec<u8>,
    consumed: usize,
}

impl Default for ArbitraryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitraryGenerator {
    pub fn new() -> Self {
        Self::with_pool_size(POOL_LEN)
    }

    pub fn with_pool_size(len: usize) -> Self {
        let mut pool = vec![0u8; len];
        OsRng.fill_bytes(&mut pool);
        ArbitraryGenerator { pool, consumed: 0 }
    }

    pub fn generate<'a, T: Arbitrary<'a>>(&'a mut self) -> T {
        let mut u = Unstructured::new(&self.pool[self.consumed..]);
        let before = u.len();
        let value = T::arbitrary(&mut u).expect("testutils: generate arbitrary value");
        self.consumed += before - u.len();
        value
    }
}
