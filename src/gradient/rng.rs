//! Seeded pseudo-random generator (Mulberry32).
//!
//! The generator is a plain value: callers own it and pass it by `&mut`, so
//! two renders with the same seed never share state.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Seeds from a config seed. Values outside `u32` wrap like a 32-bit
    /// unsigned shift would.
    pub fn from_seed(seed: i64) -> Self {
        Self::new(seed as u32)
    }

    /// Independent stream for one scanline, so rows can render in parallel
    /// and still reproduce exactly.
    pub fn for_stream(seed: u32, stream: u32) -> Self {
        Self::new(seed ^ hash_u32(stream.wrapping_add(1)))
    }

    /// Next value in `[0, 1)`.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let t = self.state;
        let mut r = (t ^ (t >> 15)).wrapping_mul(1 | t);
        r ^= r.wrapping_add((r ^ (r >> 7)).wrapping_mul(61 | r));
        (r ^ (r >> 14)) as f64 / 4_294_967_296.0
    }

    /// Next value in `[-1, 1)`.
    #[inline]
    pub fn next_signed(&mut self) -> f64 {
        (self.next_f64() - 0.5) * 2.0
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn next_index(&mut self, len: usize) -> usize {
        ((self.next_f64() * len as f64) as usize).min(len.saturating_sub(1))
    }

    /// Uniform integer in `lo..=hi`.
    pub fn next_range(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_index((hi - lo + 1) as usize) as u32
    }
}

/// Integer avalanche hash.
#[inline]
pub(crate) fn hash_u32(mut x: u32) -> u32 {
    x = x.wrapping_mul(0x9E3779B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EBCA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2AE35);
    x ^= x >> 16;
    x
}
