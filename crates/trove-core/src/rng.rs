//! Deterministic random number generator for code generation
//!
//! Uses a simple xorshift64 algorithm so that a seeded generator
//! produces the same code sequence on every platform, which keeps
//! allocator tests reproducible. Production callers seed from the
//! system clock via [`CodeRng::from_entropy`].

use serde::{Deserialize, Serialize};

/// A deterministic random number generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeRng {
    state: u64,
}

impl CodeRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        // xorshift requires a non-zero state
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Create an RNG seeded from the system clock
    pub fn from_entropy() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1);
        Self::new(nanos)
    }

    /// Get the current state (useful for saving/loading)
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Generate the next raw u64 value
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64 algorithm
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Pick a random element from a slice
    pub fn pick<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let i = (self.next_u64() as usize) % slice.len();
            Some(&slice[i])
        }
    }
}

impl Default for CodeRng {
    fn default() -> Self {
        Self::new(12345)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = CodeRng::new(42);
        let mut rng2 = CodeRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_pick_stays_in_bounds() {
        let mut rng = CodeRng::new(42);
        let options = [1, 2, 3, 4, 5];
        for _ in 0..100 {
            assert!(options.contains(rng.pick(&options).unwrap()));
        }
    }

    #[test]
    fn test_pick_empty() {
        let mut rng = CodeRng::new(42);
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_none());
    }
}
