// Minimal PRNG (no external crates).
//
// This is NOT cryptographically secure.
// It is used only for mutation noise and reproducible evaluation.

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
}

impl Prng {
    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state: seed }
    }

    #[cfg(feature = "std")]
    pub(crate) fn from_state(state: u64) -> Self {
        // Avoid a zero state.
        let state = if state == 0 {
            0x9E3779B97F4A7C15
        } else {
            state
        };
        Self { state }
    }

    #[cfg(feature = "std")]
    pub(crate) fn state(&self) -> u64 {
        self.state
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64*
        // Marsaglia / Vigna family. Simple, fast, decent for simulation noise.
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    #[inline]
    pub fn next_bool(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }

    #[inline]
    pub fn next_f64_01(&mut self) -> f64 {
        // Convert to [0,1) using the high 53 bits.
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// True with probability `1/denominator`. Always false for a zero denominator.
    #[inline]
    pub fn one_in(&mut self, denominator: u64) -> bool {
        if denominator == 0 {
            return false;
        }
        self.next_u64() % denominator == 0
    }

    #[inline]
    pub fn gen_range_usize(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        let span = (high - low) as u64;
        let v = self.next_u64() % span;
        low + v as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_streams_are_reproducible() {
        let mut a = Prng::new(7);
        let mut b = Prng::new(7);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn range_respects_bounds() {
        let mut rng = Prng::new(3);
        for _ in 0..256 {
            let v = rng.gen_range_usize(2, 9);
            assert!((2..9).contains(&v));
        }
        assert_eq!(rng.gen_range_usize(5, 5), 5);
    }

    #[test]
    fn unit_interval_stays_in_bounds() {
        let mut rng = Prng::new(11);
        for _ in 0..256 {
            let x = rng.next_f64_01();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn one_in_zero_never_fires() {
        let mut rng = Prng::new(5);
        for _ in 0..64 {
            assert!(!rng.one_in(0));
        }
    }
}
