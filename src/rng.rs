//! Injected randomness for settlement allocation.
//!
//! The randomized split must be reproducible from a seed, so the allocator
//! never touches a global RNG; it draws fractions from a [`FractionSource`].
//! [`XorShiftRng`] is an xorshift64* generator: same seed, same sequence.

/// Source of uniform fractions in `[0, 1)`.
pub trait FractionSource {
    fn next_fraction(&mut self) -> f64;
}

/// Deterministic xorshift64* generator.
#[derive(Debug, Clone)]
pub struct XorShiftRng {
    state: u64,
}

impl XorShiftRng {
    pub fn new(seed: u64) -> Self {
        // xorshift state must never be zero
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }
}

impl FractionSource for XorShiftRng {
    fn next_fraction(&mut self) -> f64 {
        // take the top 53 bits so the fraction fits a f64 mantissa exactly
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}
