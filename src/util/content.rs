//! Filler content for generated files
//!
//! The bytes only give files a realistic size; nothing ever verifies them.
//! One generator is created per driver session and drained for every file,
//! so there is no reseeding on the hot path.

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::io::{self, Read, Write};

/// Pseudo-random byte stream
///
/// Each byte is the low byte of one xoshiro256++ output, so the whole
/// stream is reproducible from the seed.
pub struct ContentGenerator<R: RngCore = Xoshiro256PlusPlus> {
    rng: R,
}

impl ContentGenerator<Xoshiro256PlusPlus> {
    /// Create a generator with a random seed
    pub fn new() -> Self {
        Self::from_rng(Xoshiro256PlusPlus::from_entropy())
    }

    /// Create a generator with a specific seed
    ///
    /// Useful for reproducible tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(Xoshiro256PlusPlus::seed_from_u64(seed))
    }
}

impl Default for ContentGenerator<Xoshiro256PlusPlus> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore> ContentGenerator<R> {
    /// Wrap an existing random source
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Fill `buf` completely
    #[inline]
    pub fn fill(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = (self.rng.next_u64() & 0xff) as u8;
        }
    }

    /// Replace the contents of `buf` with exactly `n` fresh bytes
    ///
    /// The buffer's allocation is reused across calls.
    pub fn refill(&mut self, buf: &mut Vec<u8>, n: usize) {
        buf.clear();
        buf.resize(n, 0);
        self.fill(buf);
    }

    /// Return exactly `n` bytes
    pub fn generate(&mut self, n: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        self.refill(&mut buf, n);
        buf
    }

    /// Stream exactly `n` bytes into `writer`
    pub fn write_to<W: Write>(&mut self, writer: &mut W, n: u64) -> io::Result<u64> {
        io::copy(&mut self.by_ref().take(n), writer)
    }
}

impl<R: RngCore> Read for ContentGenerator<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill(buf);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_exact_length() {
        let mut gen = ContentGenerator::with_seed(7);
        for n in [0usize, 1, 255, 4096, 128_000] {
            assert_eq!(gen.generate(n).len(), n);
        }
    }

    #[test]
    fn test_seeded_streams_match() {
        let mut a = ContentGenerator::with_seed(12345);
        let mut b = ContentGenerator::with_seed(12345);
        assert_eq!(a.generate(1024), b.generate(1024));
    }

    #[test]
    fn test_stream_continues_without_reseeding() {
        let mut gen = ContentGenerator::with_seed(1);
        let first = gen.generate(64);
        let second = gen.generate(64);
        assert_ne!(first, second);
    }

    #[test]
    fn test_refill_reuses_buffer() {
        let mut gen = ContentGenerator::with_seed(3);
        let mut buf = Vec::with_capacity(2_000_000);
        gen.refill(&mut buf, 512_000);
        assert_eq!(buf.len(), 512_000);
        gen.refill(&mut buf, 128_000);
        assert_eq!(buf.len(), 128_000);
        assert!(buf.capacity() >= 2_000_000);
    }

    #[test]
    fn test_generate_covers_byte_range() {
        let mut gen = ContentGenerator::with_seed(42);
        let data = gen.generate(64 * 1024);
        let mut seen = [false; 256];
        for b in data {
            seen[b as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_write_to_writes_exact_count() {
        let mut gen = ContentGenerator::with_seed(9);
        let mut out = Vec::new();
        let written = gen.write_to(&mut out, 10_000).unwrap();
        assert_eq!(written, 10_000);
        assert_eq!(out.len(), 10_000);
    }
}
