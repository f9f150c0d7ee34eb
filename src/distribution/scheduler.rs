//! Weighted, shuffled sample schedule
//!
//! Each bucket contributes `floor(weight * num_files)` samples, then the whole
//! list is shuffled with Fisher-Yates so every ordering is equally likely.
//! The truncation is deliberate: a schedule can come out shorter than the
//! requested count and is never topped up.

use super::{Sample, SizeBucket, SizeTable};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Produces the sequence of files a driver session creates
pub struct SampleScheduler<R: Rng = Xoshiro256PlusPlus> {
    table: SizeTable,
    rng: R,
}

impl SampleScheduler<Xoshiro256PlusPlus> {
    /// Create a scheduler with a random seed
    pub fn new(table: SizeTable) -> Self {
        Self::from_rng(table, Xoshiro256PlusPlus::from_entropy())
    }

    /// Create a scheduler with a specific seed
    ///
    /// Useful for reproducible tests.
    pub fn with_seed(table: SizeTable, seed: u64) -> Self {
        Self::from_rng(table, Xoshiro256PlusPlus::seed_from_u64(seed))
    }
}

impl<R: Rng> SampleScheduler<R> {
    pub fn from_rng(table: SizeTable, rng: R) -> Self {
        Self { table, rng }
    }

    pub fn table(&self) -> &SizeTable {
        &self.table
    }

    /// Bucket-ordered samples before shuffling
    pub fn unshuffled(&self, num_files: usize) -> Vec<Sample> {
        let mut samples = Vec::with_capacity(self.table.scheduled_len(num_files));
        for (idx, entry) in self.table.entries().iter().enumerate() {
            let count = self.table.files_in_bucket(idx, num_files);
            samples.extend(std::iter::repeat(Sample {
                bucket: SizeBucket(idx),
                byte_size: entry.bytes,
            }).take(count));
        }
        samples
    }

    /// Shuffled schedule for `num_files` requested files
    pub fn schedule(&mut self, num_files: usize) -> Vec<Sample> {
        let mut samples = self.unshuffled(num_files);
        samples.shuffle(&mut self.rng);
        samples
    }
}
