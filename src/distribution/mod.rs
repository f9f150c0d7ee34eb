//! File-size distribution
//!
//! This module decides which file sizes a session exercises. A [`SizeTable`]
//! lists the size buckets and the share of files each gets; the
//! [`SampleScheduler`](scheduler::SampleScheduler) turns a table and a file
//! count into a shuffled list of [`Sample`]s.
//!
//! # Default table
//!
//! | bytes     | weight |
//! |-----------|--------|
//! | 128 000   | 0.70   |
//! | 512 000   | 0.20   |
//! | 1 000 000 | 0.05   |
//! | 2 000 000 | 0.05   |
//!
//! # Example
//!
//! ```
//! use syncprobe::distribution::{SizeTable, scheduler::SampleScheduler};
//!
//! let mut scheduler = SampleScheduler::with_seed(SizeTable::default(), 1);
//! let samples = scheduler.schedule(50);
//! assert_eq!(samples.len(), 49); // floor() per bucket drops one file
//! ```

use serde::{Deserialize, Serialize};

pub mod scheduler;

pub use scheduler::SampleScheduler;

/// One row of the size table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeWeight {
    /// File size in bytes
    pub bytes: u64,
    /// Share of scheduled files in this bucket (0.0-1.0)
    pub weight: f64,
}

/// Index of a bucket within its [`SizeTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SizeBucket(pub usize);

/// One file to create and delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub bucket: SizeBucket,
    pub byte_size: u64,
}

/// Weighted file-size buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeTable {
    entries: Vec<SizeWeight>,
}

impl SizeTable {
    /// Build a table from explicit rows
    ///
    /// Weights are checked by the config validator, not here.
    pub fn new(entries: Vec<SizeWeight>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SizeWeight] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of files bucket `idx` receives out of `num_files`
    ///
    /// Truncates; the total across buckets may be less than `num_files`.
    pub fn files_in_bucket(&self, idx: usize, num_files: usize) -> usize {
        (self.entries[idx].weight * num_files as f64) as usize
    }

    /// Total number of samples a schedule of `num_files` will contain
    pub fn scheduled_len(&self, num_files: usize) -> usize {
        (0..self.entries.len())
            .map(|idx| self.files_in_bucket(idx, num_files))
            .sum()
    }
}

impl Default for SizeTable {
    fn default() -> Self {
        Self::new(vec![
            SizeWeight { bytes: 128_000, weight: 0.70 },
            SizeWeight { bytes: 512_000, weight: 0.20 },
            SizeWeight { bytes: 1_000_000, weight: 0.05 },
            SizeWeight { bytes: 2_000_000, weight: 0.05 },
        ])
    }
}
