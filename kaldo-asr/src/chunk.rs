//! Fixed-size sample blocks.
//!
//! The recognizer runs its whole per-block pipeline once per block, so block
//! boundaries decide where endpoints can be detected. Keeping them fixed in
//! sample positions makes results independent of how callers slice audio.

use crate::error::ConfigError;

/// Default block size in samples (0.25 s at 16 kHz)
pub const DEFAULT_CHUNK_SAMPLES: usize = 4000;

/// Configuration for audio blocking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Samples per block
    pub samples: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_CHUNK_SAMPLES,
        }
    }
}

impl ChunkConfig {
    /// Create a new chunk configuration.
    pub fn new(samples: usize) -> Result<Self, ConfigError> {
        if samples == 0 {
            return Err(ConfigError::InvalidChunkSize(samples));
        }
        Ok(Self { samples })
    }

    /// Block duration in seconds at `sample_rate`.
    pub fn duration_secs(&self, sample_rate: f32) -> f32 {
        self.samples as f32 / sample_rate
    }

    /// Lazily split a sample stream into blocks.
    pub fn chunks<I>(&self, samples: I) -> Chunks<I::IntoIter>
    where
        I: IntoIterator<Item = f32>,
    {
        Chunks {
            samples: samples.into_iter(),
            size: self.samples.max(1),
            done: false,
        }
    }

    /// Number of blocks produced for `len` samples.
    pub fn count(&self, len: usize) -> usize {
        len.div_ceil(self.samples.max(1))
    }
}

/// Finite, single-pass iterator of sample blocks; the last may be short.
#[derive(Debug)]
pub struct Chunks<I> {
    samples: I,
    size: usize,
    done: bool,
}

impl<I: Iterator<Item = f32>> Iterator for Chunks<I> {
    type Item = Vec<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let block: Vec<f32> = self.samples.by_ref().take(self.size).collect();
        if block.len() < self.size {
            self.done = true;
        }

        (!block.is_empty()).then_some(block)
    }
}

impl<I: Iterator<Item = f32>> std::iter::FusedIterator for Chunks<I> {}
