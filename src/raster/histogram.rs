//! 256-bin intensity histogram.

use std::ops::Index;

use serde::Serialize;

use super::RasterBuffer;

/// Number of bins, one per byte value.
pub const BINS: usize = 256;

/// Sample counts per byte value over a raster's flat buffer.
///
/// Channels are not distinguished, so the counts are per-intensity only for
/// single-channel rasters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    bins: [u64; BINS],
}

impl Histogram {
    /// Count every byte of `samples`.
    pub fn from_samples(samples: &[u8]) -> Self {
        let mut bins = [0u64; BINS];
        for &sample in samples {
            bins[sample as usize] += 1;
        }
        Self { bins }
    }

    /// Histogram of the raster's current contents.
    pub fn of(raster: &RasterBuffer) -> Self {
        Self::from_samples(raster.pixels())
    }

    pub fn bins(&self) -> &[u64; BINS] {
        &self.bins
    }

    /// Sum of all bins.
    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Index of the lowest bin with a zero count.
    pub fn first_empty_bin(&self) -> Option<usize> {
        self.bins.iter().position(|&count| count == 0)
    }

    /// Lowest occupied value.
    pub fn min_value(&self) -> Option<u8> {
        self.bins.iter().position(|&c| c > 0).map(|i| i as u8)
    }

    /// Highest occupied value.
    pub fn max_value(&self) -> Option<u8> {
        self.bins.iter().rposition(|&c| c > 0).map(|i| i as u8)
    }

    pub fn mean(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let weighted: f64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(value, &count)| value as f64 * count as f64)
            .sum();
        Some(weighted / total as f64)
    }

    /// Summary statistics for reporting.
    pub fn summary(&self) -> HistogramSummary {
        HistogramSummary {
            samples: self.total(),
            min: self.min_value(),
            max: self.max_value(),
            mean: self.mean(),
            occupied_bins: self.bins.iter().filter(|&&c| c > 0).count(),
        }
    }
}

impl Index<u8> for Histogram {
    type Output = u64;

    fn index(&self, value: u8) -> &u64 {
        &self.bins[value as usize]
    }
}

impl Index<usize> for Histogram {
    type Output = u64;

    fn index(&self, bin: usize) -> &u64 {
        &self.bins[bin]
    }
}

/// Compact description of a histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSummary {
    pub samples: u64,
    pub min: Option<u8>,
    pub max: Option<u8>,
    pub mean: Option<f64>,
    pub occupied_bins: usize,
}
