use rand::Rng;

/// Default bin count for empirical distributions.
pub const EDI_BINS: usize = 100;

/// A binned empirical distribution fitted over a sample of values.
///
/// Sampling draws a bin with probability proportional to its count, then a
/// value uniformly within the bin bounds. Used both for the empirical mock
/// randomization of ratios and for calibrating the parametric score against
/// the mock score distribution.
#[derive(Debug, Clone)]
pub struct EmpiricalDistribution {
    min: f64,
    bin_width: f64,
    counts: Vec<usize>,
    total: usize,
}

impl EmpiricalDistribution {
    /// Fit a histogram with `bins` bins over the finite values in `values`.
    ///
    /// Returns `None` when no finite values are present; callers decide
    /// whether that is an error.
    pub fn fit(values: &[f64], bins: usize) -> Option<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() || bins == 0 {
            return None;
        }

        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // Degenerate sample: all mass in one bin of zero width.
        let span = (max - min).max(f64::MIN_POSITIVE);
        let bin_width = span / bins as f64;

        let mut counts = vec![0usize; bins];
        for v in &finite {
            let idx = (((v - min) / bin_width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Some(Self { min, bin_width, counts, total: finite.len() })
    }

    /// Draw one value from the fitted distribution.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let mut target = rng.gen_range(0..self.total);
        let mut bin = self.counts.len() - 1;
        for (i, count) in self.counts.iter().enumerate() {
            if target < *count {
                bin = i;
                break;
            }
            target -= count;
        }
        let lo = self.min + bin as f64 * self.bin_width;
        let hi = lo + self.bin_width;
        // Degenerate fit: the bin has no width to sample within.
        if hi <= lo {
            return lo;
        }
        rng.gen_range(lo..hi)
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
