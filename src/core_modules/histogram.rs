// THEORY:
// The histogram module turns a luminance plane into the one statistic the segmenter
// needs: where to cut it in two. Otsu's method is applied exhaustively over all 256
// candidate cut points. A threshold `t` splits the levels into "below" (`< t`) and
// "at or above" (`>= t`); the chosen `t` maximises the between-class variance
//
//     sigma_b^2(t) = w_below * w_above * (mean_below - mean_above)^2
//
// which, with integer counts, equals `(N * sum_below - n_below * sum_total)^2 /
// (N^2 * n_below * n_above)`. Class counts and sums are accumulated as integers and
// each candidate is then evaluated in `f64`. The scan order and the comparison are
// fixed, so the same histogram always yields the same threshold, but two candidates
// closer than `f64` resolution compare as a tie. Ties keep the lowest `t`.
//
// When no cut separates two non-empty classes the threshold is 1, so only level 0
// falls in the dark class: an all-black slide is all tissue, any other uniform
// slide is all background.

use crate::core_modules::pixel::pixel::Luminance;

pub const BINS: usize = 256;

/// Cut reported when the histogram cannot be split.
const NO_SPLIT: Luminance = 1;

/// Result of the threshold search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtsuThreshold {
    /// Levels strictly below this value form the dark class.
    pub level: Luminance,
    /// Between-class variance at `level`, in squared luminance units. Zero when no
    /// cut separates two non-empty classes, in which case `level` is 1.
    pub between_class_variance: f64,
}

/// A 256-bin histogram of luminance levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuminanceHistogram {
    bins: [u64; BINS],
    total: u64,
}

impl Default for LuminanceHistogram {
    fn default() -> Self {
        Self {
            bins: [0; BINS],
            total: 0,
        }
    }
}

impl LuminanceHistogram {
    pub fn from_levels<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = Luminance>,
    {
        let mut histogram = Self::default();
        for level in levels {
            histogram.bins[level as usize] += 1;
            histogram.total += 1;
        }
        histogram
    }

    pub fn bins(&self) -> &[u64; BINS] {
        &self.bins
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Exhaustive Otsu search. Returns level 1 (only black below) when the
    /// histogram has fewer than two occupied bins.
    pub fn otsu_threshold(&self) -> OtsuThreshold {
        let mut best = OtsuThreshold {
            level: NO_SPLIT,
            between_class_variance: 0.0,
        };
        if self.total == 0 {
            return best;
        }

        let total = self.total as i128;
        let sum_total: i128 = self
            .bins
            .iter()
            .enumerate()
            .map(|(level, &count)| level as i128 * count as i128)
            .sum();
        let normaliser = (self.total as f64) * (self.total as f64);

        let mut weight_below: i128 = 0;
        let mut sum_below: i128 = 0;
        for cut in 1..BINS {
            let previous = cut - 1;
            weight_below += self.bins[previous] as i128;
            sum_below += previous as i128 * self.bins[previous] as i128;

            if weight_below == 0 {
                continue;
            }
            let weight_above = total - weight_below;
            if weight_above == 0 {
                break;
            }

            let spread = (total * sum_below - weight_below * sum_total) as f64;
            let variance =
                spread * spread / (weight_below as f64 * weight_above as f64) / normaliser;

            if variance > best.between_class_variance {
                best = OtsuThreshold {
                    level: cut as Luminance,
                    between_class_variance: variance,
                };
            }
        }
        best
    }
}
