// THEORY:
// Tissue density is the share of mask cells labelled tissue, as a percentage. It is
// the only number the scorers see.

use crate::core_modules::segmenter::Mask;
use std::fmt;

/// Percentage of pixels labelled tissue, in `[0, 100]`.
///
/// Full precision is kept; `Display` rounds to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Density(f64);

impl Density {
    pub const MIN: Density = Density(0.0);
    pub const MAX: Density = Density(100.0);

    /// Wraps a raw percentage. Values outside `[0, 100]` are clamped; NaN becomes 0.
    pub fn from_percent(percent: f64) -> Self {
        if percent.is_nan() {
            return Self::MIN;
        }
        Density(percent.clamp(0.0, 100.0))
    }

    pub fn percent(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

/// `100 * tissue / total`, with integer counts promoted before dividing.
pub fn density(mask: &Mask) -> Density {
    let total = mask.len();
    if total == 0 {
        return Density::MIN;
    }
    Density(100.0 * mask.tissue_count() as f64 / total as f64)
}
