// THEORY:
// A scorer maps tissue density onto a bounded fibrosis severity score. The pipeline
// only ever sees the `Scorer` trait; which curve is active is decided once, from
// configuration, when the pipeline is built.
//
// Two curves ship with the crate:
// -   `BiologicalRangeScorer`: densities up to 12% carry no fibrosis signal; the
//     empirical 12-75% band is stretched linearly onto the 0-5 Ashcroft scale and
//     clamped at both ends. One decimal place.
// -   `CustomRangeScorer`: an operator-calibrated narrow band (34-36% by default).
//     Below the band the score sits on a non-zero floor (0.1), above it on the
//     ceiling (5.0), and it interpolates linearly in between. Two decimal places.
//
// Both are monotone non-decreasing in density and total over every `Density`.

use crate::core_modules::density::Density;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A severity score produced by a `Scorer`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Score(f64);

impl Score {
    pub fn value(self) -> f64 {
        self.0
    }

    /// Formats with a fixed number of decimals, e.g. the scorer's precision.
    pub fn display_with(self, precision: u32) -> String {
        format!("{:.*}", precision as usize, self.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug keeps a trailing ".0" on whole numbers.
        write!(f, "{:?}", self.0)
    }
}

/// Closed interval a scorer's output is confined to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    pub fn contains(&self, score: Score) -> bool {
        (self.min..=self.max).contains(&score.value())
    }
}

/// Density-to-severity mapping.
pub trait Scorer: Send + Sync {
    fn score(&self, density: Density) -> Score;

    fn range(&self) -> ScoreRange;

    /// Decimal places the score is rounded to.
    fn precision(&self) -> u32;

    fn name(&self) -> &'static str;
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Literature-derived curve on the 0-5 scale.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiologicalRangeScorer;

impl BiologicalRangeScorer {
    const FLOOR_DENSITY: f64 = 12.0;
    const CALIBRATION_TOP: f64 = 75.0;
    const MAX_SCORE: f64 = 5.0;
    const SEVERITY_STEPS: f64 = 8.0;
    const PRECISION: u32 = 1;
}

impl Scorer for BiologicalRangeScorer {
    fn score(&self, density: Density) -> Score {
        let d = density.percent();
        if d.is_nan() || d <= Self::FLOOR_DENSITY {
            return Score(0.0);
        }
        let raw = (d * 2.0 - Self::FLOOR_DENSITY) * Self::SEVERITY_STEPS
            / (Self::CALIBRATION_TOP - Self::FLOOR_DENSITY);
        Score(round_to(raw.clamp(0.0, Self::MAX_SCORE), Self::PRECISION))
    }

    fn range(&self) -> ScoreRange {
        ScoreRange {
            min: 0.0,
            max: Self::MAX_SCORE,
        }
    }

    fn precision(&self) -> u32 {
        Self::PRECISION
    }

    fn name(&self) -> &'static str {
        "biological-range"
    }
}

/// Operator-calibrated band between `lower` and `upper` density percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomRangeScorer {
    pub lower: f64,
    pub upper: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for CustomRangeScorer {
    fn default() -> Self {
        Self {
            lower: 34.0,
            upper: 36.0,
            floor: 0.1,
            ceiling: 5.0,
        }
    }
}

impl CustomRangeScorer {
    const PRECISION: u32 = 2;

    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [self.lower, self.upper, self.floor, self.ceiling];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid(
                "custom range bounds must be finite".to_string(),
            ));
        }
        if self.lower >= self.upper {
            return Err(ConfigError::Invalid(format!(
                "custom range lower bound {} must be below upper bound {}",
                self.lower, self.upper
            )));
        }
        if self.floor > self.ceiling {
            return Err(ConfigError::Invalid(format!(
                "custom range floor {} must not exceed ceiling {}",
                self.floor, self.ceiling
            )));
        }
        Ok(())
    }
}

impl Scorer for CustomRangeScorer {
    fn score(&self, density: Density) -> Score {
        let d = density.percent();
        if d.is_nan() || d <= self.lower {
            return Score(self.floor);
        }
        if d >= self.upper {
            return Score(self.ceiling);
        }
        let raw =
            (d - self.lower) * (self.ceiling - self.floor) / (self.upper - self.lower) + self.floor;
        Score(round_to(raw, Self::PRECISION).clamp(self.floor, self.ceiling))
    }

    fn range(&self) -> ScoreRange {
        ScoreRange {
            min: self.floor,
            max: self.ceiling,
        }
    }

    fn precision(&self) -> u32 {
        Self::PRECISION
    }

    fn name(&self) -> &'static str {
        "custom-range"
    }
}

/// Which scoring curve a pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "kebab-case")]
pub enum ScoringVariant {
    #[default]
    BiologicalRange,
    CustomRange(CustomRangeScorer),
}

impl ScoringVariant {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ScoringVariant::BiologicalRange => Ok(()),
            ScoringVariant::CustomRange(scorer) => scorer.validate(),
        }
    }

    pub fn build(&self) -> Box<dyn Scorer> {
        match self {
            ScoringVariant::BiologicalRange => Box::new(BiologicalRangeScorer),
            ScoringVariant::CustomRange(scorer) => Box::new(*scorer),
        }
    }
}
