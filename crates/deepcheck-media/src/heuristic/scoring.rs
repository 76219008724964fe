//! Threshold bands and verdict rules for the heuristic analyzer.
//!
//! Each statistic is checked against a fixed table of bands; a matching band
//! adds its weight to either the fake or the real accumulator. The totals are
//! then run through an ordered list of rules.

use deepcheck_models::Verdict;

use super::features::HeuristicFeatures;

/// Aggregate a band reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    SharpnessMean,
    SharpnessStd,
    MotionMean,
    MotionStd,
    ColourMean,
    ColourStd,
}

impl Statistic {
    fn read(self, f: &HeuristicFeatures) -> f64 {
        match self {
            Statistic::SharpnessMean => f.sharpness_mean,
            Statistic::SharpnessStd => f.sharpness_std,
            Statistic::MotionMean => f.motion_mean,
            Statistic::MotionStd => f.motion_std,
            Statistic::ColourMean => f.colour_mean,
            Statistic::ColourStd => f.colour_std,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Open,
    Inclusive(f64),
    Exclusive(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulator {
    Fake,
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub statistic: Statistic,
    pub lower: Bound,
    pub upper: Bound,
    pub accumulator: Accumulator,
    pub weight: u32,
}

impl Band {
    /// NaN never matches.
    pub fn contains(&self, x: f64) -> bool {
        if x.is_nan() {
            return false;
        }
        let above = match self.lower {
            Bound::Open => true,
            Bound::Inclusive(b) => x >= b,
            Bound::Exclusive(b) => x > b,
        };
        let below = match self.upper {
            Bound::Open => true,
            Bound::Inclusive(b) => x <= b,
            Bound::Exclusive(b) => x < b,
        };
        above && below
    }
}

const fn band(
    statistic: Statistic,
    lower: Bound,
    upper: Bound,
    accumulator: Accumulator,
    weight: u32,
) -> Band {
    Band {
        statistic,
        lower,
        upper,
        accumulator,
        weight,
    }
}

use Accumulator::{Fake, Real};
use Bound::{Exclusive as Ex, Inclusive as In, Open};
use Statistic::*;

pub const BANDS: &[Band] = &[
    band(SharpnessMean, Open, Ex(80.0), Fake, 4),
    band(SharpnessMean, In(80.0), Ex(150.0), Fake, 2),
    band(SharpnessMean, In(150.0), In(400.0), Real, 3),
    band(SharpnessMean, Ex(400.0), Open, Real, 2),
    band(SharpnessStd, Open, Ex(15.0), Fake, 3),
    band(SharpnessStd, In(15.0), Ex(40.0), Fake, 1),
    band(SharpnessStd, In(40.0), In(150.0), Real, 3),
    band(SharpnessStd, Ex(150.0), Open, Real, 2),
    band(MotionMean, Open, Ex(2.0), Fake, 2),
    band(MotionMean, In(2.0), Ex(8.0), Real, 2),
    band(MotionMean, In(8.0), In(25.0), Real, 3),
    band(MotionMean, Ex(25.0), Open, Real, 1),
    band(MotionStd, Open, Ex(1.5), Fake, 5),
    band(MotionStd, In(1.5), Ex(3.0), Fake, 3),
    band(MotionStd, In(3.0), Ex(6.0), Real, 2),
    band(MotionStd, In(6.0), Open, Real, 4),
    band(ColourMean, Open, Ex(5.0), Fake, 1),
    band(ColourMean, In(5.0), Ex(15.0), Fake, 0),
    band(ColourMean, In(15.0), Open, Real, 1),
    band(ColourStd, Open, Ex(2.0), Fake, 1),
    band(ColourStd, In(3.0), Open, Real, 1),
];

/// Accumulated evidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreCard {
    pub fake: u32,
    pub real: u32,
}

/// Evaluate every band against the features.
pub fn score(features: &HeuristicFeatures) -> ScoreCard {
    let mut card = ScoreCard::default();
    for band in BANDS {
        if band.contains(band.statistic.read(features)) {
            match band.accumulator {
                Accumulator::Fake => card.fake += band.weight,
                Accumulator::Real => card.real += band.weight,
            }
        }
    }
    card
}

/// Lowest and highest confidence the heuristic analyzer reports.
pub const CONFIDENCE_FLOOR: f64 = 50.0;
pub const CONFIDENCE_CEILING: f64 = 95.0;

/// Apply the verdict rules; the first matching rule wins.
pub fn decide(card: ScoreCard, motion_std: f64) -> (Verdict, f64) {
    let fake = card.fake as i64;
    let real = card.real as i64;

    let (verdict, confidence) = if fake >= 8 {
        (Verdict::Fake, 93f64.min(75.0 + (fake - 8).min(15) as f64))
    } else if fake >= 5 && fake > real {
        (Verdict::Fake, 92f64.min(70.0 + ((fake - 5) * 2) as f64))
    } else if real > fake + 2 {
        (Verdict::Real, 93f64.min(72.0 + (real - 3).min(15) as f64))
    } else if real >= 6 {
        (Verdict::Real, 90f64.min(70.0 + ((real - 4) * 2) as f64))
    } else if motion_std < 2.0 {
        (Verdict::Fake, 70.0)
    } else {
        (Verdict::Real, 72.0)
    };

    (verdict, confidence.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING))
}
