//! Verdict and analysis mode definitions.
//!
//! - `Verdict`: the binary classification rendered for a video
//! - `AnalysisMode`: which decision path produced it (trained model or
//!   heuristic frame analysis)

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Binary authenticity verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// The video appears authentic.
    Real,
    /// The video appears generated or manipulated.
    Fake,
}

impl Verdict {
    /// Map a classifier output index to a verdict.
    ///
    /// Index 1 is the REAL class, everything else is FAKE.
    pub fn from_class_index(index: usize) -> Self {
        if index == 1 {
            Verdict::Real
        } else {
            Verdict::Fake
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Real => "REAL",
            Verdict::Fake => "FAKE",
        }
    }

    pub fn is_fake(&self) -> bool {
        matches!(self, Verdict::Fake)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = VerdictParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REAL" => Ok(Verdict::Real),
            "FAKE" => Ok(Verdict::Fake),
            _ => Err(VerdictParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown verdict: {0}")]
pub struct VerdictParseError(String);

/// Decision path that produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Trained checkpoint: spatial features + temporal aggregation.
    #[default]
    Ml,
    /// Heuristic frame statistics, used when the model stack is unavailable.
    Demo,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Ml => "ml",
            AnalysisMode::Demo => "demo",
        }
    }

    /// Confidence precision used when recording verdicts of this mode.
    pub fn confidence_decimals(&self) -> u32 {
        match self {
            AnalysisMode::Ml => 2,
            AnalysisMode::Demo => 1,
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = AnalysisModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ml" | "model" => Ok(AnalysisMode::Ml),
            "demo" | "heuristic" => Ok(AnalysisMode::Demo),
            _ => Err(AnalysisModeParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown analysis mode: {0}")]
pub struct AnalysisModeParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_index_mapping() {
        assert_eq!(Verdict::from_class_index(1), Verdict::Real);
        assert_eq!(Verdict::from_class_index(0), Verdict::Fake);
        assert_eq!(Verdict::from_class_index(7), Verdict::Fake);
    }

    #[test]
    fn test_verdict_serde_uppercase() {
        assert_eq!(serde_json::to_string(&Verdict::Real).unwrap(), "\"REAL\"");
        let parsed: Verdict = serde_json::from_str("\"FAKE\"").unwrap();
        assert_eq!(parsed, Verdict::Fake);
    }

    #[test]
    fn test_verdict_parse() {
        assert_eq!("real".parse::<Verdict>().unwrap(), Verdict::Real);
        assert_eq!(" FAKE ".parse::<Verdict>().unwrap(), Verdict::Fake);
        assert!("maybe".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_mode_parse_and_display() {
        assert_eq!("demo".parse::<AnalysisMode>().unwrap(), AnalysisMode::Demo);
        assert_eq!("ML".parse::<AnalysisMode>().unwrap(), AnalysisMode::Ml);
        assert!("gpu".parse::<AnalysisMode>().is_err());
        assert_eq!(AnalysisMode::Demo.to_string(), "demo");
        assert_eq!(serde_json::to_string(&AnalysisMode::Ml).unwrap(), "\"ml\"");
    }
}
