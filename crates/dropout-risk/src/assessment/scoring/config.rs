use serde::{Deserialize, Serialize};

use crate::assessment::config::RulesError;

/// Points awarded when a measured value falls strictly below `below`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointBand {
    pub below: f64,
    pub points: u32,
}

impl PointBand {
    pub const fn new(below: f64, points: u32) -> Self {
        Self { below, points }
    }
}

/// Banded deficit scale: the first band whose edge the value sits under wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandedPoints {
    pub bands: Vec<PointBand>,
    pub cap: u32,
}

impl BandedPoints {
    pub(crate) fn award(&self, value: f64) -> u32 {
        let mut bands: Vec<&PointBand> = self.bands.iter().collect();
        bands.sort_by(|a, b| a.below.total_cmp(&b.below));
        bands
            .into_iter()
            .find(|band| value < band.below)
            .map(|band| band.points.min(self.cap))
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocioeconomicPoints {
    pub rural: u32,
    pub first_generation: u32,
    pub siblings_above: u32,
    pub many_siblings: u32,
    pub income_below: f64,
    pub low_income: u32,
    pub cap: u32,
}

impl Default for SocioeconomicPoints {
    fn default() -> Self {
        Self {
            rural: 5,
            first_generation: 8,
            siblings_above: 3,
            many_siblings: 4,
            income_below: 50_000.0,
            low_income: 8,
            cap: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcademicRiskPoints {
    pub medium_changed: u32,
    pub part_time_work: u32,
    pub failure_rate_above: f64,
    pub high_failure_rate: u32,
    pub cap: u32,
}

impl Default for AcademicRiskPoints {
    fn default() -> Self {
        Self {
            medium_changed: 5,
            part_time_work: 7,
            failure_rate_above: 0.3,
            high_failure_rate: 10,
            cap: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnologyPoints {
    pub no_laptop: u32,
    pub no_reliable_internet: u32,
    pub cap: u32,
}

impl Default for TechnologyPoints {
    fn default() -> Self {
        Self {
            no_laptop: 3,
            no_reliable_internet: 4,
            cap: 10,
        }
    }
}

/// Converts the point total into a bounded probability:
/// `min(ceiling, (points * weight + penalties) / 100)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityMapping {
    pub point_weight: f64,
    pub attendance_below: f64,
    pub attendance_penalty: f64,
    pub marks_below: f64,
    pub marks_penalty: f64,
    pub ceiling: f64,
}

impl Default for ProbabilityMapping {
    fn default() -> Self {
        Self {
            point_weight: 0.6,
            attendance_below: 50.0,
            attendance_penalty: 15.0,
            marks_below: 30.0,
            marks_penalty: 10.0,
            ceiling: 0.95,
        }
    }
}

/// Heuristic scoring tables: per-category point rules, caps, and the probability mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub version: String,
    pub attendance: BandedPoints,
    pub performance: BandedPoints,
    pub socioeconomic: SocioeconomicPoints,
    pub academic_risk: AcademicRiskPoints,
    pub technology: TechnologyPoints,
    pub total_cap: u32,
    pub probability: ProbabilityMapping,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            version: "heuristic-v1".to_string(),
            attendance: BandedPoints {
                bands: vec![
                    PointBand::new(60.0, 30),
                    PointBand::new(70.0, 20),
                    PointBand::new(80.0, 10),
                ],
                cap: 30,
            },
            performance: BandedPoints {
                bands: vec![
                    PointBand::new(40.0, 25),
                    PointBand::new(50.0, 20),
                    PointBand::new(60.0, 15),
                    PointBand::new(70.0, 10),
                ],
                cap: 25,
            },
            socioeconomic: SocioeconomicPoints::default(),
            academic_risk: AcademicRiskPoints::default(),
            technology: TechnologyPoints::default(),
            total_cap: 100,
            probability: ProbabilityMapping::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.version.trim().is_empty() {
            return Err(RulesError::Invalid(
                "scoring.version must not be empty".to_string(),
            ));
        }
        for (name, bands) in [
            ("attendance", &self.attendance),
            ("performance", &self.performance),
        ] {
            if let Some(band) = bands.bands.iter().find(|band| !band.below.is_finite()) {
                return Err(RulesError::Invalid(format!(
                    "scoring.{name} band edge {} must be finite",
                    band.below
                )));
            }
        }
        if self.total_cap == 0 || self.total_cap > 100 {
            return Err(RulesError::Invalid(format!(
                "scoring.total_cap {} must lie within 1..=100",
                self.total_cap
            )));
        }

        let mapping = &self.probability;
        let finite = [
            mapping.point_weight,
            mapping.attendance_below,
            mapping.attendance_penalty,
            mapping.marks_below,
            mapping.marks_penalty,
        ];
        if finite.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return Err(RulesError::Invalid(
                "scoring.probability weights must be finite and non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&mapping.ceiling) {
            return Err(RulesError::Invalid(format!(
                "scoring.probability.ceiling {} must lie within [0, 1]",
                mapping.ceiling
            )));
        }
        Ok(())
    }
}
