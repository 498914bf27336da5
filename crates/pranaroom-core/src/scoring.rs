//! End-of-session scoring.
//!
//! The score is the mean of the alignment channel, rounded to 0-100. Heart
//! rate and HRV are summarized alongside it as context but never feed the
//! score. Quality bands come from [`ScoringConfig`] thresholds.
//!
//! | Condition            | Band        |
//! |----------------------|-------------|
//! | score >= elite       | Elite       |
//! | score >= good        | Good        |
//! | otherwise            | Needs Focus |

use serde::{Deserialize, Serialize};

use crate::biometrics::BiometricSample;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    Elite,
    Good,
    NeedsFocus,
}

impl QualityBand {
    pub fn label(self) -> &'static str {
        match self {
            QualityBand::Elite => "Elite",
            QualityBand::Good => "Good",
            QualityBand::NeedsFocus => "Needs Focus",
        }
    }
}

/// Band thresholds on the 0-100 score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_elite")]
    pub elite: f64,
    #[serde(default = "default_good")]
    pub good: f64,
}

fn default_elite() -> f64 {
    90.0
}
fn default_good() -> f64 {
    75.0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            elite: default_elite(),
            good: default_good(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        if !in_range(self.elite) || !in_range(self.good) {
            return Err(ConfigError::InvalidValue {
                key: "scoring".into(),
                message: "thresholds must lie within 0..=100".into(),
            });
        }
        if self.good > self.elite {
            return Err(ConfigError::InvalidValue {
                key: "scoring.good".into(),
                message: format!("good ({}) must not exceed elite ({})", self.good, self.elite),
            });
        }
        Ok(())
    }
}

/// Aggregate result of one session. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Active (unpaused) session time.
    pub duration_ms: u64,
    pub score: u8,
    pub quality: QualityBand,
    /// Phases (breath) or items (pose, meditation) completed.
    pub completed_units: u64,
    pub sample_count: usize,
    /// Set when no sample was collected; all statistics are then zero.
    pub insufficient_data: bool,
    pub average_alignment: f64,
    pub peak_alignment: f64,
    /// Share of samples at or above the elite threshold, 0.0-1.0.
    pub coherent_share: f64,
    pub average_heart_rate: f64,
    pub average_hrv: f64,
    /// Last minus first sample.
    pub heart_rate_delta: f64,
    /// Last minus first sample.
    pub hrv_delta: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn band(&self, score: u8) -> QualityBand {
        let score = score as f64;
        if score >= self.config.elite {
            QualityBand::Elite
        } else if score >= self.config.good {
            QualityBand::Good
        } else {
            QualityBand::NeedsFocus
        }
    }

    pub fn summarize(
        &self,
        samples: &[BiometricSample],
        total_elapsed_ms: u64,
        completed_units: u64,
    ) -> SessionSummary {
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return SessionSummary {
                duration_ms: total_elapsed_ms,
                score: 0,
                quality: self.band(0),
                completed_units,
                sample_count: 0,
                insufficient_data: true,
                average_alignment: 0.0,
                peak_alignment: 0.0,
                coherent_share: 0.0,
                average_heart_rate: 0.0,
                average_hrv: 0.0,
                heart_rate_delta: 0.0,
                hrv_delta: 0.0,
            };
        };

        let n = samples.len() as f64;
        let mean = |f: fn(&BiometricSample) -> f64| samples.iter().map(f).sum::<f64>() / n;
        let average_alignment = mean(|s| s.alignment);
        let peak_alignment = samples
            .iter()
            .map(|s| s.alignment)
            .fold(f64::MIN, f64::max);
        let coherent = samples
            .iter()
            .filter(|s| s.alignment >= self.config.elite)
            .count();
        let score = average_alignment.round().clamp(0.0, 100.0) as u8;

        SessionSummary {
            duration_ms: total_elapsed_ms,
            score,
            quality: self.band(score),
            completed_units,
            sample_count: samples.len(),
            insufficient_data: false,
            average_alignment,
            peak_alignment,
            coherent_share: coherent as f64 / n,
            average_heart_rate: mean(|s| s.heart_rate),
            average_hrv: mean(|s| s.hrv),
            heart_rate_delta: last.heart_rate - first.heart_rate,
            hrv_delta: last.hrv - first.hrv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(offset_ms: u64, heart_rate: f64, hrv: f64, alignment: f64) -> BiometricSample {
        BiometricSample {
            offset_ms,
            heart_rate,
            hrv,
            alignment,
        }
    }

    #[test]
    fn empty_samples_flag_insufficient_data() {
        let summary = ScoringEngine::default().summarize(&[], 0, 0);
        assert!(summary.insufficient_data);
        assert_eq!(summary.score, 0);
        assert_eq!(summary.quality, QualityBand::NeedsFocus);
        assert_eq!(summary.sample_count, 0);
    }

    #[test]
    fn score_uses_alignment_only() {
        let engine = ScoringEngine::default();
        let samples = [
            sample(100, 110.0, 30.0, 90.0),
            sample(200, 55.0, 100.0, 96.0),
        ];
        let summary = engine.summarize(&samples, 200, 2);
        assert_eq!(summary.score, 93);
        assert_eq!(summary.quality, QualityBand::Elite);
        assert_eq!(summary.peak_alignment, 96.0);
        assert_eq!(summary.hrv_delta, 70.0);
        assert_eq!(summary.heart_rate_delta, -55.0);
        assert_eq!(summary.coherent_share, 1.0);
        assert!(!summary.insufficient_data);
    }

    #[test]
    fn band_thresholds_are_configurable() {
        let default = ScoringEngine::default();
        assert_eq!(default.band(90), QualityBand::Elite);
        assert_eq!(default.band(89), QualityBand::Good);
        assert_eq!(default.band(75), QualityBand::Good);
        assert_eq!(default.band(74), QualityBand::NeedsFocus);

        let strict = ScoringEngine::new(ScoringConfig {
            elite: 98.0,
            good: 95.0,
        });
        assert_eq!(strict.band(96), QualityBand::Good);
        assert_eq!(strict.band(90), QualityBand::NeedsFocus);
        assert_eq!(QualityBand::NeedsFocus.label(), "Needs Focus");
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let config = ScoringConfig {
            elite: 70.0,
            good: 80.0,
        };
        assert!(config.validate().is_err());
        assert!(ScoringConfig::default().validate().is_ok());
    }
}
