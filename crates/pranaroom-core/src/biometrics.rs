//! Simulated live biofeedback.
//!
//! Each channel follows a bounded random walk that relaxes toward a target.
//! The target drifts from a resting baseline to a "settled" value as the
//! session goes on (heart rate down, HRV and alignment up), which is what a
//! practitioner expects to see on screen. Values are clamped to the
//! channel's physiological range on every sample.
//!
//! The simulator owns no random state; callers pass the generator in, so a
//! seeded [`SimRng`] reproduces a session exactly.

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Random source used for biometrics.
pub type SimRng = Mcg128Xsl64;

/// Seeded generator, or entropy-seeded when `seed` is `None`.
pub fn sim_rng(seed: Option<u64>) -> SimRng {
    match seed {
        Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
        None => Mcg128Xsl64::from_entropy(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiometricSample {
    /// Session time at which the sample was taken.
    pub offset_ms: u64,
    /// Beats per minute.
    pub heart_rate: f64,
    /// Heart-rate variability in milliseconds.
    pub hrv: f64,
    /// Alignment / coherence score, 0-100.
    pub alignment: f64,
}

/// Bounds and dynamics for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub min: f64,
    pub max: f64,
    /// Value at session start.
    pub baseline: f64,
    /// Value the channel drifts toward once the practitioner settles.
    pub settled: f64,
    /// Random step per square-root second.
    pub jitter: f64,
}

impl ChannelConfig {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn validate(&self, key: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let all_finite = [self.min, self.max, self.baseline, self.settled, self.jitter]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(invalid("values must be finite".into()));
        }
        if self.min >= self.max {
            return Err(invalid(format!("min {} must be below max {}", self.min, self.max)));
        }
        if !self.contains(self.baseline) || !self.contains(self.settled) {
            return Err(invalid(format!(
                "baseline and settled must lie within {}..={}",
                self.min, self.max
            )));
        }
        if self.jitter < 0.0 {
            return Err(invalid("jitter must not be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Fixed seed for reproducible sessions.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Time constant of the baseline-to-settled drift, in seconds.
    #[serde(default = "default_settle_secs")]
    pub settle_secs: f64,
    /// Fraction of the gap to the target closed per second.
    #[serde(default = "default_reversion")]
    pub reversion: f64,
    #[serde(default = "default_heart_rate")]
    pub heart_rate: ChannelConfig,
    #[serde(default = "default_hrv")]
    pub hrv: ChannelConfig,
    #[serde(default = "default_alignment")]
    pub alignment: ChannelConfig,
}

fn default_settle_secs() -> f64 {
    120.0
}
fn default_reversion() -> f64 {
    0.15
}
fn default_heart_rate() -> ChannelConfig {
    ChannelConfig {
        min: 50.0,
        max: 120.0,
        baseline: 74.0,
        settled: 62.0,
        jitter: 1.2,
    }
}
fn default_hrv() -> ChannelConfig {
    ChannelConfig {
        min: 20.0,
        max: 120.0,
        baseline: 60.0,
        settled: 85.0,
        jitter: 2.0,
    }
}
fn default_alignment() -> ChannelConfig {
    ChannelConfig {
        min: 0.0,
        max: 100.0,
        baseline: 78.0,
        settled: 93.0,
        jitter: 1.5,
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            settle_secs: default_settle_secs(),
            reversion: default_reversion(),
            heart_rate: default_heart_rate(),
            hrv: default_hrv(),
            alignment: default_alignment(),
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.heart_rate.validate("biometrics.heart_rate")?;
        self.hrv.validate("biometrics.hrv")?;
        self.alignment.validate("biometrics.alignment")?;
        if !(self.settle_secs.is_finite() && self.settle_secs > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "biometrics.settle_secs".into(),
                message: "must be positive".into(),
            });
        }
        if !(self.reversion.is_finite() && self.reversion >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "biometrics.reversion".into(),
                message: "must not be negative".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BiometricSimulator {
    config: SimulatorConfig,
}

impl BiometricSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Resting values at session start.
    pub fn initial(&self) -> BiometricSample {
        let c = &self.config;
        BiometricSample {
            offset_ms: 0,
            heart_rate: c.heart_rate.clamp(c.heart_rate.baseline),
            hrv: c.hrv.clamp(c.hrv.baseline),
            alignment: c.alignment.clamp(c.alignment.baseline),
        }
    }

    /// Next sample, derived from `previous` by a bounded perturbation.
    pub fn sample<R: Rng>(
        &self,
        rng: &mut R,
        previous: &BiometricSample,
        elapsed_ms: u64,
    ) -> BiometricSample {
        let c = &self.config;
        let dt_secs = elapsed_ms.saturating_sub(previous.offset_ms) as f64 / 1000.0;
        let progress = 1.0 - (-(elapsed_ms as f64 / 1000.0) / c.settle_secs).exp();
        let pull = 1.0 - (-c.reversion * dt_secs).exp();
        let noise_scale = dt_secs.sqrt();

        let mut step = |channel: &ChannelConfig, prev: f64| -> f64 {
            let target = channel.baseline + (channel.settled - channel.baseline) * progress;
            let noise: f64 = rng.gen_range(-1.0..=1.0);
            channel.clamp(prev + (target - prev) * pull + noise * channel.jitter * noise_scale)
        };

        BiometricSample {
            offset_ms: elapsed_ms,
            heart_rate: step(&c.heart_rate, previous.heart_rate),
            hrv: step(&c.hrv, previous.hrv),
            alignment: step(&c.alignment, previous.alignment),
        }
    }
}

impl Default for BiometricSimulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(sim: &BiometricSimulator, seed: u64, n: u64, tick_ms: u64) -> Vec<BiometricSample> {
        let mut rng = sim_rng(Some(seed));
        let mut prev = sim.initial();
        (1..=n)
            .map(|i| {
                prev = sim.sample(&mut rng, &prev, i * tick_ms);
                prev
            })
            .collect()
    }

    #[test]
    fn same_seed_same_samples() {
        let sim = BiometricSimulator::default();
        assert_eq!(run(&sim, 7, 50, 100), run(&sim, 7, 50, 100));
        assert_ne!(run(&sim, 7, 50, 100), run(&sim, 8, 50, 100));
    }

    #[test]
    fn sample_carries_elapsed_offset() {
        let sim = BiometricSimulator::default();
        let samples = run(&sim, 1, 3, 1000);
        let offsets: Vec<u64> = samples.iter().map(|s| s.offset_ms).collect();
        assert_eq!(offsets, vec![1000, 2000, 3000]);
    }

    #[test]
    fn long_sessions_drift_toward_settled_values() {
        let sim = BiometricSimulator::default();
        let samples = run(&sim, 3, 600, 1000);
        let tail = &samples[500..];
        let mean_hr = tail.iter().map(|s| s.heart_rate).sum::<f64>() / tail.len() as f64;
        let mean_alignment = tail.iter().map(|s| s.alignment).sum::<f64>() / tail.len() as f64;
        assert!(mean_hr < 70.0, "heart rate should settle, got {mean_hr}");
        assert!(mean_alignment > 85.0, "alignment should rise, got {mean_alignment}");
    }

    #[test]
    fn zero_dt_sample_is_unchanged() {
        let sim = BiometricSimulator::default();
        let mut rng = sim_rng(Some(1));
        let prev = sim.initial();
        let next = sim.sample(&mut rng, &prev, 0);
        assert_eq!(next, prev);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let mut config = SimulatorConfig::default();
        config.alignment.min = 100.0;
        config.alignment.max = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "biometrics.alignment"
        ));
    }

    proptest! {
        #[test]
        fn samples_stay_within_clamp_bounds(seed in any::<u64>(), tick_ms in 10u64..5000) {
            let mut config = SimulatorConfig::default();
            // Exaggerated jitter so the clamp is actually exercised.
            config.heart_rate.jitter = 40.0;
            config.hrv.jitter = 40.0;
            config.alignment.jitter = 40.0;
            let sim = BiometricSimulator::new(config.clone());
            for s in run(&sim, seed, 200, tick_ms) {
                prop_assert!(config.heart_rate.contains(s.heart_rate));
                prop_assert!(config.hrv.contains(s.hrv));
                prop_assert!(config.alignment.contains(s.alignment));
            }
        }
    }
}
