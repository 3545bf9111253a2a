/*!
 * Kernel Configuration
 *
 * Runtime settings for the reclamation scheduler, the demo script and the
 * exec program chooser. Defaults come from [`crate::core::limits`]; the
 * binary overrides them from the environment.
 *
 * Environment variables:
 * - PROCTREE_REAP_DELAY_MS: zombie reclamation delay in milliseconds
 * - PROCTREE_DEMO_SCALE: positive multiplier applied to every demo wait
 * - PROCTREE_EXEC_SEED: seed for the exec program chooser
 */

use crate::core::errors::ConfigError;
use crate::core::limits::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_REAP_DELAY, DEMO_AFTER_KILL, DEMO_AFTER_SELECT,
    DEMO_AFTER_SPAWN, DEMO_AFTER_VIEW_SWITCH,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

pub const ENV_REAP_DELAY_MS: &str = "PROCTREE_REAP_DELAY_MS";
pub const ENV_DEMO_SCALE: &str = "PROCTREE_DEMO_SCALE";
pub const ENV_EXEC_SEED: &str = "PROCTREE_EXEC_SEED";

/// Upper bound on the demo scale factor (keeps scaled durations representable)
const MAX_DEMO_SCALE: f64 = 1_000.0;

/// Waits between demo steps
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DemoTiming {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub after_select: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub after_spawn: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub after_kill: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub after_view_switch: Duration,
}

impl Default for DemoTiming {
    fn default() -> Self {
        Self {
            after_select: DEMO_AFTER_SELECT,
            after_spawn: DEMO_AFTER_SPAWN,
            after_kill: DEMO_AFTER_KILL,
            after_view_switch: DEMO_AFTER_VIEW_SWITCH,
        }
    }
}

impl DemoTiming {
    /// Scale every wait by `factor`
    ///
    /// The factor is clamped to `0..=1000`; a non-finite factor is ignored.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        if !factor.is_finite() {
            return self;
        }
        let factor = factor.clamp(0.0, MAX_DEMO_SCALE);
        Self {
            after_select: self.after_select.mul_f64(factor),
            after_spawn: self.after_spawn.mul_f64(factor),
            after_kill: self.after_kill.mul_f64(factor),
            after_view_switch: self.after_view_switch.mul_f64(factor),
        }
    }

    /// Total scripted wait time
    #[inline]
    #[must_use]
    pub fn total(&self) -> Duration {
        self.after_select + self.after_spawn + self.after_kill + self.after_view_switch
    }
}

/// Kernel configuration
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KernelConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub reap_delay: Duration,
    pub demo: DemoTiming,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_seed: Option<u64>,
    pub event_capacity: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            reap_delay: DEFAULT_REAP_DELAY,
            demo: DemoTiming::default(),
            exec_seed: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl KernelConfig {
    /// Load configuration from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Absent keys keep their defaults; present but malformed keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_REAP_DELAY_MS) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid(ENV_REAP_DELAY_MS, &raw, e.to_string()))?;
            config.reap_delay = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup(ENV_DEMO_SCALE) {
            let factor = raw
                .trim()
                .parse::<f64>()
                .map_err(|e| invalid(ENV_DEMO_SCALE, &raw, e.to_string()))?;
            if !factor.is_finite() || factor <= 0.0 || factor > MAX_DEMO_SCALE {
                return Err(invalid(
                    ENV_DEMO_SCALE,
                    &raw,
                    format!("must be greater than 0 and at most {MAX_DEMO_SCALE}"),
                ));
            }
            config.demo = config.demo.scaled(factor);
        }

        if let Some(raw) = lookup(ENV_EXEC_SEED) {
            let seed = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid(ENV_EXEC_SEED, &raw, e.to_string()))?;
            config.exec_seed = Some(seed);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check settings that constrain each other
    ///
    /// The demo's wait after the kill step must outlast the reap delay, so
    /// the terminated shell is gone before the view switches.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.demo.after_kill <= self.reap_delay {
            return Err(invalid(
                ENV_REAP_DELAY_MS,
                &self.reap_delay.as_millis().to_string(),
                format!(
                    "must be below the demo's post-kill wait of {} ms (see {ENV_DEMO_SCALE})",
                    self.demo.after_kill.as_millis()
                ),
            ));
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn with_reap_delay(mut self, delay: Duration) -> Self {
        self.reap_delay = delay;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_demo_timing(mut self, timing: DemoTiming) -> Self {
        self.demo = timing;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_exec_seed(mut self, seed: u64) -> Self {
        self.exec_seed = Some(seed);
        self
    }
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}
