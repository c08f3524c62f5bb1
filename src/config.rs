use crate::core::{OccError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry budget and backoff schedule for conflicting conditional writes.
///
/// Retry `k` (0-indexed) waits `fibonacci(k + 1)` backoff units, so the
/// default schedule is 1, 1, 2, 3, 5 seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Duration of one backoff unit in milliseconds.
    pub backoff_unit_ms: u64,
    /// Upper bound for a single backoff delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_unit_ms: 1_000,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retries
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff unit
    pub fn backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit_ms = duration_ms(unit);
        self
    }

    /// Set the cap for a single backoff delay
    pub fn max_backoff(mut self, cap: Duration) -> Self {
        self.max_backoff_ms = duration_ms(cap);
        self
    }

    /// Delay inserted before retry `retry` (0-indexed).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let units = fibonacci(retry.saturating_add(1));
        let ms = units
            .saturating_mul(self.backoff_unit_ms)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Every delay this policy can produce, in order.
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        (0..self.max_retries)
            .map(|retry| self.delay_for_retry(retry))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_backoff_ms < self.backoff_unit_ms {
            return Err(OccError::InvalidConfig(format!(
                "max_backoff_ms ({}) must be >= backoff_unit_ms ({})",
                self.max_backoff_ms, self.backoff_unit_ms
            )));
        }
        Ok(())
    }
}

/// `fibonacci(1) == fibonacci(2) == 1`; saturates instead of overflowing.
pub fn fibonacci(n: u32) -> u64 {
    let (mut previous, mut current) = (0u64, 1u64);
    for _ in 1..n {
        let next = previous.saturating_add(current);
        previous = current;
        current = next;
    }
    if n == 0 { 0 } else { current }
}

/// Cadence and batch bounds for the pending-item worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchWorkerConfig {
    /// Maximum number of items pulled per run.
    pub batch_size: usize,
    /// Interval between scheduled runs in milliseconds.
    pub interval_ms: u64,
    /// Items younger than this are not yet eligible.
    pub min_age_ms: u64,
}

impl Default for BatchWorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            interval_ms: 5 * 60_000,
            min_age_ms: 0,
        }
    }
}

impl BatchWorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the scheduling interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval_ms = duration_ms(interval);
        self
    }

    /// Set the minimum item age
    pub fn min_age(mut self, min_age: Duration) -> Self {
        self.min_age_ms = duration_ms(min_age);
        self
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn min_age_duration(&self) -> Duration {
        Duration::from_millis(self.min_age_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(OccError::InvalidConfig(
                "batch_size must be >= 1".to_string(),
            ));
        }
        if self.interval_ms == 0 {
            return Err(OccError::InvalidConfig(
                "interval_ms must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration for the crate's components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccConfig {
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub batch: BatchWorkerConfig,
}

impl OccConfig {
    /// Reads overrides from `{prefix}_*` environment variables.
    ///
    /// Recognised: `MAX_RETRIES`, `BACKOFF_UNIT_MS`, `MAX_BACKOFF_MS`,
    /// `BATCH_SIZE`, `BATCH_INTERVAL_MS`, `BATCH_MIN_AGE_MS`. Missing
    /// variables keep their defaults.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_lookup(prefix, |name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            retry: RetryPolicy {
                max_retries: parse_var(&lookup, prefix, "MAX_RETRIES", defaults.retry.max_retries)?,
                backoff_unit_ms: parse_var(
                    &lookup,
                    prefix,
                    "BACKOFF_UNIT_MS",
                    defaults.retry.backoff_unit_ms,
                )?,
                max_backoff_ms: parse_var(
                    &lookup,
                    prefix,
                    "MAX_BACKOFF_MS",
                    defaults.retry.max_backoff_ms,
                )?,
            },
            batch: BatchWorkerConfig {
                batch_size: parse_var(&lookup, prefix, "BATCH_SIZE", defaults.batch.batch_size)?,
                interval_ms: parse_var(
                    &lookup,
                    prefix,
                    "BATCH_INTERVAL_MS",
                    defaults.batch.interval_ms,
                )?,
                min_age_ms: parse_var(
                    &lookup,
                    prefix,
                    "BATCH_MIN_AGE_MS",
                    defaults.batch.min_age_ms,
                )?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.retry.validate()?;
        self.batch.validate()
    }
}

fn parse_var<F, V>(lookup: &F, prefix: &str, name: &str, default: V) -> Result<V>
where
    F: Fn(&str) -> Option<String>,
    V: std::str::FromStr,
{
    let full_name = format!("{prefix}_{name}");
    match lookup(&full_name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            OccError::InvalidConfig(format!("{full_name}: cannot parse '{raw}'"))
        }),
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
