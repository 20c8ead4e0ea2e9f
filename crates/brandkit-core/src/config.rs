use std::time::Duration;

use crate::error::AppError;

/// Tuning knobs for the project pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound for a whole scan (fetch + parse).
    pub scan_timeout: Duration,
    /// Upper bound for one generation backend call.
    pub generation_timeout: Duration,
    /// Output types generated at the same time within one request.
    pub max_parallel_generations: usize,
    /// Length cap for the page summary stored with the profile.
    pub summary_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(120),
            max_parallel_generations: 4,
            summary_chars: 4_000,
        }
    }
}

impl PipelineConfig {
    /// Read configuration from environment variables, falling back to defaults.
    ///
    /// - `BRANDKIT_SCAN_TIMEOUT_SECS` (30)
    /// - `BRANDKIT_GENERATION_TIMEOUT_SECS` (120)
    /// - `BRANDKIT_MAX_PARALLEL_GENERATIONS` (4)
    /// - `BRANDKIT_SUMMARY_CHARS` (4000)
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            scan_timeout: Duration::from_secs(positive_env(
                "BRANDKIT_SCAN_TIMEOUT_SECS",
                defaults.scan_timeout.as_secs(),
            )?),
            generation_timeout: Duration::from_secs(positive_env(
                "BRANDKIT_GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout.as_secs(),
            )?),
            max_parallel_generations: positive_env(
                "BRANDKIT_MAX_PARALLEL_GENERATIONS",
                defaults.max_parallel_generations as u64,
            )? as usize,
            summary_chars: positive_env("BRANDKIT_SUMMARY_CHARS", defaults.summary_chars as u64)?
                as usize,
        })
    }

    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn with_max_parallel_generations(mut self, n: usize) -> Self {
        self.max_parallel_generations = n.max(1);
        self
    }
}

fn positive_env(name: &str, default: u64) -> Result<u64, AppError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => parse_positive(name, &raw),
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u64, AppError> {
    let parsed: u64 = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {name} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{name} must be at least 1")));
    }
    Ok(parsed)
}
