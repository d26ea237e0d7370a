//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_max_active_jobs() -> usize {
    5
}

fn default_request_timeout_secs() -> u64 {
    180
}

/// Tunable limits for the request scheduler.
///
/// The defaults match conservative client-side use: five concurrent
/// requests, each bounded by a generous three-minute transport timeout so
/// large uploads on slow links still complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of jobs in the active set.
    #[serde(default = "default_max_active_jobs")]
    pub max_active_jobs: usize,
    /// Timeout applied to each transport attempt, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_active_jobs: default_max_active_jobs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SchedulerConfig {
    /// Configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active-set bound.
    #[must_use]
    pub fn with_max_active_jobs(mut self, max_active_jobs: usize) -> Self {
        self.max_active_jobs = max_active_jobs;
        self
    }

    /// Set the per-attempt transport timeout in seconds.
    #[must_use]
    pub fn with_request_timeout_secs(mut self, request_timeout_secs: u64) -> Self {
        self.request_timeout_secs = request_timeout_secs;
        self
    }

    /// Per-attempt timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_active_jobs == 0 {
            return Err("max_active_jobs must be greater than 0".into());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate it.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation failure description.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(input).map_err(|err| format!("parse error: {err}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment, honoring a `.env` file.
    ///
    /// Reads `TURNSTILE_MAX_ACTIVE_JOBS` and `TURNSTILE_REQUEST_TIMEOUT_SECS`;
    /// unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a description of the first unparsable or invalid variable.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("TURNSTILE_MAX_ACTIVE_JOBS") {
            config.max_active_jobs = raw
                .parse()
                .map_err(|err| format!("TURNSTILE_MAX_ACTIVE_JOBS: {err}"))?;
        }
        if let Ok(raw) = std::env::var("TURNSTILE_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = raw
                .parse()
                .map_err(|err| format!("TURNSTILE_REQUEST_TIMEOUT_SECS: {err}"))?;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_client_grade() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_active_jobs, 5);
        assert_eq!(config.request_timeout_secs, 180);
        assert_eq!(config.request_timeout(), Duration::from_secs(180));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builders_override_fields() {
        let config = SchedulerConfig::new()
            .with_max_active_jobs(2)
            .with_request_timeout_secs(15);
        assert_eq!(config.max_active_jobs, 2);
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn zero_limits_are_rejected() {
        let err = SchedulerConfig::new()
            .with_max_active_jobs(0)
            .validate()
            .unwrap_err();
        assert!(err.contains("max_active_jobs"));
        let err = SchedulerConfig::new()
            .with_request_timeout_secs(0)
            .validate()
            .unwrap_err();
        assert!(err.contains("request_timeout_secs"));
    }

    #[test]
    fn json_parsing_applies_defaults() {
        let config = SchedulerConfig::from_json_str("{\"max_active_jobs\": 3}").unwrap();
        assert_eq!(config.max_active_jobs, 3);
        assert_eq!(config.request_timeout_secs, 180);
    }

    #[test]
    fn json_parsing_rejects_invalid_values() {
        let err = SchedulerConfig::from_json_str("{\"max_active_jobs\": 0}").unwrap_err();
        assert!(err.contains("max_active_jobs"));
        let err = SchedulerConfig::from_json_str("not json").unwrap_err();
        assert!(err.contains("parse error"));
    }

    #[test]
    fn env_overrides_are_parsed_and_validated() {
        std::env::set_var("TURNSTILE_MAX_ACTIVE_JOBS", "7");
        std::env::set_var("TURNSTILE_REQUEST_TIMEOUT_SECS", "30");
        let config = SchedulerConfig::from_env().unwrap();
        assert_eq!(config.max_active_jobs, 7);
        assert_eq!(config.request_timeout_secs, 30);

        std::env::set_var("TURNSTILE_MAX_ACTIVE_JOBS", "not-a-number");
        let err = SchedulerConfig::from_env().unwrap_err();
        assert!(err.contains("TURNSTILE_MAX_ACTIVE_JOBS"));

        std::env::remove_var("TURNSTILE_MAX_ACTIVE_JOBS");
        std::env::remove_var("TURNSTILE_REQUEST_TIMEOUT_SECS");
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = SchedulerConfig::new().with_max_active_jobs(4);
        let encoded = serde_json::to_string(&config).unwrap();
        let decoded = SchedulerConfig::from_json_str(&encoded).unwrap();
        assert_eq!(decoded, config);
    }
}
