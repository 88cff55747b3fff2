//! Polling loop configuration

use std::time::Duration;

use crate::StreamError;

/// Timing for the get/event polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Time between polls; the first poll is immediate
    /// Default: 500 milliseconds
    pub interval: Duration,

    /// How long to poll before stopping
    /// Default: 60 seconds
    pub max_duration: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_duration: Duration::from_secs(60),
        }
    }
}

impl PollingConfig {
    pub fn new(interval: Duration, max_duration: Duration) -> Self {
        Self {
            interval,
            max_duration,
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.interval.is_zero() {
            return Err(StreamError::Configuration(
                "Polling interval must be greater than 0".to_string(),
            ));
        }

        if self.max_duration.is_zero() {
            return Err(StreamError::Configuration(
                "Max polling duration must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }
}
