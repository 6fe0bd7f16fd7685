//! Client configuration

use std::time::Duration;

/// Backend used when neither an explicit URL nor the environment provides one
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8081";

/// Environment variable read by [`ClientConfig::from_env`]
pub const API_URL_ENV: &str = "I23D_API_URL";

/// Readiness probes must answer quickly or the backend counts as down
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout for submit and status requests
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Shortest accepted poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Longest accepted poll interval
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default wall-clock limit for a job, measured from submission
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30 * 60);

/// Settings for an [`ImageTo3dClient`](crate::ImageTo3dClient)
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub health_timeout: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    /// `None` polls until the job reaches a terminal state
    pub max_wait: Option<Duration>,
    /// `None` places no limit on the number of status requests
    pub max_polls: Option<u32>,
}

impl ClientConfig {
    /// Create a configuration for the given backend URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: Some(DEFAULT_MAX_WAIT),
            max_polls: None,
        }
    }

    /// Create a configuration from `I23D_API_URL`, falling back to the default URL
    pub fn from_env() -> Self {
        Self::new(resolve_base_url(
            None,
            std::env::var(API_URL_ENV).ok().as_deref(),
        ))
    }

    /// Set the readiness probe timeout
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Set the timeout for submit and status requests
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the delay between status polls
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
        self
    }

    /// Set the wall-clock limit for a job (`None` for no limit)
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Set the maximum number of status polls (`None` for no limit)
    pub fn with_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.max_polls = max_polls;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

/// Pick the backend URL: explicit value, then environment value, then default
pub fn resolve_base_url(explicit: Option<&str>, env_value: Option<&str>) -> String {
    let url = explicit
        .filter(|url| !url.trim().is_empty())
        .or(env_value.filter(|url| !url.trim().is_empty()))
        .unwrap_or(DEFAULT_SERVER_URL);
    normalize_base_url(url.trim().to_string())
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8081");
        assert_eq!(config.health_timeout, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_wait, Some(Duration::from_secs(1800)));
        assert_eq!(config.max_polls, None);
    }

    #[test]
    fn test_config_trailing_slash() {
        let config = ClientConfig::new("http://gpu-box:8081/");
        assert_eq!(config.base_url, "http://gpu-box:8081");
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("http://gpu-box:8081")
            .with_health_timeout(Duration::from_secs(1))
            .with_request_timeout(Duration::from_secs(10))
            .with_poll_interval(Duration::from_secs(2))
            .with_max_wait(None)
            .with_max_polls(Some(20));

        assert_eq!(config.health_timeout, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_wait, None);
        assert_eq!(config.max_polls, Some(20));
    }

    #[test]
    fn test_zero_poll_interval_is_raised() {
        let config = ClientConfig::default().with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
    }

    #[test]
    fn test_huge_poll_interval_is_capped() {
        let config = ClientConfig::default().with_poll_interval(Duration::MAX);
        assert_eq!(config.poll_interval, MAX_POLL_INTERVAL);
    }

    #[test]
    fn test_resolve_base_url_precedence() {
        assert_eq!(
            resolve_base_url(Some("http://explicit/"), Some("http://env")),
            "http://explicit"
        );
        assert_eq!(
            resolve_base_url(None, Some("https://mc.agaii.org/I23D/")),
            "https://mc.agaii.org/I23D"
        );
        assert_eq!(resolve_base_url(Some(""), Some("http://env")), "http://env");
        assert_eq!(resolve_base_url(None, None), DEFAULT_SERVER_URL);
        assert_eq!(resolve_base_url(None, Some("  ")), DEFAULT_SERVER_URL);
    }
}
