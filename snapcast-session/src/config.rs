//! Configuration types for the session layer
//!
//! [`SessionConfig`] says where the snapserver is and how long to wait for
//! it; [`ReconnectPolicy`] controls the backoff between connection attempts.

use std::time::Duration;

use crate::error::{Result, SessionError};

/// Environment variable naming the snapserver host
pub const HOST_ENV: &str = "SNAPCAST_HOST";
/// Environment variable naming the control port
pub const PORT_ENV: &str = "SNAPCAST_PORT";
/// Environment variable with the request timeout in milliseconds
pub const TIMEOUT_ENV: &str = "SNAPCAST_TIMEOUT_MS";

/// Configuration for a [`SessionManager`](crate::SessionManager)
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Snapserver host name or address
    /// Default: "127.0.0.1"
    pub host: String,

    /// Control port
    /// Default: 1705
    pub port: u16,

    /// How long a request may wait for its response
    /// Default: 5 seconds
    pub request_timeout: Duration,

    /// How long a blocking connect waits for the first full state
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Upper bound on a single TCP connection attempt
    /// Default: 5 seconds
    pub dial_timeout: Duration,

    /// Backoff between connection attempts
    pub reconnect: ReconnectPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: snapcast_api::DEFAULT_CONTROL_PORT,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            dial_timeout: Duration::from_secs(5),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Create a SessionConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration pointed at `host:port`
    pub fn for_server(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Defaults overridden by `SNAPCAST_HOST`, `SNAPCAST_PORT` and
    /// `SNAPCAST_TIMEOUT_MS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(HOST_ENV) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = lookup(PORT_ENV) {
            config.port = port.trim().parse().map_err(|_| {
                SessionError::Configuration(format!("{PORT_ENV} is not a port number: {port}"))
            })?;
        }
        if let Some(timeout) = lookup(TIMEOUT_ENV) {
            let millis: u64 = timeout.trim().parse().map_err(|_| {
                SessionError::Configuration(format!(
                    "{TIMEOUT_ENV} is not a number of milliseconds: {timeout}"
                ))
            })?;
            config.request_timeout = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    /// `host:port` as passed to the TCP connector
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Validate the configuration and return the first issue
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(SessionError::Configuration(
                "Host must not be empty".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(SessionError::Configuration(
                "Port must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(SessionError::Configuration(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(SessionError::Configuration(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        if self.dial_timeout.is_zero() {
            return Err(SessionError::Configuration(
                "Dial timeout must be greater than 0".to_string(),
            ));
        }

        self.reconnect.validate()
    }
}

/// Capped exponential backoff with jitter
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the second attempt
    /// Default: 500 ms
    pub initial_delay: Duration,

    /// Largest delay between attempts
    /// Default: 30 seconds
    pub max_delay: Duration,

    /// Growth factor per failed attempt
    /// Default: 2.0
    pub multiplier: f64,

    /// Fraction of each delay that is randomized away, in `0.0..=1.0`
    /// Default: 0.2
    pub jitter: f64,

    /// Give up after this many consecutive failed attempts; `None` retries
    /// until shutdown
    /// Default: None
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.2,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Short delays for a server on the same host
    pub fn fast() -> Self {
        Self {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            ..Default::default()
        }
    }

    /// Same delay every time, no jitter
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            jitter: 0.0,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Delay before retry number `attempt` (0-based), without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(delay)
        }
    }

    /// Delay before retry number `attempt` with jitter applied
    ///
    /// Always within `[base * (1 - jitter), base]`, so never above
    /// `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let spread = base.mul_f64(self.jitter * rand::random::<f64>());
        base.saturating_sub(spread)
    }

    /// Wait before the next attempt, given the consecutive failed attempts
    /// so far
    ///
    /// A dropped connection (no failures yet) and the first failed attempt
    /// both wait about `initial_delay`; each further failure grows it.
    pub fn delay_after_failures(&self, failures: u32) -> Duration {
        self.delay_for(failures.saturating_sub(1))
    }

    /// Whether another attempt is allowed after `failed` consecutive failures
    pub fn allows_attempt(&self, failed: u32) -> bool {
        self.max_attempts.map_or(true, |max| failed < max)
    }

    /// Validate the policy and return the first issue
    pub fn validate(&self) -> Result<()> {
        if self.initial_delay.is_zero() {
            return Err(SessionError::Configuration(
                "Initial reconnect delay must be greater than 0".to_string(),
            ));
        }

        if self.max_delay < self.initial_delay {
            return Err(SessionError::Configuration(
                "Max reconnect delay must not be below the initial delay".to_string(),
            ));
        }

        if !(self.multiplier >= 1.0 && self.multiplier.is_finite()) {
            return Err(SessionError::Configuration(
                "Reconnect multiplier must be a finite number >= 1.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(SessionError::Configuration(
                "Reconnect jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.max_attempts == Some(0) {
            return Err(SessionError::Configuration(
                "Max reconnect attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
