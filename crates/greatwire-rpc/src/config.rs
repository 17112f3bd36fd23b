use std::time::Duration;

use greatwire_transport::MAX_COMMAND_SIZE;

/// Default command execution timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default delay before the single cancel retry.
pub const DEFAULT_CANCEL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Time allowed for the device to accept and execute a command.
    pub timeout: Duration,
    /// Time allowed for reading a response. Default: 1 s.
    pub comms_timeout: Duration,
    /// Largest response read, capped at the frame size. Zero means no
    /// response is read at all.
    pub max_response_length: usize,
    /// Time allowed for each cancel transaction.
    pub cancel_timeout: Duration,
    /// Delay before retrying a failed cancel once; `None` disables the retry.
    pub cancel_retry_delay: Option<Duration>,
    /// Skip re-sending a command identical to the previous one.
    pub repeat_optimization: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            comms_timeout: DEFAULT_TIMEOUT,
            max_response_length: MAX_COMMAND_SIZE,
            cancel_timeout: DEFAULT_TIMEOUT,
            cancel_retry_delay: Some(DEFAULT_CANCEL_RETRY_DELAY),
            repeat_optimization: true,
        }
    }
}

/// Per-call overrides of the session defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub comms_timeout: Option<Duration>,
    pub max_response_length: Option<usize>,
}

impl CallOptions {
    /// Options for a command that produces no response.
    pub fn no_response() -> Self {
        Self {
            max_response_length: Some(0),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_response_length(mut self, length: usize) -> Self {
        self.max_response_length = Some(length);
        self
    }

    /// Fill unset fields from `fallback`.
    pub fn or(self, fallback: CallOptions) -> Self {
        Self {
            timeout: self.timeout.or(fallback.timeout),
            comms_timeout: self.comms_timeout.or(fallback.comms_timeout),
            max_response_length: self.max_response_length.or(fallback.max_response_length),
        }
    }
}

/// Configuration for API discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Replace classes that are already known (such as `core`) with their
    /// discovered versions instead of skipping them.
    pub overwrite: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(1000));
        assert_eq!(config.max_response_length, 4096);
        assert_eq!(config.cancel_retry_delay, Some(Duration::from_secs(1)));
        assert!(config.repeat_optimization);
    }

    #[test]
    fn call_options_merge() {
        let explicit = CallOptions::default().with_timeout(Duration::from_secs(5));
        let merged = explicit.or(CallOptions::no_response());
        assert_eq!(merged.timeout, Some(Duration::from_secs(5)));
        assert_eq!(merged.max_response_length, Some(0));

        let overridden = CallOptions::default()
            .with_max_response_length(16)
            .or(CallOptions::no_response());
        assert_eq!(overridden.max_response_length, Some(16));
    }
}
