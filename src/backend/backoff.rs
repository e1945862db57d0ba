//! Retry policy with exponential backoff and jitter.
//!
//! [`BackoffConfig`] controls how a stage that failed with a transient
//! [`ServiceUnavailable`](crate::PipelineError::ServiceUnavailable) is run
//! again. For a local Ollama server, use [`BackoffConfig::none()`]. For cloud
//! APIs, [`BackoffConfig::standard()`] or [`BackoffConfig::interactive()`].

use crate::error::{PipelineError, Result};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for stage retry with exponential backoff and jitter.
///
/// # Example
///
/// ```
/// use quizgen::backend::BackoffConfig;
///
/// let none = BackoffConfig::none();
/// assert_eq!(none.max_retries, 0);
///
/// let standard = BackoffConfig::standard();
/// assert_eq!(standard.max_retries, 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Maximum number of retries after the first attempt. Default: 0.
    pub max_retries: u32,

    /// Initial delay before first retry.
    pub initial_delay: Duration,

    /// Multiplier applied to delay after each retry.
    /// Delay grows: initial, initial * multiplier, initial * multiplier^2, ...
    pub multiplier: f64,

    /// Upper bound on any single delay.
    pub max_delay: Duration,

    /// Jitter strategy.
    pub jitter: JitterStrategy,

    /// HTTP status codes that trigger retry. Failures without a status
    /// (transport errors, timeouts) are always retryable.
    pub retryable_statuses: Vec<u16>,

    /// Whether to wait for the provider's `Retry-After` instead of the
    /// computed delay when one was sent.
    pub respect_retry_after: bool,
}

/// Jitter strategy to prevent thundering herd on shared rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitterStrategy {
    /// No jitter. Delay is exactly the calculated value.
    None,

    /// Full jitter: random value in `[0, calculated_delay]`.
    Full,

    /// Equal jitter: `calculated_delay/2 + random in [0, calculated_delay/2]`.
    Equal,
}

impl BackoffConfig {
    /// No retry. Each stage gets exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::standard()
        }
    }

    /// Defaults for cloud APIs: 3 retries, 1s initial, 2x multiplier,
    /// 60s max, full jitter, respects Retry-After.
    pub fn standard() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
            jitter: JitterStrategy::Full,
            retryable_statuses: vec![429, 500, 502, 503, 504],
            respect_retry_after: true,
        }
    }

    /// Retry harder for batch generation: 5 retries, 500ms initial.
    pub fn aggressive() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(500),
            multiplier: 2.0,
            max_delay: Duration::from_secs(120),
            jitter: JitterStrategy::Full,
            retryable_statuses: vec![429, 500, 502, 503, 504],
            respect_retry_after: true,
        }
    }

    /// Someone is waiting on the answer: 2 retries, 500ms initial, 10s max.
    pub fn interactive() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            multiplier: 1.5,
            max_delay: Duration::from_secs(10),
            jitter: JitterStrategy::Full,
            retryable_statuses: vec![429, 500, 502, 503, 504],
            respect_retry_after: true,
        }
    }

    /// Calculate the delay for attempt N (0-indexed).
    ///
    /// The base delay is `initial_delay * multiplier^attempt`, capped at
    /// `max_delay`. Jitter is then applied according to the configured strategy.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        // A negative or NaN multiplier must not reach `from_secs_f64`.
        let base = if base.is_nan() { 0.0 } else { base.max(0.0) };
        let capped = base.min(self.max_delay.as_secs_f64());

        let jittered = match self.jitter {
            JitterStrategy::None => capped,
            JitterStrategy::Full => fastrand::f64() * capped,
            JitterStrategy::Equal => capped / 2.0 + fastrand::f64() * (capped / 2.0),
        };

        Duration::from_secs_f64(jittered)
    }

    /// Delay before retry `attempt` (1-indexed) after `error`.
    pub fn delay_after(&self, attempt: u32, error: &PipelineError) -> Duration {
        match error {
            PipelineError::ServiceUnavailable {
                retry_after: Some(ra),
                ..
            }
            | PipelineError::HttpError {
                retry_after: Some(ra),
                ..
            } if self.respect_retry_after => (*ra).min(self.max_delay),
            _ => self.delay_for_attempt(attempt.saturating_sub(1)),
        }
    }

    /// Whether `error` is worth another attempt under this policy.
    ///
    /// Only unavailability is retried, never schema violations: the same
    /// prompt tends to produce the same malformed shape.
    pub fn is_retryable(&self, error: &PipelineError) -> bool {
        match error {
            PipelineError::ServiceUnavailable { status: None, .. } => true,
            PipelineError::ServiceUnavailable {
                status: Some(status),
                ..
            }
            | PipelineError::HttpError { status, .. } => self.retryable_statuses.contains(status),
            PipelineError::Request(_) => true,
            _ => false,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::none()
    }
}

impl FromStr for BackoffConfig {
    type Err = PipelineError;

    /// Parse a preset name: `none`, `standard`, `interactive`, `aggressive`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::none()),
            "standard" => Ok(Self::standard()),
            "interactive" => Ok(Self::interactive()),
            "aggressive" => Ok(Self::aggressive()),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown retry preset '{}', expected none, standard, interactive or aggressive",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(max_delay: Duration) -> BackoffConfig {
        BackoffConfig {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay,
            jitter: JitterStrategy::None,
            retryable_statuses: vec![429, 503],
            respect_retry_after: true,
        }
    }

    fn unavailable(status: Option<u16>, retry_after: Option<Duration>) -> PipelineError {
        PipelineError::ServiceUnavailable {
            task: "quiz".into(),
            reason: "down".into(),
            status,
            retry_after,
        }
    }

    #[test]
    fn test_backoff_delay_never_negative() {
        let mut config = fixed(Duration::from_secs(60));
        config.multiplier = -2.0;
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::ZERO);

        config.multiplier = f64::NAN;
        assert_eq!(config.delay_for_attempt(3), Duration::ZERO);

        config.multiplier = f64::INFINITY;
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_delay_exponential() {
        let config = fixed(Duration::from_secs(60));
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_delay_capped_at_max() {
        let config = fixed(Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_jitter_full_in_range() {
        let config = BackoffConfig {
            jitter: JitterStrategy::Full,
            ..fixed(Duration::from_secs(60))
        };
        for _ in 0..100 {
            assert!(config.delay_for_attempt(1) <= Duration::from_secs(2));
        }
    }

    #[test]
    fn test_delay_after_prefers_retry_after() {
        let config = fixed(Duration::from_secs(60));
        let err = unavailable(Some(429), Some(Duration::from_secs(7)));
        assert_eq!(config.delay_after(1, &err), Duration::from_secs(7));

        let ignoring = BackoffConfig {
            respect_retry_after: false,
            ..config
        };
        assert_eq!(ignoring.delay_after(1, &err), Duration::from_secs(1));
    }

    #[test]
    fn test_retryable_classification() {
        let config = BackoffConfig::standard();
        assert!(config.is_retryable(&unavailable(None, None)));
        assert!(config.is_retryable(&unavailable(Some(503), None)));
        assert!(!config.is_retryable(&unavailable(Some(400), None)));
        assert!(!config.is_retryable(&PipelineError::schema("quiz", "bad")));
        assert!(!config.is_retryable(&PipelineError::Other("x".into())));
    }

    #[test]
    fn test_presets() {
        assert_eq!(BackoffConfig::none().max_retries, 0);
        assert_eq!(BackoffConfig::interactive().max_retries, 2);
        assert_eq!(BackoffConfig::aggressive().max_retries, 5);
        assert_eq!(BackoffConfig::default(), BackoffConfig::none());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Standard".parse::<BackoffConfig>().unwrap(), BackoffConfig::standard());
        assert!(matches!(
            "forever".parse::<BackoffConfig>(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }
}
