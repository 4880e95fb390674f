//! Timing wrapper for remote calls.

use crate::core::domain::error::ExporterResult;
use std::future::Future;
use std::time::{Duration, Instant};

/// The outcome of one remote call together with how long it took.
///
/// The elapsed time is recorded whether the call succeeded or not, so failed
/// calls can still be reported with their latency.
#[derive(Debug)]
pub struct CallResult<T> {
    pub result: ExporterResult<T>,
    pub elapsed: Duration,
}

impl<T> CallResult<T> {
    /// Runs `call` and measures it, rounded to the millisecond.
    pub async fn timed<F>(call: F) -> Self
    where
        F: Future<Output = ExporterResult<T>>,
    {
        let start = Instant::now();
        let result = call.await;
        Self {
            result,
            elapsed: round_millis(start.elapsed()),
        }
    }

    /// Splits the call into its result and elapsed time.
    pub fn into_parts(self) -> (ExporterResult<T>, Duration) {
        (self.result, self.elapsed)
    }
}

/// Rounds a duration to the nearest millisecond.
pub fn round_millis(elapsed: Duration) -> Duration {
    let millis = (elapsed.as_nanos() + 500_000) / 1_000_000;
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::error::ExporterError;

    #[test]
    fn test_round_millis() {
        assert_eq!(round_millis(Duration::from_micros(1_499)), Duration::from_millis(1));
        assert_eq!(round_millis(Duration::from_micros(1_500)), Duration::from_millis(2));
        assert_eq!(round_millis(Duration::ZERO), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_timed_keeps_error() {
        let call = CallResult::<u64>::timed(async { Err(ExporterError::EmptyResponse) }).await;
        let (result, elapsed) = call.into_parts();
        assert!(matches!(result, Err(ExporterError::EmptyResponse)));
        assert!(elapsed < Duration::from_secs(1));
    }
}
