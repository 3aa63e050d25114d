// ── Deadline wrapper ──
//
// Races an operation against an optional timer. The operation is never
// cancelled: when the timer wins, the operation keeps running on its own
// task and whatever it eventually produces is dropped on the floor.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, warn};

/// Unit of a deadline amount.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum DeadlineUnit {
    #[default]
    #[serde(rename = "s")]
    #[strum(serialize = "s")]
    Seconds,
    #[serde(rename = "m")]
    #[strum(serialize = "m")]
    Minutes,
    #[serde(rename = "h")]
    #[strum(serialize = "h")]
    Hours,
}

impl DeadlineUnit {
    /// Number of seconds in one unit.
    pub fn seconds(self) -> u32 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3600,
        }
    }
}

/// An optional time limit, expressed the way node configuration stores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Deadline {
    pub amount: f64,
    pub unit: DeadlineUnit,
}

impl Deadline {
    pub fn new(amount: f64, unit: DeadlineUnit) -> Self {
        Self { amount, unit }
    }

    /// No time limit.
    pub fn none() -> Self {
        Self::default()
    }

    /// The limit as a `Duration`, or `None` when no deadline applies
    /// (amount zero, negative, or not a number).
    pub fn duration(&self) -> Option<Duration> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return None;
        }
        let secs = self.amount * f64::from(self.unit.seconds());
        Duration::try_from_secs_f64(secs).ok()
    }
}

/// The deadline fired before the operation settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Timed out after {after:?}")]
pub struct Elapsed {
    pub after: Duration,
}

/// Await `operation`, giving up after `deadline`.
///
/// Without a deadline the operation is awaited in place and its outcome
/// returned untouched. With one, the operation is moved onto its own task
/// so that losing the race detaches it instead of dropping it.
pub async fn with_deadline<F>(deadline: Deadline, operation: F) -> Result<F::Output, Elapsed>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let Some(limit) = deadline.duration() else {
        return Ok(operation.await);
    };

    let handle = tokio::spawn(operation);
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(join_err)) => {
            if join_err.is_panic() {
                std::panic::resume_unwind(join_err.into_panic());
            }
            // Only reachable when the runtime is shutting down underneath us.
            warn!("deadline-bound operation was cancelled by the runtime");
            Err(Elapsed { after: limit })
        }
        Err(_) => {
            debug!(?limit, "deadline elapsed, detaching operation");
            Err(Elapsed { after: limit })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn units_convert_to_seconds() {
        assert_eq!(DeadlineUnit::Seconds.seconds(), 1);
        assert_eq!(DeadlineUnit::Minutes.seconds(), 60);
        assert_eq!(DeadlineUnit::Hours.seconds(), 3600);
    }

    #[test]
    fn units_parse_from_config_letters() {
        assert_eq!(DeadlineUnit::from_str("m").unwrap(), DeadlineUnit::Minutes);
        assert_eq!(DeadlineUnit::Hours.to_string(), "h");
        assert!(DeadlineUnit::from_str("d").is_err());
    }

    #[test]
    fn non_positive_amounts_disable_the_deadline() {
        assert_eq!(Deadline::new(0.0, DeadlineUnit::Hours).duration(), None);
        assert_eq!(Deadline::new(-3.0, DeadlineUnit::Seconds).duration(), None);
        assert_eq!(Deadline::new(f64::NAN, DeadlineUnit::Seconds).duration(), None);
    }

    #[test]
    fn amounts_scale_by_unit() {
        assert_eq!(
            Deadline::new(1.5, DeadlineUnit::Minutes).duration(),
            Some(Duration::from_secs(90))
        );
        assert_eq!(
            Deadline::new(2.0, DeadlineUnit::Hours).duration(),
            Some(Duration::from_secs(7200))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_deadline_returns_outcome_without_delay() {
        let start = tokio::time::Instant::now();
        let out = with_deadline(Deadline::none(), async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            "done"
        })
        .await;
        assert_eq!(out, Ok("done"));
        assert_eq!(start.elapsed(), Duration::from_secs(3600));

        let immediate = with_deadline(Deadline::none(), async { 7 }).await;
        assert_eq!(immediate, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_operation_times_out_but_keeps_running() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let start = tokio::time::Instant::now();
        let out = with_deadline(Deadline::new(5.0, DeadlineUnit::Seconds), async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            flag.store(true, Ordering::SeqCst);
        })
        .await;

        assert_eq!(
            out,
            Err(Elapsed {
                after: Duration::from_secs(5)
            })
        );
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert!(!finished.load(Ordering::SeqCst));

        // The detached operation still completes on its own.
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_operation_beats_the_deadline() {
        let out = with_deadline(Deadline::new(5.0, DeadlineUnit::Seconds), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Err::<(), _>("nope")
        })
        .await;
        assert_eq!(out, Ok(Err("nope")));
    }
}
