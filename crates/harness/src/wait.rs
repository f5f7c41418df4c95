//! Condition-based waits
//!
//! Every wait in the harness goes through these primitives: an explicit
//! predicate, a bounded timeout, and a poll interval. Fixed sleeps are
//! confined to the intervals between polls.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::{HarnessError, HarnessResult};

/// Poll an async predicate until it returns true or the timeout elapses.
///
/// `what` names the awaited condition and ends up in the `WaitTimeout`
/// error verbatim.
pub async fn await_condition<F, Fut>(
    what: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut predicate: F,
) -> HarnessResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<bool>>,
{
    let start = Instant::now();
    let mut polls = 0u32;

    loop {
        polls += 1;
        if predicate().await? {
            trace!(what, polls, "condition met");
            return Ok(());
        }

        if start.elapsed() >= timeout {
            debug!(what, polls, "condition wait exhausted");
            return Err(HarnessError::WaitTimeout {
                what: what.to_string(),
                waited_ms: start.elapsed().as_millis() as u64,
            });
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Wait until a sampled count reports the same value across
/// `required_stable` consecutive polls, then return that value.
///
/// Row counts are the primary signal of filter convergence: a refetch in
/// flight shows up as a changing count, a settled result set as a stable
/// one.
pub async fn stable_count<F, Fut>(
    what: &str,
    timeout: Duration,
    poll_interval: Duration,
    required_stable: u32,
    mut sample: F,
) -> HarnessResult<usize>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<usize>>,
{
    let start = Instant::now();
    let mut last: Option<usize> = None;
    let mut streak = 0u32;

    loop {
        let current = sample().await?;
        if last == Some(current) {
            streak += 1;
            if streak + 1 >= required_stable {
                trace!(what, count = current, "count stabilized");
                return Ok(current);
            }
        } else {
            last = Some(current);
            streak = 0;
        }

        if start.elapsed() >= timeout {
            return Err(HarnessError::WaitTimeout {
                what: format!("stable count of {what}"),
                waited_ms: start.elapsed().as_millis() as u64,
            });
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Bounded, roughly exponential backoff for cross-session polling.
///
/// Yields `base`, `base * factor`, ... capped at `cap`, until the total
/// slept time would exceed `max_total`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    factor: u32,
    cap: Duration,
    remaining: Duration,
    spent: Duration,
}

impl Backoff {
    pub fn new(base: Duration, factor: u32, cap: Duration, max_total: Duration) -> Self {
        Self {
            next: base,
            factor,
            cap,
            remaining: max_total,
            spent: Duration::ZERO,
        }
    }

    /// Next delay to sleep, or None once the total budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.remaining.is_zero() {
            return None;
        }
        let delay = self.next.min(self.cap).min(self.remaining);
        self.remaining -= delay;
        self.spent += delay;
        self.next = (self.next * self.factor).min(self.cap);
        Some(delay)
    }

    /// Total of the delays handed out so far.
    pub fn spent(&self) -> Duration {
        self.spent
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(250),
            2,
            Duration::from_secs(4),
            Duration::from_secs(30),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn condition_met_on_later_poll() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();

        await_condition(
            "counter reaches 3",
            Duration::from_secs(1),
            Duration::from_millis(1),
            move || {
                let hits = hits2.clone();
                async move { Ok(hits.fetch_add(1, Ordering::SeqCst) >= 2) }
            },
        )
        .await
        .unwrap();

        assert!(hits.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn timeout_carries_condition_name() {
        let err = await_condition(
            "row appears",
            Duration::from_millis(5),
            Duration::from_millis(1),
            || async { Ok(false) },
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("row appears"));
    }

    #[tokio::test]
    async fn stable_count_waits_out_a_changing_series() {
        // Series settles at 4 after three changing samples.
        let samples = Arc::new(AtomicUsize::new(0));
        let samples2 = samples.clone();

        let count = stable_count(
            "filtered rows",
            Duration::from_secs(1),
            Duration::from_millis(1),
            3,
            move || {
                let samples = samples2.clone();
                async move {
                    let n = samples.fetch_add(1, Ordering::SeqCst);
                    Ok(if n < 3 { 10 - n } else { 4 })
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(count, 4);
    }

    #[test]
    fn backoff_grows_and_respects_budget() {
        let mut backoff = Backoff::new(
            Duration::from_millis(100),
            2,
            Duration::from_millis(400),
            Duration::from_millis(1000),
        );

        let mut delays = Vec::new();
        while let Some(d) = backoff.next_delay() {
            delays.push(d.as_millis() as u64);
        }

        assert_eq!(delays, vec![100, 200, 400, 300]);
        assert_eq!(delays.iter().sum::<u64>(), 1000);
    }

    #[test]
    fn backoff_accounts_for_time_handed_out() {
        let mut backoff = Backoff::new(
            Duration::from_millis(100),
            2,
            Duration::from_millis(400),
            Duration::from_millis(1000),
        );
        assert_eq!(backoff.spent(), Duration::ZERO);

        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.spent(), Duration::from_millis(300));

        while backoff.next_delay().is_some() {}
        // An exhausted budget reports exactly what was configured.
        assert_eq!(backoff.spent(), Duration::from_millis(1000));
    }
}
