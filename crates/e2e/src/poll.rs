//! Bounded polling for asynchronous backend state convergence
//!
//! Installment payment triggers quota activation asynchronously and the
//! backend offers no push signal, so the scenario polls with a fixed
//! attempt count and inter-attempt delay. Timing out is reported
//! separately from observing a wrong terminal state.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Retry count and inter-attempt delay for one poll loop
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl PollPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

/// What a single probe saw
#[derive(Debug, Clone)]
pub enum Observation<T> {
    /// The awaited state was reached
    Ready(T),
    /// Still in a transitional state, keep polling
    NotYet(T),
    /// A terminal state that can never become the awaited one
    WrongState(T),
}

/// Final result of a poll loop
#[derive(Debug, Clone)]
pub enum PollOutcome<T> {
    Satisfied { value: T, attempts: u32 },
    Exhausted { last_seen: T, attempts: u32 },
    WrongState { seen: T },
}

/// Run `probe` up to `policy.attempts` times, sleeping `policy.delay`
/// between attempts. Probe errors abort the loop immediately.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut probe: F) -> E2eResult<PollOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Observation<T>>>,
{
    if policy.attempts == 0 {
        return Err(E2eError::Assertion(
            "poll policy must allow at least one attempt".to_string(),
        ));
    }

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match probe().await? {
            Observation::Ready(value) => {
                debug!(attempt, "poll satisfied");
                return Ok(PollOutcome::Satisfied { value, attempts: attempt });
            }
            Observation::WrongState(seen) => {
                debug!(attempt, "poll observed wrong terminal state");
                return Ok(PollOutcome::WrongState { seen });
            }
            Observation::NotYet(last_seen) => {
                if attempt >= policy.attempts {
                    return Ok(PollOutcome::Exhausted {
                        last_seen,
                        attempts: attempt,
                    });
                }
                debug!(attempt, "poll not yet satisfied, sleeping");
                sleep(policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(attempts: u32) -> PollPolicy {
        PollPolicy::new(attempts, Duration::from_millis(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_satisfied_on_later_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe_calls = calls.clone();
        let outcome = poll_until(policy(5), move || {
            let calls = probe_calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= 3 {
                    Ok(Observation::Ready(n))
                } else {
                    Ok(Observation::NotYet(n))
                }
            }
        })
        .await
        .unwrap();

        match outcome {
            PollOutcome::Satisfied { value, attempts } => {
                assert_eq!(value, 3);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected satisfied, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_reports_last_seen() {
        let outcome = poll_until(policy(3), || async { Ok(Observation::NotYet("PENDENTE")) })
            .await
            .unwrap();
        match outcome {
            PollOutcome::Exhausted { last_seen, attempts } => {
                assert_eq!(last_seen, "PENDENTE");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected exhausted, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_state_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe_calls = calls.clone();
        let outcome = poll_until(policy(5), move || {
            let calls = probe_calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Observation::WrongState("CANCELADA"))
            }
        })
        .await
        .unwrap();
        assert!(matches!(outcome, PollOutcome::WrongState { seen: "CANCELADA" }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_aborts() {
        let result: E2eResult<PollOutcome<()>> = poll_until(policy(5), || async {
            Err(E2eError::Assertion("probe exploded".to_string()))
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_zero_attempts_rejected() {
        let result: E2eResult<PollOutcome<()>> =
            poll_until(policy(0), || async { Ok(Observation::Ready(())) }).await;
        assert!(result.is_err());
    }
}
