// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Fixed-interval polling with a bounded number of attempts

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// How often and how many times a condition is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Policy covering `timeout` with checks every `interval`
    pub fn for_timeout(timeout: Duration, interval: Duration) -> Self {
        let attempts = if interval.is_zero() {
            1
        } else {
            let steps = timeout.as_nanos() / interval.as_nanos();
            u32::try_from(steps)
                .unwrap_or(u32::MAX)
                .max(1)
                .saturating_add(1)
        };
        Self::new(attempts, interval)
    }
}

/// Furthest deadline handed out when a timeout does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// The instant `timeout` from now, capped instead of overflowing
pub fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Result of a bounded poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Exhausted { attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            PollOutcome::Ready(value) => Some(value),
            PollOutcome::Exhausted { .. } => None,
        }
    }
}

/// Check `what` until it yields a value or the policy is exhausted.
/// Errors from a check are logged and count as an attempt.
pub async fn poll<T, E, F, Fut>(policy: &PollPolicy, what: &str, mut check: F) -> PollOutcome<T>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 1..=policy.max_attempts {
        match check(attempt).await {
            Ok(Some(value)) => return PollOutcome::Ready(value),
            Ok(None) => {
                debug!(
                    "{} not ready (attempt {}/{})",
                    what, attempt, policy.max_attempts
                );
            }
            Err(e) => {
                warn!(
                    "Error checking {} (attempt {}/{}): {}",
                    what, attempt, policy.max_attempts, e
                );
            }
        }

        if attempt < policy.max_attempts {
            sleep(policy.interval).await;
        }
    }

    PollOutcome::Exhausted {
        attempts: policy.max_attempts,
    }
}
