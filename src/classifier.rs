//! Retry state machine: NEW -> RETRYING -> EXHAUSTED.
//!
//! [`classify`] is a pure function of the metadata and the current time.
//! [`Classifier::decide`] applies the metadata transition for the classified
//! state and tells the caller where the envelope goes next. The backoff delay
//! is computed once here and carried in the decision, so scheduling and
//! logging always agree on it.

use crate::backoff::delay_for;
use crate::clock::Clock;
use crate::envelope::{Envelope, HeaderValue, Metadata, RETRY_COUNT, RETRY_UNTIL, TRACE_ID};
use crate::error::EnvelopeError;
use std::time::Duration;
use uuid::Uuid;

/// Where an envelope stands in its retry lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Not yet in the retry flow.
    New,
    /// Deadline still ahead.
    Retrying { retry_until: i64, retry_count: u32 },
    /// Deadline reached or passed. Terminal.
    Exhausted { retry_until: i64, retry_count: u32 },
}

/// Classify retry metadata against `now_millis`.
///
/// The deadline check is strict: `retry_until == now` is exhausted.
pub fn classify(metadata: &Metadata, now_millis: i64) -> Result<RetryState, EnvelopeError> {
    let retry_until = read_integer(metadata, RETRY_UNTIL)?;
    let retry_count = read_integer(metadata, RETRY_COUNT)?;
    let (retry_until, retry_count) = match (retry_until, retry_count) {
        (None, None) => return Ok(RetryState::New),
        (Some(until), Some(count)) => (until, count),
        _ => return Err(EnvelopeError::InconsistentRetryHeaders),
    };
    let retry_count = u32::try_from(retry_count)
        .ok()
        .filter(|count| *count >= 1)
        .ok_or_else(|| EnvelopeError::InvalidHeader {
            key: RETRY_COUNT,
            reason: format!("expected a positive count, got {retry_count}"),
        })?;

    if now_millis < retry_until {
        Ok(RetryState::Retrying {
            retry_until,
            retry_count,
        })
    } else {
        Ok(RetryState::Exhausted {
            retry_until,
            retry_count,
        })
    }
}

fn read_integer(metadata: &Metadata, key: &'static str) -> Result<Option<i64>, EnvelopeError> {
    metadata
        .get(key)
        .map(|value| value.to_integer(key))
        .transpose()
}

/// Outcome of one classifier transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Re-emit on the retry channel after `delay`.
    Retry {
        envelope: Envelope,
        /// Value of `retry_count` after this transition.
        retry_count: u32,
        delay: Duration,
        /// True when this transition put the envelope into the retry flow.
        first_attempt: bool,
    },
    /// Hand to the exhaustion reporter now.
    Exhausted { envelope: Envelope },
}

/// Applies retry transitions using a fixed retry window and an injected clock.
#[derive(Debug, Clone)]
pub struct Classifier<C> {
    retry_window: Duration,
    clock: C,
}

impl<C: Clock> Classifier<C> {
    pub fn new(retry_window: Duration, clock: C) -> Self {
        Self {
            retry_window,
            clock,
        }
    }

    /// Run one transition on `envelope`.
    ///
    /// `trace_id` is stamped on every envelope that lacks one, whichever way
    /// it is routed, and is never overwritten.
    pub fn decide(&self, envelope: Envelope) -> Result<Decision, EnvelopeError> {
        let now = self.clock.now_millis();
        let state = classify(envelope.metadata(), now)?;
        let envelope = envelope.set_header_if_absent(TRACE_ID, || {
            HeaderValue::Text(Uuid::new_v4().to_string())
        });

        match state {
            RetryState::New => {
                let window = i64::try_from(self.retry_window.as_millis()).unwrap_or(i64::MAX);
                let retry_count = 1;
                Ok(Decision::Retry {
                    envelope: envelope
                        .set_header(RETRY_UNTIL, now.saturating_add(window))
                        .set_header(RETRY_COUNT, retry_count),
                    retry_count,
                    delay: delay_for(retry_count),
                    first_attempt: true,
                })
            }
            RetryState::Retrying { retry_count, .. } => {
                let retry_count = retry_count.saturating_add(1);
                Ok(Decision::Retry {
                    envelope: envelope.set_header(RETRY_COUNT, retry_count),
                    retry_count,
                    delay: delay_for(retry_count),
                    first_attempt: false,
                })
            }
            RetryState::Exhausted { .. } => Ok(Decision::Exhausted { envelope }),
        }
    }
}
