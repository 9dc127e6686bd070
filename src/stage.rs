//! The retry stage: classifier, delay scheduler and exhaustion reporter wired
//! to the `retry` and `output` channels.
//!
//! [`RetryStage::process`] never blocks. A retry decision is handed to the
//! delay scheduler and surfaces on the retry channel once its delay elapses;
//! an exhausted envelope is reported and pushed to the output channel at once.

use crate::classifier::{Classifier, Decision};
use crate::clock::Clock;
use crate::config::RetryConfig;
use crate::envelope::{Envelope, RETRY_UNTIL, TRACE_ID};
use crate::error::EnvelopeError;
use crate::reporter::report;
use crate::scheduler::{DelayScheduler, PendingCount};
use std::time::Duration;
use tokio::sync::mpsc;

/// Receivers for the stage's two outbound channels.
pub struct StageChannels {
    /// Envelopes to re-attempt, released after their backoff delay.
    pub retry: mpsc::UnboundedReceiver<Envelope>,
    /// Diagnostic envelopes for exhausted lineages.
    pub output: mpsc::UnboundedReceiver<Envelope>,
}

/// What happened to one processed envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Scheduled {
        trace_id: String,
        retry_count: u32,
        delay: Duration,
    },
    Exhausted {
        trace_id: String,
    },
}

pub struct RetryStage<C> {
    classifier: Classifier<C>,
    scheduler: DelayScheduler,
    output_tx: mpsc::UnboundedSender<Envelope>,
    group: String,
}

impl<C: Clock> RetryStage<C> {
    pub fn new(config: &RetryConfig, clock: C) -> (Self, StageChannels) {
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let stage = Self {
            classifier: Classifier::new(config.duration, clock),
            scheduler: DelayScheduler::new(retry_tx),
            output_tx,
            group: config.group.clone(),
        };
        (
            stage,
            StageChannels {
                retry: retry_rx,
                output: output_rx,
            },
        )
    }

    /// Envelopes waiting in the delay scheduler.
    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    /// Pending-count handle that outlives the stage, for shutdown reporting.
    pub fn pending_count(&self) -> PendingCount {
        self.scheduler.pending_count()
    }

    /// Route one incoming envelope.
    ///
    /// A contract violation fails only this envelope; the caller decides how
    /// to signal it to the transport.
    pub fn process(&self, envelope: Envelope) -> Result<Disposition, EnvelopeError> {
        match self.classifier.decide(envelope)? {
            Decision::Retry {
                envelope,
                retry_count,
                delay,
                first_attempt,
            } => {
                let trace_id = trace_id_of(&envelope);
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                if first_attempt {
                    let retry_until = envelope.integer_header(RETRY_UNTIL).ok().flatten();
                    tracing::info!(
                        trace_id = %trace_id,
                        retry_count,
                        delay_ms,
                        retry_until,
                        group = %self.group,
                        "started retry"
                    );
                } else {
                    tracing::info!(
                        trace_id = %trace_id,
                        retry_count,
                        delay_ms,
                        group = %self.group,
                        "retrying"
                    );
                }
                self.scheduler.schedule(envelope, delay, &self.group);
                Ok(Disposition::Scheduled {
                    trace_id,
                    retry_count,
                    delay,
                })
            }
            Decision::Exhausted { envelope } => {
                let trace_id = trace_id_of(&envelope);
                tracing::info!(trace_id = %trace_id, "retries exhausted");
                let diagnostic = report(envelope)?;
                if self.output_tx.send(diagnostic).is_err() {
                    tracing::warn!(trace_id = %trace_id, "output channel closed; dropping report");
                }
                Ok(Disposition::Exhausted { trace_id })
            }
        }
    }
}

fn trace_id_of(envelope: &Envelope) -> String {
    envelope.text_header(TRACE_ID).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::envelope::{REQUEST_METHOD, RETRY_COUNT, STATUS_CODE};

    const NOW: i64 = 1_700_000_000_000;

    fn stage() -> (RetryStage<ManualClock>, StageChannels, ManualClock) {
        let clock = ManualClock::new(NOW);
        let config = RetryConfig {
            duration: Duration::from_secs(60),
            group: "stage.test".to_string(),
        };
        let (stage, channels) = RetryStage::new(&config, clock.clone());
        (stage, channels, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_envelope_surfaces_on_retry_channel() {
        let (stage, mut channels, _) = stage();
        let input = Envelope::with_payload("x").set_header(REQUEST_METHOD, "GET");

        let disposition = stage.process(input).expect("process");
        let Disposition::Scheduled {
            trace_id,
            retry_count,
            delay,
        } = disposition
        else {
            panic!("expected scheduling");
        };
        assert_eq!(retry_count, 1);
        assert_eq!(delay, Duration::from_secs(2));
        assert_eq!(stage.pending(), 1);

        let released = channels.retry.recv().await.expect("released");
        assert_eq!(released.text_header(TRACE_ID), Some(trace_id.as_str()));
        assert_eq!(released.integer_header(RETRY_COUNT), Ok(Some(1)));
        assert!(channels.output.try_recv().is_err());
    }

    #[tokio::test]
    async fn exhausted_envelope_goes_straight_to_output() {
        let (stage, mut channels, _) = stage();
        let input = Envelope::with_payload("x")
            .set_header(REQUEST_METHOD, "GET")
            .set_header(STATUS_CODE, 500i64)
            .set_header(RETRY_UNTIL, NOW - 1)
            .set_header(RETRY_COUNT, 4u32);

        let disposition = stage.process(input).expect("process");
        assert!(matches!(disposition, Disposition::Exhausted { .. }));
        let report = channels.output.try_recv().expect("report emitted immediately");
        assert_eq!(report.integer_header(STATUS_CODE), Ok(Some(502)));
        assert_eq!(stage.pending(), 0);
    }

    #[tokio::test]
    async fn contract_violation_fails_only_that_envelope() {
        let (stage, mut channels, _) = stage();
        let bad = Envelope::with_payload("x")
            .set_header(RETRY_UNTIL, NOW - 1)
            .set_header(RETRY_COUNT, 1u32);
        assert_eq!(
            stage.process(bad),
            Err(EnvelopeError::MissingHeader(REQUEST_METHOD))
        );

        let good = Envelope::with_payload("x")
            .set_header(REQUEST_METHOD, "GET")
            .set_header(STATUS_CODE, 429i64)
            .set_header(RETRY_UNTIL, NOW - 1)
            .set_header(RETRY_COUNT, 1u32);
        stage.process(good).expect("process");
        assert!(channels.output.try_recv().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn lineage_runs_until_the_window_closes() {
        // Feeding each released retry back in must walk the whole lineage.
        let (stage, mut channels, clock) = stage();
        let mut envelope = Envelope::with_payload("x")
            .set_header(REQUEST_METHOD, "GET")
            .set_header(STATUS_CODE, 503i64);
        let mut counts = Vec::new();

        loop {
            match stage.process(envelope).expect("process") {
                Disposition::Scheduled {
                    retry_count, delay, ..
                } => {
                    counts.push(retry_count);
                    clock.advance_millis(delay.as_millis() as i64);
                    envelope = channels.retry.recv().await.expect("released");
                }
                Disposition::Exhausted { .. } => break,
            }
        }

        // 2s + 4s + 8s + 16s = 30s, then +32s crosses the 60s window.
        assert_eq!(counts, [1, 2, 3, 4, 5]);
        let report = channels.output.recv().await.expect("report");
        assert_eq!(report.integer_header(RETRY_COUNT), Ok(Some(5)));
    }
}
