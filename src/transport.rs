//! JSON-lines binder between a byte stream and the retry stage.
//!
//! Each input line is one [`Envelope`]. Each output line is one
//! [`OutboundFrame`] naming the channel it belongs to:
//!
//! ```text
//! {"channel":"retry","envelope":{"payload":"...","metadata":{...}}}
//! {"channel":"output","envelope":{"payload":"...","metadata":{...}}}
//! {"channel":"error","message":"missing header `request_method`","trace_id":"..."}
//! ```
//!
//! A bad line or a contract violation produces an `error` frame for that
//! line only. I/O failures stop the binder.

use crate::clock::Clock;
use crate::envelope::{Envelope, TRACE_ID};
use crate::error::TransportError;
use crate::stage::{Disposition, RetryStage, StageChannels};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// One line of binder output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum OutboundFrame {
    Retry {
        envelope: Envelope,
    },
    Output {
        envelope: Envelope,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trace_id: Option<String>,
    },
}

/// Destination for outbound frames.
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: &OutboundFrame) -> Result<(), TransportError>;
}

/// Writes frames as newline-delimited JSON, flushing after each one.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> FrameSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: &OutboundFrame) -> Result<(), TransportError> {
        let mut line = serde_json::to_vec(frame).map_err(TransportError::Encode)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Decode one input line.
pub fn decode_envelope(line: &str) -> Result<Envelope, TransportError> {
    serde_json::from_str(line).map_err(TransportError::Decode)
}

/// Counters reported when the binder stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BinderSummary {
    pub received: u64,
    pub retried: u64,
    pub exhausted: u64,
    pub rejected: u64,
}

/// Pump envelopes from `reader` through `stage` and frames into `sink`.
///
/// After end of input the stage is dropped, so no new envelopes are accepted,
/// and the binder keeps forwarding until every scheduled envelope has been
/// released. It returns once both stage channels are closed.
pub async fn run_binder<R, S, C>(
    reader: R,
    sink: &mut S,
    stage: RetryStage<C>,
    channels: StageChannels,
) -> Result<BinderSummary, TransportError>
where
    R: AsyncBufRead + Unpin,
    S: FrameSink + ?Sized,
    C: Clock,
{
    let mut lines = reader.lines();
    let StageChannels {
        mut retry,
        mut output,
    } = channels;
    let mut stage = Some(stage);
    let mut retry_open = true;
    let mut output_open = true;
    let mut summary = BinderSummary::default();

    while stage.is_some() || retry_open || output_open {
        tokio::select! {
            line = lines.next_line(), if stage.is_some() => {
                match line? {
                    Some(line) => {
                        if let Some(active) = stage.as_ref() {
                            handle_line(active, &line, sink, &mut summary).await?;
                        }
                    }
                    None => {
                        if let Some(active) = stage.take() {
                            tracing::info!(pending = active.pending(), "input closed; draining scheduled retries");
                        }
                    }
                }
            }
            released = retry.recv(), if retry_open => match released {
                Some(envelope) => sink.send(&OutboundFrame::Retry { envelope }).await?,
                None => retry_open = false,
            },
            reported = output.recv(), if output_open => match reported {
                Some(envelope) => sink.send(&OutboundFrame::Output { envelope }).await?,
                None => output_open = false,
            },
        }
    }
    Ok(summary)
}

async fn handle_line<S, C>(
    stage: &RetryStage<C>,
    line: &str,
    sink: &mut S,
    summary: &mut BinderSummary,
) -> Result<(), TransportError>
where
    S: FrameSink + ?Sized,
    C: Clock,
{
    if line.trim().is_empty() {
        return Ok(());
    }
    summary.received += 1;

    let envelope = match decode_envelope(line) {
        Ok(envelope) => envelope,
        Err(err) => {
            summary.rejected += 1;
            tracing::warn!(error = %err, "rejected input line");
            return sink
                .send(&OutboundFrame::Error {
                    message: err.to_string(),
                    trace_id: None,
                })
                .await;
        }
    };

    let trace_id = envelope.text_header(TRACE_ID).map(str::to_string);
    match stage.process(envelope) {
        Ok(Disposition::Scheduled { .. }) => summary.retried += 1,
        Ok(Disposition::Exhausted { .. }) => summary.exhausted += 1,
        Err(err) => {
            summary.rejected += 1;
            tracing::warn!(error = %err, trace_id = ?trace_id, "rejected envelope");
            sink.send(&OutboundFrame::Error {
                message: err.to_string(),
                trace_id,
            })
            .await?;
        }
    }
    Ok(())
}
