//! retry-stage: a retry-orchestration stage for message pipelines.
//!
//! The stage sits between a stage that issues remote calls and a stage that
//! consumes their responses. Each incoming [`envelope::Envelope`] describes a
//! failed call. The stage either re-emits it on the `retry` channel after an
//! exponential backoff, or, once the retry window has closed, emits a
//! diagnostic envelope on the `output` channel. All retry state travels in
//! envelope metadata, so the stage holds nothing per lineage.
//!
//! # Quick start
//!
//! ```no_run
//! use retry_stage::clock::SystemClock;
//! use retry_stage::config::{load_config, CliOverrides};
//! use retry_stage::envelope::{Envelope, REQUEST_METHOD};
//! use retry_stage::stage::RetryStage;
//!
//! # async fn example() {
//! let loaded = load_config(None, &CliOverrides::default()).unwrap();
//! let (stage, mut channels) = RetryStage::new(&loaded.config.retry, SystemClock);
//! stage
//!     .process(Envelope::with_payload("body").set_header(REQUEST_METHOD, "GET"))
//!     .unwrap();
//! let retried = channels.retry.recv().await;
//! # }
//! ```

pub mod backoff;
pub mod build_info;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod media_type;
pub mod reporter;
pub mod scheduler;
pub mod stage;
pub mod transport;
