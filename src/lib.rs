//! Framed, authenticated network ingestion for stream-processing pipelines.
//!
//! Intake is the input side of a message pipeline: it accepts framed,
//! optionally HMAC-signed messages over network transports, authenticates
//! and de-frames them, and hands the raw payloads to downstream decoders
//! while recycling pooled buffers under back-pressure.
//!
//! # Features
//!
//! - **Stream input**: length-delimited frames over connection-oriented
//!   transports, with per-message HMAC verification and key rotation
//! - **Datagram input**: one datagram, one message, zero framing
//! - **Buffer pooling**: a bounded pack pool whose exhaustion throttles
//!   reads instead of growing memory
//! - **Fault containment**: each input runs supervised; a panicking input
//!   stops, the process does not
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use intake::{
//!     DecoderHandle, DecoderSet, Encoding, Input, InputConfig, InputHelper, InputRunner,
//!     PackPool, TcpInput, TcpInputConfig,
//! };
//! use tokio_util::task::TaskTracker;
//!
//! #[tokio::main]
//! async fn main() -> intake::Result<()> {
//!     let pool = PackPool::new(64);
//!     let (json, mut json_rx) = DecoderHandle::channel(32);
//!     let mut decoders = DecoderSet::new();
//!     decoders.register(Encoding::Json, json);
//!
//!     let mut input = TcpInput::new();
//!     input.init(&InputConfig::Tcp(TcpInputConfig {
//!         address: "127.0.0.1:5565".into(),
//!         signers: vec![],
//!     }))?;
//!
//!     let runner = InputRunner::new("tcp", Arc::new(input), pool.supply());
//!     let tracker = TaskTracker::new();
//!     runner.start(InputHelper::new(Arc::new(decoders)), &tracker);
//!
//!     while let Some(mut pack) = json_rx.recv().await {
//!         // Decode pack.msg_bytes, then recycle the pack.
//!         pack.decoded = true;
//!         pool.supply().release(pack);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod decoder;
mod error;
pub mod frame;
pub mod input;
pub mod inputs;
pub mod pack;
pub mod runner;
pub mod signer;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

pub use config::{InputConfig, SignerSpec, TcpInputConfig, UdpInputConfig};
pub use decoder::{DecoderHandle, DecoderSet};
pub use error::{IntakeError, Result};
pub use frame::{
    Encoding, Header, HmacHash, MAX_HEADER_SIZE, MAX_MESSAGE_SIZE, RECORD_SEPARATOR,
    ScanOutcome, UNIT_SEPARATOR, encode_frame, scan_frame,
};
pub use input::{Input, InputHelper};
pub use inputs::{TcpInput, UdpInput};
pub use pack::{Pack, PackPool, PackSupply};
pub use runner::InputRunner;
pub use signer::{SignerRegistry, hmac_digest};
