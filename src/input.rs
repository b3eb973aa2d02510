//! Input capability interface.

use std::sync::Arc;

use crate::Result;
use crate::config::InputConfig;
use crate::decoder::DecoderSet;
use crate::runner::InputRunner;

/// A source of raw messages bound to one transport.
///
/// Transport-specific variants implement this shared interface; the frame
/// codec and signer registry are composed in by the stream variant only.
/// `init` consumes configuration before the input is started, `run` loops
/// until the transport closes or the input is stopped, and `stop` asks a
/// running input to wind down. `run` executes under an [`InputRunner`], which
/// contains any fault it raises.
#[async_trait::async_trait]
pub trait Input: Send + Sync + 'static {
    /// Consume configuration. Called exactly once, before `run`.
    fn init(&mut self, config: &InputConfig) -> Result<()>;

    /// Read messages until the transport closes or `stop` is called.
    async fn run(&self, runner: &InputRunner, helper: &InputHelper) -> Result<()>;

    /// Ask a running input to wind down.
    fn stop(&self);
}

/// Capabilities the execution environment exposes to inputs.
///
/// Deliberately narrow: the decoder table here and the buffer supply on the
/// runner are the only two things an input gets from its host.
#[derive(Debug, Clone)]
pub struct InputHelper {
    decoders: Arc<DecoderSet>,
}

impl InputHelper {
    pub fn new(decoders: Arc<DecoderSet>) -> Self {
        InputHelper { decoders }
    }

    /// The encoding-indexed decoder table, fixed for the process lifetime.
    pub fn decoders_by_encoding(&self) -> Arc<DecoderSet> {
        Arc::clone(&self.decoders)
    }
}
