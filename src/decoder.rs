//! Decoder dispatch.
//!
//! Inputs do not interpret payloads; they hand each accepted pack to the
//! decoder registered for the frame's declared encoding. The dispatch table
//! is populated once at startup and only read afterwards. An absent slot
//! means no decoder handles that encoding, and messages of that type are
//! dropped with their pack released back to the pool.

use tokio::sync::mpsc;

use crate::frame::Encoding;
use crate::pack::Pack;

/// Handle to one decoder's ingress queue.
#[derive(Debug, Clone)]
pub struct DecoderHandle {
    tx: mpsc::Sender<Pack>,
}

impl DecoderHandle {
    /// Create a handle plus the receiving end the decoder consumes from.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Pack>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (DecoderHandle { tx }, rx)
    }

    /// Submit a pack to the decoder, waiting while its queue is full.
    ///
    /// The pack comes back as the error when the decoder has shut down. That
    /// is a terminal signal: the producer must stop submitting, not retry.
    pub async fn submit(&self, pack: Pack) -> Result<(), Pack> {
        self.tx.send(pack).await.map_err(|rejected| rejected.0)
    }
}

/// Encoding-indexed decoder slots.
#[derive(Debug, Default)]
pub struct DecoderSet {
    slots: [Option<DecoderHandle>; Encoding::SLOTS],
}

impl DecoderSet {
    pub fn new() -> Self {
        DecoderSet::default()
    }

    /// Register the decoder for one encoding, replacing any previous one.
    pub fn register(&mut self, encoding: Encoding, handle: DecoderHandle) {
        self.slots[encoding.slot()] = Some(handle);
    }

    /// Decoder for `encoding`, or `None` when that encoding is unroutable.
    pub fn by_encoding(&self, encoding: Encoding) -> Option<&DecoderHandle> {
        self.slots[encoding.slot()].as_ref()
    }
}
