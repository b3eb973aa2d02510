//! Connection-oriented stream input.
//!
//! Accepts connections, de-frames the byte stream, verifies signatures, and
//! dispatches accepted payloads to decode queues. Each connection gets its
//! own read loop task; a dying connection never disturbs its siblings or the
//! accept loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::config::InputConfig;
use crate::decoder::DecoderSet;
use crate::frame::{Header, MAX_HEADER_SIZE, MAX_MESSAGE_SIZE, ScanOutcome, scan_frame};
use crate::input::{Input, InputHelper};
use crate::pack::{Pack, PackSupply};
use crate::runner::InputRunner;
use crate::signer::SignerRegistry;
use crate::{IntakeError, Result};

/// Working region for one connection: a maximal frame plus its separators
/// and length byte.
const READ_BUF_SIZE: usize = MAX_HEADER_SIZE + MAX_MESSAGE_SIZE + 3;

/// Stream input over a connection-oriented transport.
pub struct TcpInput {
    listener: Mutex<Option<std::net::TcpListener>>,
    bound: Option<SocketAddr>,
    signers: Arc<SignerRegistry>,
    stop: CancellationToken,
}

impl TcpInput {
    pub fn new() -> Self {
        TcpInput {
            listener: Mutex::new(None),
            bound: None,
            signers: Arc::new(SignerRegistry::new()),
            stop: CancellationToken::new(),
        }
    }

    /// Address the listener is bound to, available after `init`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound
    }
}

impl Default for TcpInput {
    fn default() -> Self {
        TcpInput::new()
    }
}

#[async_trait::async_trait]
impl Input for TcpInput {
    fn init(&mut self, config: &InputConfig) -> Result<()> {
        let InputConfig::Tcp(config) = config else {
            return Err(IntakeError::config("stream input requires a tcp input config"));
        };
        let addr = super::resolve_addr(&config.address)?;
        let listener = std::net::TcpListener::bind(addr)
            .map_err(|err| IntakeError::bind(&config.address, err))?;
        listener
            .set_nonblocking(true)
            .map_err(|err| IntakeError::bind(&config.address, err))?;
        let bound = listener.local_addr().map_err(|err| IntakeError::bind(&config.address, err))?;

        info!(address = %bound, "stream input bound");
        self.bound = Some(bound);
        *self.listener.get_mut() = Some(listener);
        self.signers = Arc::new(SignerRegistry::from_specs(&config.signers));
        Ok(())
    }

    async fn run(&self, runner: &InputRunner, helper: &InputHelper) -> Result<()> {
        let Some(listener) = self.listener.lock().await.take() else {
            return Err(IntakeError::config("stream input was not initialized"));
        };
        let listener = TcpListener::from_std(listener)?;
        let decoders = helper.decoders_by_encoding();
        let supply = runner.pack_supply().clone();
        let connections = TaskTracker::new();

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted connection");
                        connections.spawn(read_loop(
                            stream,
                            peer,
                            supply.clone(),
                            Arc::clone(&decoders),
                            Arc::clone(&self.signers),
                            self.stop.clone(),
                        ));
                    }
                    Err(err) if is_transient_accept_error(&err) => {
                        warn!(error = %err, "transient accept error, retrying");
                    }
                    Err(err) => {
                        // Open connections keep draining; only accepting ends.
                        warn!(error = %err, "accept loop terminated");
                        return Err(IntakeError::accept(err));
                    }
                },
            }
        }

        connections.close();
        connections.wait().await;
        Ok(())
    }

    fn stop(&self) {
        self.stop.cancel();
    }
}

/// Accept errors the listener can survive.
fn is_transient_accept_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

/// What became of one frame handed to [`deliver`].
enum Deliver {
    /// Ownership moved to a decode queue.
    Sent,
    /// Dropped; the pack is clean and ready for the next frame.
    Recycled(Pack),
    /// The decode queue closed; stop submitting on this connection.
    Stop(Pack),
}

/// Read loop for one accepted connection.
///
/// A pack is reserved from the pool before each transport read, so pool
/// exhaustion pushes back on reading rather than piling up frames. The loop
/// ends on read error, EOF, stop, or a closed decode queue; any reserved
/// pack goes back to the pool on the way out.
async fn read_loop(
    mut stream: TcpStream,
    peer: SocketAddr,
    supply: PackSupply,
    decoders: Arc<DecoderSet>,
    signers: Arc<SignerRegistry>,
    stop: CancellationToken,
) {
    let mut buf: Vec<u8> = Vec::with_capacity(READ_BUF_SIZE);
    let mut chunk = vec![0u8; READ_BUF_SIZE];
    let mut reserved: Option<Pack> = None;

    'outer: loop {
        if reserved.is_none() {
            reserved = tokio::select! {
                _ = stop.cancelled() => None,
                pack = supply.acquire() => pack,
            };
            if reserved.is_none() {
                break;
            }
        }

        let read = tokio::select! {
            _ = stop.cancelled() => None,
            read = stream.read(&mut chunk) => Some(read),
        };
        let n = match read {
            Some(Ok(0)) | None => {
                debug!(%peer, "connection closed");
                break;
            }
            Some(Ok(n)) => n,
            Some(Err(err)) => {
                debug!(%peer, error = %err, "read error, dropping connection");
                break;
            }
        };
        buf.extend_from_slice(&chunk[..n]);

        loop {
            match scan_frame(&buf) {
                ScanOutcome::Incomplete { discard } => {
                    if discard > 0 {
                        buf.drain(..discard);
                    }
                    break;
                }
                ScanOutcome::Frame { header, payload } => {
                    let pack = match reserved.take() {
                        Some(pack) => pack,
                        None => tokio::select! {
                            _ = stop.cancelled() => break 'outer,
                            pack = supply.acquire() => match pack {
                                Some(pack) => pack,
                                None => break 'outer,
                            },
                        },
                    };
                    let end = payload.end;
                    let outcome =
                        deliver(pack, &header, &buf[payload], &decoders, &signers, peer).await;
                    buf.drain(..end);
                    match outcome {
                        Deliver::Sent => {}
                        Deliver::Recycled(pack) => reserved = Some(pack),
                        Deliver::Stop(pack) => {
                            supply.release(pack);
                            break 'outer;
                        }
                    }
                }
            }
        }
    }

    if let Some(pack) = reserved.take() {
        supply.release(pack);
    }
}

/// Verify one frame and hand it to its decoder.
async fn deliver(
    mut pack: Pack,
    header: &Header,
    payload: &[u8],
    decoders: &DecoderSet,
    signers: &SignerRegistry,
    peer: SocketAddr,
) -> Deliver {
    let Some(identity) = signers.verify(payload, header) else {
        trace!(%peer, "dropping unauthenticated message");
        pack.reset();
        return Deliver::Recycled(pack);
    };
    let Some(decoder) = decoders.by_encoding(header.encoding) else {
        debug!(%peer, encoding = ?header.encoding, "no decoder registered, dropping message");
        pack.reset();
        return Deliver::Recycled(pack);
    };

    pack.set_payload(payload);
    pack.decoded = false;
    pack.signer = identity;
    match decoder.submit(pack).await {
        Ok(()) => Deliver::Sent,
        Err(pack) => {
            debug!(%peer, "decode queue closed, stopping submissions");
            Deliver::Stop(pack)
        }
    }
}
