//! Connectionless datagram input.
//!
//! The simpler variant of the pack lifecycle: one datagram is one message,
//! read directly into a pooled pack's byte region with no framing and no
//! signature support. Every datagram dispatches to this transport's single
//! supported encoding.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::InputConfig;
use crate::frame::{Encoding, MAX_MESSAGE_SIZE};
use crate::input::{Input, InputHelper};
use crate::runner::InputRunner;
use crate::{IntakeError, Result};

/// The one encoding this transport carries.
const DATAGRAM_ENCODING: Encoding = Encoding::Json;

/// Datagram input over a connectionless transport.
pub struct UdpInput {
    socket: Mutex<Option<std::net::UdpSocket>>,
    bound: Option<SocketAddr>,
    stop: CancellationToken,
}

impl UdpInput {
    pub fn new() -> Self {
        UdpInput { socket: Mutex::new(None), bound: None, stop: CancellationToken::new() }
    }

    /// Address the socket is bound to, available after `init`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound
    }
}

impl Default for UdpInput {
    fn default() -> Self {
        UdpInput::new()
    }
}

#[async_trait::async_trait]
impl Input for UdpInput {
    fn init(&mut self, config: &InputConfig) -> Result<()> {
        let InputConfig::Udp(config) = config else {
            return Err(IntakeError::config("datagram input requires a udp input config"));
        };
        let addr = super::resolve_addr(&config.address)?;
        let socket = std::net::UdpSocket::bind(addr)
            .map_err(|err| IntakeError::bind(&config.address, err))?;
        socket
            .set_nonblocking(true)
            .map_err(|err| IntakeError::bind(&config.address, err))?;
        let bound = socket.local_addr().map_err(|err| IntakeError::bind(&config.address, err))?;

        info!(address = %bound, "datagram input bound");
        self.bound = Some(bound);
        *self.socket.get_mut() = Some(socket);
        Ok(())
    }

    async fn run(&self, runner: &InputRunner, helper: &InputHelper) -> Result<()> {
        let Some(socket) = self.socket.lock().await.take() else {
            return Err(IntakeError::config("datagram input was not initialized"));
        };
        let socket = UdpSocket::from_std(socket)?;
        let decoders = helper.decoders_by_encoding();
        let Some(decoder) = decoders.by_encoding(DATAGRAM_ENCODING).cloned() else {
            return Err(IntakeError::config("no decoder registered for the datagram encoding"));
        };
        let supply = runner.pack_supply().clone();

        loop {
            let Some(mut pack) = (tokio::select! {
                _ = self.stop.cancelled() => None,
                pack = supply.acquire() => pack,
            }) else {
                break;
            };

            // One datagram per read, straight into the pack's byte region.
            pack.msg_bytes.resize(MAX_MESSAGE_SIZE, 0);
            let received = tokio::select! {
                _ = self.stop.cancelled() => None,
                received = socket.recv_from(&mut pack.msg_bytes) => Some(received),
            };
            let (n, peer) = match received {
                Some(Ok(pair)) => pair,
                Some(Err(err)) => {
                    warn!(error = %err, "datagram read failed, stopping input");
                    supply.release(pack);
                    break;
                }
                None => {
                    supply.release(pack);
                    break;
                }
            };
            pack.msg_bytes.truncate(n);
            pack.decoded = false;
            trace!(%peer, bytes = n, "datagram received");

            if let Err(pack) = decoder.submit(pack).await {
                debug!("decode queue closed, stopping submissions");
                supply.release(pack);
                break;
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.stop.cancel();
    }
}
