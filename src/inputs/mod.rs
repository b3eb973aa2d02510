//! Transport-specific input implementations.

mod tcp;
mod udp;

pub use tcp::TcpInput;
pub use udp::UdpInput;

use std::net::SocketAddr;

use crate::{IntakeError, Result};

/// Resolve a configured address, symbolic hostnames included, to the
/// concrete address the socket will bind.
pub(crate) fn resolve_addr(address: &str) -> Result<SocketAddr> {
    use std::net::ToSocketAddrs;

    let mut addrs = address
        .to_socket_addrs()
        .map_err(|err| IntakeError::resolve(address, Some(err)))?;
    addrs.next().ok_or_else(|| IntakeError::resolve(address, None))
}
