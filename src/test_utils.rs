//! Shared helpers for tests and benchmarks.

use crate::frame::{Encoding, Header, HmacHash, encode_frame};
use crate::signer::hmac_digest;

/// Header for an unsigned frame over `payload`.
pub fn unsigned_header(payload: &[u8], encoding: Encoding) -> Header {
    Header::new(payload.len() as u32, encoding)
}

/// Header for a frame signed with `key` as `signer` at `version`.
pub fn signed_header(
    payload: &[u8],
    encoding: Encoding,
    hash: HmacHash,
    signer: &str,
    version: u32,
    key: &[u8],
) -> Header {
    let mut header = Header::new(payload.len() as u32, encoding);
    header.hmac_hash_function = Some(hash);
    header.hmac_signer = Some(signer.to_string());
    header.hmac_key_version = Some(version);
    header.hmac = Some(hmac_digest(hash, key, payload));
    header
}

/// Wire bytes for one frame. Panics on inconsistent inputs, which is a test
/// bug rather than a runtime condition.
pub fn frame_bytes(header: &Header, payload: &[u8]) -> Vec<u8> {
    encode_frame(header, payload).expect("test frame must encode")
}
