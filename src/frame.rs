//! Wire framing for the stream transport.
//!
//! One frame on the wire is
//!
//! ```text
//! RECORD_SEPARATOR | header_length (1 byte) | header bytes | UNIT_SEPARATOR | payload bytes
//! ```
//!
//! where the header is a small self-describing record ([`Header`], serialized
//! with bincode) carrying the declared payload length, the payload encoding,
//! and optional HMAC metadata. The payload is opaque at this layer; decoding
//! it belongs to whichever decoder the header's encoding selects.
//!
//! [`scan_frame`] is a single step of the de-framing state machine: callers
//! accumulate transport reads into a buffer and call it until a complete
//! frame appears. Malformed frames are skipped internally by resynchronizing
//! on the next record separator, so garbage on the wire costs bytes, never a
//! connection-level error.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{IntakeError, Result};

/// First byte of every frame.
pub const RECORD_SEPARATOR: u8 = 0x1E;

/// Separates the serialized header from the payload bytes.
pub const UNIT_SEPARATOR: u8 = 0x1F;

/// Upper bound on the serialized header, enforced by the codec.
pub const MAX_HEADER_SIZE: usize = 255;

/// Upper bound on a single message payload, enforced by the codec.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Payload encoding declared by a frame header.
///
/// The variant order is the wire numbering; it also indexes the decoder
/// dispatch table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    #[default]
    ProtocolBuffer,
    Json,
}

impl Encoding {
    /// Number of dispatch slots, one per encoding.
    pub const SLOTS: usize = 2;

    /// Slot index in the decoder dispatch table.
    pub fn slot(self) -> usize {
        match self {
            Encoding::ProtocolBuffer => 0,
            Encoding::Json => 1,
        }
    }
}

/// Hash function behind a frame's HMAC digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HmacHash {
    Md5,
    Sha1,
}

/// Per-frame metadata, alive only while one frame is processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Declared payload length in bytes.
    pub message_length: u32,
    /// Encoding of the payload, selecting the decoder.
    pub encoding: Encoding,
    /// Hash function of the digest, present on signed frames.
    pub hmac_hash_function: Option<HmacHash>,
    /// Signer name, present on signed frames.
    pub hmac_signer: Option<String>,
    /// Signing key version, present on signed frames.
    pub hmac_key_version: Option<u32>,
    /// Declared HMAC digest over the payload bytes.
    pub hmac: Option<Vec<u8>>,
}

impl Header {
    /// Header for an unsigned frame.
    pub fn new(message_length: u32, encoding: Encoding) -> Self {
        Header { message_length, encoding, ..Header::default() }
    }
}

/// Result of scanning an accumulation buffer for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No complete frame yet. The first `discard` bytes carry no frame data
    /// and can be dropped before the next transport read.
    Incomplete { discard: usize },
    /// A complete frame. The payload lives at `buf[payload.clone()]`; once it
    /// is consumed, `buf[..payload.end]` can be dropped.
    Frame { header: Header, payload: Range<usize> },
}

enum Parse {
    Incomplete,
    Malformed(&'static str),
    Frame { header: Header, payload: Range<usize> },
}

/// Encode one frame for the stream transport.
///
/// `header.message_length` must equal the payload length; mismatches are
/// rejected here rather than silently producing a frame the receiving codec
/// would misparse.
pub fn encode_frame(header: &Header, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(IntakeError::frame("payload exceeds maximum message size"));
    }
    if header.message_length as usize != payload.len() {
        return Err(IntakeError::frame("declared length does not match payload"));
    }
    let header_bytes =
        bincode::serialize(header).map_err(|source| IntakeError::Header { source })?;
    if header_bytes.len() > MAX_HEADER_SIZE {
        return Err(IntakeError::frame("serialized header exceeds maximum header size"));
    }

    let mut buf = Vec::with_capacity(3 + header_bytes.len() + payload.len());
    buf.push(RECORD_SEPARATOR);
    buf.push(header_bytes.len() as u8);
    buf.extend_from_slice(&header_bytes);
    buf.push(UNIT_SEPARATOR);
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Scan an accumulation buffer for the next complete frame.
///
/// Leading bytes that cannot start a frame (no record separator, or a
/// separator opening a malformed frame) are skipped; the outcome tells the
/// caller how much of the buffer front is dead either way. The scan itself
/// never fails: on arbitrary input it either finds a frame or asks for more
/// bytes.
pub fn scan_frame(buf: &[u8]) -> ScanOutcome {
    let mut pos = 0;
    loop {
        match buf[pos..].iter().position(|&b| b == RECORD_SEPARATOR) {
            Some(offset) => pos += offset,
            None => return ScanOutcome::Incomplete { discard: buf.len() },
        }
        match parse_at(buf, pos) {
            Parse::Frame { header, payload } => return ScanOutcome::Frame { header, payload },
            Parse::Incomplete => return ScanOutcome::Incomplete { discard: pos },
            Parse::Malformed(reason) => {
                trace!(at = pos, reason, "skipping malformed frame");
                pos += 1;
            }
        }
    }
}

/// Try to parse one frame starting at the record separator at `pos`.
fn parse_at(buf: &[u8], pos: usize) -> Parse {
    let rest = &buf[pos..];
    if rest.len() < 2 {
        return Parse::Incomplete;
    }
    let header_len = rest[1] as usize;
    if header_len == 0 || header_len > MAX_HEADER_SIZE {
        return Parse::Malformed("header length out of bounds");
    }
    let sep_at = 2 + header_len;
    if rest.len() <= sep_at {
        return Parse::Incomplete;
    }
    if rest[sep_at] != UNIT_SEPARATOR {
        return Parse::Malformed("missing unit separator");
    }
    let header: Header = match bincode::deserialize(&rest[2..sep_at]) {
        Ok(header) => header,
        Err(_) => return Parse::Malformed("undecodable header"),
    };
    let message_length = header.message_length as usize;
    if message_length > MAX_MESSAGE_SIZE {
        return Parse::Malformed("declared length exceeds maximum message size");
    }
    let payload_start = pos + sep_at + 1;
    if buf.len() < payload_start + message_length {
        return Parse::Incomplete;
    }
    Parse::Frame { header, payload: payload_start..payload_start + message_length }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frame_of(payload: &[u8]) -> Vec<u8> {
        let header = Header::new(payload.len() as u32, Encoding::ProtocolBuffer);
        encode_frame(&header, payload).expect("encode")
    }

    #[test]
    fn round_trip_recovers_header_and_payload() {
        let payload = b"example payload bytes";
        let mut header = Header::new(payload.len() as u32, Encoding::Json);
        header.hmac_hash_function = Some(HmacHash::Sha1);
        header.hmac_signer = Some("ingest".to_string());
        header.hmac_key_version = Some(3);
        header.hmac = Some(vec![0xAB; 20]);

        let wire = encode_frame(&header, payload).expect("encode");
        match scan_frame(&wire) {
            ScanOutcome::Frame { header: decoded, payload: range } => {
                assert_eq!(decoded, header);
                assert_eq!(&wire[range], payload.as_slice());
            }
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn garbage_before_frame_is_skipped() {
        let mut wire = b"noise without separators".to_vec();
        let garbage_len = wire.len();
        wire.extend_from_slice(&frame_of(b"payload"));

        match scan_frame(&wire) {
            ScanOutcome::Frame { payload, .. } => {
                assert_eq!(&wire[payload.clone()], b"payload");
                assert!(payload.start > garbage_len);
            }
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn malformed_frame_resyncs_to_next_frame() {
        // Record separator opening a "frame" whose unit separator is absent.
        let mut wire = vec![RECORD_SEPARATOR, 4, 0, 0, 0, 0, 0xFF];
        wire.extend_from_slice(&frame_of(b"good"));

        match scan_frame(&wire) {
            ScanOutcome::Frame { payload, .. } => assert_eq!(&wire[payload], b"good"),
            other => panic!("expected the second frame, got {other:?}"),
        }
    }

    #[test]
    fn zero_header_length_is_malformed() {
        let mut wire = vec![RECORD_SEPARATOR, 0];
        wire.extend_from_slice(&frame_of(b"ok"));
        match scan_frame(&wire) {
            ScanOutcome::Frame { payload, .. } => assert_eq!(&wire[payload], b"ok"),
            other => panic!("expected resync past the empty header, got {other:?}"),
        }
    }

    #[test]
    fn oversized_declared_length_is_malformed() {
        let payload = b"tiny";
        let mut header = Header::new(payload.len() as u32, Encoding::ProtocolBuffer);
        let mut wire = encode_frame(&header, payload).expect("encode");
        // Rewrite the serialized header to declare an impossible length.
        header.message_length = (MAX_MESSAGE_SIZE + 1) as u32;
        let bad_header = bincode::serialize(&header).expect("serialize");
        wire[2..2 + bad_header.len()].copy_from_slice(&bad_header);

        assert_eq!(scan_frame(&wire), ScanOutcome::Incomplete { discard: wire.len() });
    }

    #[test]
    fn partial_frame_reports_incomplete_without_discarding_frame_bytes() {
        let wire = frame_of(b"split across reads");
        let partial = &wire[..wire.len() - 5];
        assert_eq!(scan_frame(partial), ScanOutcome::Incomplete { discard: 0 });
    }

    #[test]
    fn encode_rejects_length_mismatch() {
        let header = Header::new(3, Encoding::Json);
        assert!(encode_frame(&header, b"four").is_err());
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_MESSAGE_SIZE + 1];
        let header = Header::new(payload.len() as u32, Encoding::Json);
        assert!(encode_frame(&header, &payload).is_err());
    }

    #[test]
    fn two_frames_scan_in_order() {
        let mut wire = frame_of(b"first");
        wire.extend_from_slice(&frame_of(b"second"));

        let ScanOutcome::Frame { payload, .. } = scan_frame(&wire) else {
            panic!("expected first frame");
        };
        assert_eq!(&wire[payload.clone()], b"first");
        let rest = wire.split_off(payload.end);
        let ScanOutcome::Frame { payload, .. } = scan_frame(&rest) else {
            panic!("expected second frame");
        };
        assert_eq!(&rest[payload], b"second");
    }

    proptest! {
        #[test]
        fn scanning_arbitrary_bytes_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let _ = scan_frame(&bytes);
        }

        #[test]
        fn frame_survives_junk_prefix(
            junk in proptest::collection::vec(any::<u8>().prop_filter("no record separator", |b| *b != RECORD_SEPARATOR), 0..256),
            payload in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let mut wire = junk;
            wire.extend_from_slice(&frame_of(&payload));
            match scan_frame(&wire) {
                ScanOutcome::Frame { header, payload: range } => {
                    prop_assert_eq!(header.message_length as usize, payload.len());
                    prop_assert_eq!(&wire[range], payload.as_slice());
                }
                other => prop_assert!(false, "expected a frame, got {:?}", other),
            }
        }
    }
}
