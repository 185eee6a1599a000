//! Native messaging envelope codec.
//!
//! Every message exchanged with the browser is a 4-byte little-endian length
//! followed by exactly that many bytes of UTF-8 JSON.
//!
//! read_message  -> payload bytes (one envelope)
//! write_message -> prefix + payload, flushed
//! encode        -> in-memory envelope (tests / direct buffers)
//!
//! Requests and responses use the same envelope shape.
use std::io::{self, Read, Write};
use thiserror::Error;

/// Size of the length prefix in bytes.
pub const HEADER_LEN: usize = 4;

/// Errors raised while moving envelopes across the wire.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The 4-byte length prefix could not be read.
    #[error("failed to read message header: {0}")]
    Protocol(#[source] io::Error),

    /// The stream ended before the advertised payload length was reached.
    #[error("truncated message: expected {expected} bytes, got {actual}")]
    TruncatedMessage { expected: u32, actual: usize },

    /// A payload longer than `u32::MAX` cannot be framed.
    #[error("message too large to frame: {0} bytes")]
    TooLarge(usize),

    /// Writing the envelope to the output stream failed.
    #[error("failed to write message: {0}")]
    Write(#[source] io::Error),
}

/// Read exactly one envelope and return its payload.
///
/// A declared length of zero yields an empty payload. The payload buffer grows
/// with the data actually received, so a bogus length on a short stream is
/// reported as truncated instead of pre-allocating the advertised size.
pub fn read_message<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, FrameError> {
    let mut header = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .map_err(FrameError::Protocol)?;
    let expected = u32::from_le_bytes(header);

    let mut payload = Vec::new();
    reader
        .take(u64::from(expected))
        .read_to_end(&mut payload)
        .map_err(FrameError::Protocol)?;

    if payload.len() != expected as usize {
        return Err(FrameError::TruncatedMessage {
            expected,
            actual: payload.len(),
        });
    }
    Ok(payload)
}

/// Build the envelope for `payload` in memory.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge(payload.len()))?;
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Write one envelope carrying `payload` and flush the writer.
pub fn write_message<W: Write + ?Sized>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let envelope = encode(payload)?;
    writer.write_all(&envelope).map_err(FrameError::Write)?;
    writer.flush().map_err(FrameError::Write)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_preserves_payload() {
        let large = format!(r#"{{"contents":"{}"}}"#, "x".repeat(64 * 1024));
        let payloads: Vec<Vec<u8>> = vec![
            Vec::new(),
            b"1".to_vec(),
            br#"{"command":"fetch","params":{"path":"/tmp/x"}}"#.to_vec(),
            r#"{"path":"C:\\ユーザー\\設定.txt","note":"é ü 🚀"}"#.as_bytes().to_vec(),
            large.into_bytes(),
        ];
        for payload in payloads {
            let mut wire = Vec::new();
            write_message(&mut wire, &payload).unwrap();

            assert_eq!(wire.len(), HEADER_LEN + payload.len());
            assert_eq!(&wire[..HEADER_LEN], &(payload.len() as u32).to_le_bytes());
            let mut cursor = Cursor::new(wire);
            let decoded = read_message(&mut cursor).unwrap();
            assert_eq!(decoded, payload, "payload of {} bytes", payload.len());
            assert_eq!(cursor.position() as usize, HEADER_LEN + payload.len());
        }
    }

    #[test]
    fn zero_length_is_an_empty_message() {
        let decoded = read_message(&mut Cursor::new(vec![0, 0, 0, 0])).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn multibyte_utf8_length_counts_bytes() {
        let payload = "{\"contents\":\"確認\"}".as_bytes();
        let envelope = encode(payload).unwrap();
        assert_eq!(
            u32::from_le_bytes([envelope[0], envelope[1], envelope[2], envelope[3]]) as usize,
            payload.len()
        );
        assert_eq!(envelope.len(), HEADER_LEN + payload.len());
    }

    #[test]
    fn short_payload_is_truncated() {
        let mut wire = 10u32.to_le_bytes().to_vec();
        wire.extend_from_slice(b"abc");
        let err = read_message(&mut Cursor::new(wire)).unwrap_err();
        match err {
            FrameError::TruncatedMessage { expected, actual } => {
                assert_eq!(expected, 10);
                assert_eq!(actual, 3);
            }
            other => panic!("expected TruncatedMessage, got {other:?}"),
        }
    }

    #[test]
    fn huge_declared_length_on_short_stream_is_truncated() {
        let mut wire = u32::MAX.to_le_bytes().to_vec();
        wire.extend_from_slice(b"{}");
        assert!(matches!(
            read_message(&mut Cursor::new(wire)),
            Err(FrameError::TruncatedMessage { actual: 2, .. })
        ));
    }

    #[test]
    fn missing_header_is_protocol_error() {
        let err = read_message(&mut Cursor::new(vec![1, 0])).unwrap_err();
        assert!(matches!(err, FrameError::Protocol(_)));
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn only_the_first_envelope_is_consumed() {
        let mut wire = encode(b"first").unwrap();
        wire.extend_from_slice(&encode(b"second").unwrap());
        let mut cursor = Cursor::new(wire);
        assert_eq!(read_message(&mut cursor).unwrap(), b"first".to_vec());
        assert_eq!(read_message(&mut cursor).unwrap(), b"second".to_vec());
    }
}
