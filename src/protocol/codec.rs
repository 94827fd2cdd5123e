//! Length-prefixed frame codec
//!
//! The same record serialization is used for live frames and for trace
//! files, so a sample read back from disk is bit-identical to the one that
//! went out over TCP.

use std::io::ErrorKind;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::protocol::constants::{LENGTH_PREFIX_SIZE, MAX_RECORD_SIZE};
use crate::sample::Sample;

/// Serialize a record without framing
pub fn encode_record<T: Serialize + ?Sized>(record: &T) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec(record)?)
}

/// Deserialize a record produced by [`encode_record`]
pub fn decode_record<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    Ok(rmp_serde::from_slice(data)?)
}

/// Encode a sample as `[u32 BE length][record]`
pub fn encode(sample: &Sample) -> Result<Bytes> {
    let body = encode_record(sample)?;
    if body.len() > MAX_RECORD_SIZE {
        return Err(Error::Codec(format!(
            "record of {} bytes exceeds the length prefix",
            body.len()
        )));
    }

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    buf.put_u32(body.len() as u32);
    buf.put_slice(&body);
    Ok(buf.freeze())
}

/// Read exactly one frame from `reader`
///
/// Waits for the full length prefix and then the full record. A stream
/// that ends before either is complete yields `ConnectionClosed`.
pub async fn read_frame<R>(reader: &mut R) -> Result<Sample>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    read_full(reader, &mut prefix).await?;

    let len = u32::from_be_bytes(prefix) as usize;
    let mut body = vec![0u8; len];
    read_full(reader, &mut body).await?;

    decode_record(&body)
}

/// Write one already-encoded frame and flush it
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await.map_err(map_peer_error)?;
    writer.flush().await.map_err(map_peer_error)?;
    Ok(())
}

async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    reader.read_exact(buf).await.map_err(map_peer_error)?;
    Ok(())
}

fn map_peer_error(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::UnexpectedEof
        | ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted => Error::ConnectionClosed,
        _ => Error::Io(e),
    }
}

/// Incremental frame decoder
///
/// Accepts bytes in arbitrarily small chunks and yields complete samples
/// once enough data is buffered.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of bytes buffered but not yet decoded
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Decode the next complete frame, if one is buffered
    pub fn decode(&mut self) -> Result<Option<Sample>> {
        if self.buf.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
        if self.buf.len() < LENGTH_PREFIX_SIZE + len {
            self.buf.reserve(LENGTH_PREFIX_SIZE + len - self.buf.len());
            return Ok(None);
        }

        self.buf.advance(LENGTH_PREFIX_SIZE);
        let body = self.buf.split_to(len);
        decode_record(&body).map(Some)
    }

    /// Signal end of stream
    ///
    /// Fails with `ConnectionClosed` if a partial frame is still buffered.
    pub fn finish(&self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(Error::ConnectionClosed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hr_sample(ts: f64, bpm: u8) -> Sample {
        Sample::new(ts, vec![0x00, bpm])
    }

    #[test]
    fn test_length_prefix_is_big_endian() {
        let frame = encode(&hr_sample(1.0, 80)).unwrap();
        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - LENGTH_PREFIX_SIZE);
    }

    #[tokio::test]
    async fn test_read_frame_whole() {
        let sample = hr_sample(1_700_000_000.25, 72);
        let frame = encode(&sample).unwrap();

        let mut reader = &frame[..];
        let decoded = read_frame(&mut reader).await.unwrap();
        assert_eq!(decoded, sample);
    }

    #[tokio::test]
    async fn test_read_frame_in_small_chunks() {
        let sample = hr_sample(1_700_000_000.5, 143);
        let frame = encode(&sample).unwrap();

        // Length prefix split across two reads, record delivered byte by byte
        let mut builder = tokio_test::io::Builder::new();
        builder.read(&frame[..1]).read(&frame[1..4]);
        for byte in &frame[4..] {
            builder.read(std::slice::from_ref(byte));
        }
        let mut reader = builder.build();

        let decoded = read_frame(&mut reader).await.unwrap();
        assert_eq!(decoded, sample);
    }

    #[tokio::test]
    async fn test_truncated_record_is_connection_closed() {
        let frame = encode(&hr_sample(3.0, 90)).unwrap();
        let truncated = &frame[..frame.len() - 1];

        let mut reader = truncated;
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_truncated_prefix_is_connection_closed() {
        let mut reader: &[u8] = &[0x00, 0x00];
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_empty_stream_is_connection_closed() {
        let mut reader: &[u8] = &[];
        let result = read_frame(&mut reader).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_back_to_back_frames() {
        let first = hr_sample(1.0, 60);
        let second = hr_sample(2.0, 61);
        let mut wire = Vec::new();
        wire.extend_from_slice(&encode(&first).unwrap());
        wire.extend_from_slice(&encode(&second).unwrap());

        let mut reader = &wire[..];
        assert_eq!(read_frame(&mut reader).await.unwrap(), first);
        assert_eq!(read_frame(&mut reader).await.unwrap(), second);
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_garbage_record_is_codec_error() {
        let mut wire = vec![0, 0, 0, 2];
        wire.extend_from_slice(&[0xc1, 0xc1]); // 0xc1 is never used in MessagePack

        let mut reader = &wire[..];
        assert!(matches!(read_frame(&mut reader).await, Err(Error::Codec(_))));
    }

    #[tokio::test]
    async fn test_write_to_closed_peer() {
        let (mut local, remote) = tokio::io::duplex(64);
        drop(remote);

        let frame = encode(&hr_sample(1.0, 70)).unwrap();
        let result = write_frame(&mut local, &frame).await;
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }

    #[test]
    fn test_decoder_byte_by_byte() {
        let sample = hr_sample(42.0, 100);
        let frame = encode(&sample).unwrap();

        let mut decoder = FrameDecoder::new();
        for (i, byte) in frame.iter().enumerate() {
            assert!(decoder.decode().unwrap().is_none(), "early frame at byte {i}");
            decoder.extend(std::slice::from_ref(byte));
        }
        assert_eq!(decoder.decode().unwrap(), Some(sample));
        assert_eq!(decoder.buffered(), 0);
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_decoder_partial_frame_on_finish() {
        let frame = encode(&hr_sample(42.0, 100)).unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.extend(&frame[..LENGTH_PREFIX_SIZE + 1]);
        assert!(decoder.decode().unwrap().is_none());
        assert!(matches!(decoder.finish(), Err(Error::ConnectionClosed)));
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            ts in 0.0f64..4_000_000_000.0,
            payload in prop::collection::vec(any::<u8>(), 0..256),
            chunk in 1usize..16,
        ) {
            let sample = Sample::new(ts, payload);
            let frame = encode(&sample).unwrap();

            let mut decoder = FrameDecoder::new();
            let mut decoded = None;
            for piece in frame.chunks(chunk) {
                decoder.extend(piece);
                if let Some(s) = decoder.decode().unwrap() {
                    decoded = Some(s);
                }
            }
            prop_assert_eq!(decoded, Some(sample));
        }
    }
}
