//! Codec boundary.
//!
//! Query ASTs and value graphs are plain serde trees, so any tree-shaped
//! codec carries them. Two are provided: `bincode` for compact binary
//! payloads and `serde_json` for readable ones. Payloads are framed with a
//! big-endian `u32` length prefix.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on a single frame
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

const LENGTH_PREFIX: usize = 4;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Binary codec error: {0}")]
    Binary(#[from] bincode::Error),

    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame error: {0}")]
    Frame(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Codec {
    #[default]
    Binary,
    Json,
}

impl Codec {
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, WireError> {
        Ok(match self {
            Codec::Binary => bincode::serialize(value)?,
            Codec::Json => serde_json::to_vec(value)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, WireError> {
        Ok(match self {
            Codec::Binary => bincode::deserialize(data)?,
            Codec::Json => serde_json::from_slice(data)?,
        })
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "bincode" => Ok(Codec::Binary),
            "json" => Ok(Codec::Json),
            other => Err(format!("unknown codec '{}'", other)),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Binary => write!(f, "binary"),
            Codec::Json => write!(f, "json"),
        }
    }
}

/// Prefixes `payload` with its length
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, WireError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(WireError::Frame(format!(
            "payload of {} bytes exceeds the frame limit",
            payload.len()
        )));
    }
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Splits one complete frame off the front of `buf`.
///
/// Returns `Ok(None)` while the frame is still incomplete, leaving `buf`
/// untouched.
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Bytes>, WireError> {
    if buf.remaining() < LENGTH_PREFIX {
        return Ok(None);
    }

    let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len > MAX_FRAME_LEN {
        return Err(WireError::Frame(format!(
            "frame of {} bytes exceeds the frame limit",
            len
        )));
    }
    if buf.len() < LENGTH_PREFIX + len {
        return Ok(None);
    }

    buf.advance(LENGTH_PREFIX);
    Ok(Some(buf.split_to(len).freeze()))
}

/// Writes `value` as one framed message
pub fn write_message<W: Write, T: Serialize>(
    writer: &mut W,
    codec: Codec,
    value: &T,
) -> Result<(), WireError> {
    let frame = encode_frame(&codec.encode(value)?)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Reads one framed message written by [`write_message`]
pub fn read_message<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    codec: Codec,
) -> Result<T, WireError> {
    let mut prefix = [0u8; LENGTH_PREFIX];
    reader.read_exact(&mut prefix)?;
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(WireError::Frame(format!(
            "frame of {} bytes exceeds the frame limit",
            len
        )));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    codec.decode(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DynamicObject, GraphValue};

    #[test]
    fn test_codec_from_str() {
        assert_eq!("json".parse::<Codec>().unwrap(), Codec::Json);
        assert_eq!("Binary".parse::<Codec>().unwrap(), Codec::Binary);
        assert!("xml".parse::<Codec>().is_err());
    }

    #[test]
    fn test_graph_value_through_both_codecs() {
        let value = GraphValue::List(vec![
            GraphValue::Object(
                DynamicObject::new(None)
                    .with("Name", GraphValue::String("E".to_string()))
                    .with("Price", GraphValue::Int(150)),
            ),
            GraphValue::Null,
        ]);
        for codec in [Codec::Binary, Codec::Json] {
            let bytes = codec.encode(&value).unwrap();
            let decoded: GraphValue = codec.decode(&bytes).unwrap();
            assert_eq!(decoded, value, "codec {}", codec);
        }
    }

    #[test]
    fn test_partial_frame_waits() {
        let frame = encode_frame(b"hello").unwrap();
        let mut buf = BytesMut::from(&frame[..6]);
        assert!(decode_frame(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 6);

        buf.extend_from_slice(&frame[6..]);
        buf.extend_from_slice(&encode_frame(b"!").unwrap());
        assert_eq!(decode_frame(&mut buf).unwrap().unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(decode_frame(&mut buf).unwrap().unwrap(), Bytes::from_static(b"!"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32(u32::MAX);
        assert!(matches!(decode_frame(&mut buf), Err(WireError::Frame(_))));
    }

    #[test]
    fn test_message_over_io() {
        let mut sink = Vec::new();
        write_message(&mut sink, Codec::Json, &GraphValue::Int(7)).unwrap();
        let decoded: GraphValue = read_message(&mut sink.as_slice(), Codec::Json).unwrap();
        assert_eq!(decoded, GraphValue::Int(7));
    }
}
