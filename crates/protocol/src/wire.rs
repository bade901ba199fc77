//! Wire-Format fuer TCP-Verbindungen
//!
//! Frame-basiertes Protokoll: Laenge (u32 big-endian) + JSON-kodierter [`Frame`].
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE)                   | JSON      |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge zaehlt nur die Payload-Bytes. Die maximale Frame-Groesse ist
//! konfigurierbar (Standard: 1 MB).

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::Frame;

/// Standard-maximale Frame-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

fn zu_gross(laenge: usize, maximum: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Frame zu gross: {laenge} Bytes (Maximum: {maximum} Bytes)"),
    )
}

fn serialisieren(frame: &Frame, maximum: usize) -> io::Result<Vec<u8>> {
    let json = serde_json::to_vec(frame).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("JSON-Serialisierung fehlgeschlagen: {e}"),
        )
    })?;
    if json.len() > maximum {
        return Err(zu_gross(json.len(), maximum));
    }
    Ok(json)
}

fn deserialisieren(payload: &[u8]) -> io::Result<Frame> {
    serde_json::from_slice(payload).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("JSON-Deserialisierung fehlgeschlagen: {e}"),
        )
    })
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer `Framed<TcpStream, FrameCodec>`
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen ohne den Buffer zu veraendern
        let laenge = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if laenge > self.max_frame_size {
            return Err(zu_gross(laenge, self.max_frame_size));
        }

        let gesamt = LENGTH_FIELD_SIZE + laenge;
        if src.len() < gesamt {
            src.reserve(gesamt - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(laenge);
        deserialisieren(&payload).map(Some)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serialisieren(&item, self.max_frame_size)?;
        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn beispiel(request_id: u32) -> Frame {
        Frame::neu(request_id, "join_channel", json!({ "channel_id": "abc" }))
    }

    #[test]
    fn encode_schreibt_laengenfeld() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(beispiel(42), &mut buf).unwrap();

        let laenge = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + laenge);

        let decoded = codec.decode(&mut buf).unwrap().expect("Frame erwartet");
        assert_eq!(decoded, beispiel(42));
        assert!(buf.is_empty());
    }

    #[test]
    fn unvollstaendiger_frame_wartet() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(beispiel(1), &mut buf).unwrap();

        let haelfte = buf.len() / 2;
        let mut teil = buf.split_to(haelfte);
        assert!(codec.decode(&mut teil).unwrap().is_none());
    }

    #[test]
    fn zu_wenig_bytes_fuer_laengenfeld() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x00, 0x00][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn zu_grosser_frame_wird_abgelehnt() {
        let mut codec = FrameCodec::with_max_size(100);
        let mut buf = BytesMut::new();
        buf.put_u32(200);
        buf.put_slice(&[b'x'; 200]);
        assert!(codec.decode(&mut buf).is_err());

        let mut klein = FrameCodec::with_max_size(10);
        let mut ziel = BytesMut::new();
        assert!(klein.encode(beispiel(1), &mut ziel).is_err());
    }

    #[test]
    fn ungueltiges_json() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u32(3);
        buf.put_slice(b"{{{");
        assert_eq!(
            codec.decode(&mut buf).unwrap_err().kind(),
            io::ErrorKind::InvalidData
        );
    }

    #[test]
    fn mehrere_frames_in_reihenfolge() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        for i in 0..3u32 {
            codec.encode(beispiel(i), &mut buf).unwrap();
        }
        for i in 0..3u32 {
            let f = codec.decode(&mut buf).unwrap().expect("Frame erwartet");
            assert_eq!(f.request_id, i);
        }
        assert!(buf.is_empty());
    }
}
