// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tee of one input byte stream to two consumers.
//!
//! Used to run speech-to-text and the blob upload concurrently over the
//! same user audio: both readers observe the identical byte sequence, and
//! the slower consumer may lag behind bounded by the pipe buffer. A side
//! whose reader is dropped stops receiving; the other side still drains to
//! EOF.

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use crate::traits::provider::ByteStream;

/// Default pipe buffer: enough to decouple recognition from upload jitter
/// without holding whole clips in memory.
pub const DEFAULT_TEE_BUFFER: usize = 64 * 1024;

/// Splits `input` into two readers over bounded buffers.
///
/// The copy task reads `input` to EOF; when it finishes (or `input`
/// errors), both writers are dropped and the readers see EOF.
pub fn tee(input: ByteStream, buffer: usize) -> (ByteStream, ByteStream) {
    let (writer_a, reader_a) = tokio::io::duplex(buffer);
    let (writer_b, reader_b) = tokio::io::duplex(buffer);

    tokio::spawn(pump(input, writer_a, writer_b));

    (Box::pin(reader_a), Box::pin(reader_b))
}

async fn pump(mut input: ByteStream, writer_a: DuplexStream, writer_b: DuplexStream) {
    let mut sides = [Some(writer_a), Some(writer_b)];
    let mut buf = [0u8; 8192];

    loop {
        let n = match input.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "tee input stream errored");
                break;
            }
        };

        for side in sides.iter_mut() {
            if let Some(writer) = side {
                // A closed reader surfaces as a write error; that side is
                // done but the other keeps draining.
                if writer.write_all(&buf[..n]).await.is_err() {
                    *side = None;
                }
            }
        }

        if sides.iter().all(Option::is_none) {
            break;
        }
    }

    for side in sides.iter_mut() {
        if let Some(writer) = side.as_mut() {
            let _ = writer.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn input(bytes: &[u8]) -> ByteStream {
        Box::pin(Cursor::new(bytes.to_vec()))
    }

    async fn read_all(mut r: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        r.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn both_sides_observe_the_full_stream() {
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let (a, b) = tee(input(&payload), DEFAULT_TEE_BUFFER);
        let (got_a, got_b) = tokio::join!(read_all(a), read_all(b));
        assert_eq!(got_a, payload);
        assert_eq!(got_b, payload);
    }

    #[tokio::test]
    async fn survives_one_reader_dropping() {
        let payload: Vec<u8> = vec![42u8; 300_000];
        let (a, b) = tee(input(&payload), 8 * 1024);
        drop(b);
        let got = read_all(a).await;
        assert_eq!(got.len(), payload.len());
    }

    #[tokio::test]
    async fn slow_consumer_still_drains_to_eof() {
        let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 13) as u8).collect();
        let (a, mut b) = tee(input(&payload), 4 * 1024);

        let fast = tokio::spawn(read_all(a));

        // Slow side reads in tiny sips with yields in between.
        let mut slow_out = Vec::new();
        let mut chunk = [0u8; 512];
        loop {
            match b.read(&mut chunk).await.unwrap() {
                0 => break,
                n => {
                    slow_out.extend_from_slice(&chunk[..n]);
                    tokio::task::yield_now().await;
                }
            }
        }

        assert_eq!(fast.await.unwrap(), payload);
        assert_eq!(slow_out, payload);
    }

    #[tokio::test]
    async fn empty_input_yields_immediate_eof() {
        let (a, b) = tee(input(&[]), DEFAULT_TEE_BUFFER);
        assert!(read_all(a).await.is_empty());
        assert!(read_all(b).await.is_empty());
    }
}
