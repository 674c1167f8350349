//! Byte-level line splitting for subprocess output (non-UTF8-safe).
//!
//! ffmpeg and the C libraries underneath it may emit invalid UTF-8, and
//! progress lines are terminated with a bare `\r` so the terminal overwrites
//! them in place. `BufReader::lines()` would both stop on bad bytes and merge
//! every progress update into one endless line, so bytes are split on either
//! terminator here and decoded lossily.

use async_stream::stream;
use futures_util::Stream;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

const READ_CHUNK: usize = 4096;

/// Lines longer than this are flushed in pieces.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Stream of non-empty, trimmed output lines. Ends at EOF or on a read error.
pub fn output_lines<R>(mut reader: R) -> impl Stream<Item = String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream! {
        let mut chunk = vec![0u8; READ_CHUNK];
        let mut pending: Vec<u8> = Vec::with_capacity(1024);

        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    for &byte in &chunk[..n] {
                        if byte == b'\n' || byte == b'\r' {
                            if let Some(line) = take_line(&mut pending) {
                                yield line;
                            }
                        } else {
                            pending.push(byte);
                            if pending.len() >= MAX_LINE_BYTES {
                                if let Some(line) = take_line(&mut pending) {
                                    yield line;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    debug!(error = %e, "output reader exiting due to read error");
                    break;
                }
            }
        }

        if let Some(line) = take_line(&mut pending) {
            yield line;
        }
    }
}

fn take_line(pending: &mut Vec<u8>) -> Option<String> {
    let line = String::from_utf8_lossy(pending).trim().to_string();
    pending.clear();
    (!line.is_empty()).then_some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    async fn collect(bytes: &'static [u8]) -> Vec<String> {
        let (mut writer, reader) = tokio::io::duplex(256);
        tokio::spawn(async move {
            writer.write_all(bytes).await.unwrap();
        });
        output_lines(reader).collect().await
    }

    #[tokio::test]
    async fn test_splits_on_carriage_return_and_newline() {
        let lines = collect(b"Input #0, rtsp\nsize=  1kB\rsize=  2kB\r\nStream mapping:\n").await;
        assert_eq!(
            lines,
            vec!["Input #0, rtsp", "size=  1kB", "size=  2kB", "Stream mapping:"]
        );
    }

    #[tokio::test]
    async fn test_skips_blank_lines_and_flushes_tail() {
        let lines = collect(b"\n\n   \nlast line without newline").await;
        assert_eq!(lines, vec!["last line without newline"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decoded_lossily() {
        let lines = collect(b"bad \xff byte\nnext\n").await;
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("bad "));
        assert!(lines[0].ends_with(" byte"));
        assert_eq!(lines[1], "next");
    }
}
