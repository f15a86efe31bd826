//! Chunk sizing and encoding.
//!
//! Every chunk travels inside a single remote command, so its base64 form
//! plus the embedded path must fit the interpreter's command length limit.
//! Base64 turns each 3 raw bytes into 4 characters and pads the output to a
//! multiple of 4:
//!
//!   ceil(n / 3) * 4 <= limit - path_len

use crate::error::{CopyError, CopyResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest raw chunk whose encoded form fits beside a `path_len` path.
pub fn chunk_size(command_length_limit: usize, path_len: usize) -> usize {
    (command_length_limit.saturating_sub(path_len) / 4) * 3
}

/// Characters the base64 form of `raw_len` bytes occupies.
pub fn encoded_len(raw_len: usize) -> usize {
    raw_len.div_ceil(3) * 4
}

/// Chunk size for `path`, or an error when nothing fits beside it.
pub fn checked_chunk_size(command_length_limit: usize, path: &str) -> CopyResult<usize> {
    match chunk_size(command_length_limit, path.len()) {
        0 => Err(CopyError::invalid_config(format!(
            "Path '{}' leaves no room for data under the {} character command limit",
            path, command_length_limit
        ))),
        n => Ok(n),
    }
}

pub fn encode_chunk(raw: &[u8]) -> String {
    STANDARD.encode(raw)
}

/// Fill `buf` from `reader`, stopping early only at end-of-stream.
///
/// Returns the number of bytes read; 0 means the source is exhausted.
pub async fn read_chunk<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::COMMAND_LENGTH_LIMIT;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    #[test]
    fn test_chunk_size_default_limit() {
        // 8000 - 58 = 7942 -> 1985 groups of 4 -> 5955 bytes
        assert_eq!(chunk_size(COMMAND_LENGTH_LIMIT, 58), 5955);
    }

    #[test]
    fn test_encoded_chunk_fits_limit_for_all_inputs() {
        for limit in (4..2000).step_by(7) {
            for path_len in 0..limit {
                let size = chunk_size(limit, path_len);
                if size == 0 {
                    continue;
                }
                assert!(
                    encoded_len(size) + path_len <= limit,
                    "limit={} path_len={} size={}",
                    limit,
                    path_len,
                    size
                );
                for raw in [1, size / 2, size] {
                    assert!(encoded_len(raw) + path_len <= limit);
                }
            }
        }
    }

    #[test]
    fn test_encoded_len_matches_encoder() {
        for n in 0..64 {
            assert_eq!(encode_chunk(&vec![0xAB; n]).len(), encoded_len(n));
        }
    }

    #[test]
    fn test_checked_chunk_size_rejects_long_path() {
        let path = "x".repeat(10);
        assert!(checked_chunk_size(12, &path).is_err());
        assert_eq!(checked_chunk_size(14, &path).unwrap(), 3);
    }

    #[test]
    fn test_encode_is_padded_standard_base64() {
        assert_eq!(encode_chunk(b"a"), "YQ==");
        assert_eq!(encode_chunk(b"\xfb\xff"), "+/8=");
        assert_eq!(encode_chunk(b""), "");
    }

    /// Hands out at most `step` bytes per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let end = (self.pos + self.step)
                .min(self.data.len())
                .min(self.pos + buf.remaining());
            let start = self.pos;
            buf.put_slice(&self.data[start..end]);
            self.pos = end;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_read_chunk_fills_across_short_reads() {
        let mut src = Trickle {
            data: (0..10u8).collect(),
            pos: 0,
            step: 3,
        };
        let mut buf = [0u8; 4];
        assert_eq!(read_chunk(&mut src, &mut buf).await.unwrap(), 4);
        assert_eq!(buf, [0, 1, 2, 3]);
        assert_eq!(read_chunk(&mut src, &mut buf).await.unwrap(), 4);
        assert_eq!(read_chunk(&mut src, &mut buf).await.unwrap(), 2);
        assert_eq!(read_chunk(&mut src, &mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_chunk_empty_source() {
        let mut src = Cursor::new(Vec::<u8>::new());
        let mut buf = [0u8; 8];
        assert_eq!(read_chunk(&mut src, &mut buf).await.unwrap(), 0);
    }
}
