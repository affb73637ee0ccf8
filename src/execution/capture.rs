//! Stream capture.
//!
//! A captured stream is read as a sequence of byte chunks, folded into one
//! contiguous buffer at end of stream, and then reduced to its final value
//! according to the requested [`Capture`] mode.

use std::io;

use futures_util::stream::{self, Stream, TryStreamExt};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use super::result::Captured;
use crate::error::{Result, ShellSpawnError, StreamName};
use crate::options::{Capture, Normalize};

/// Default buffer size for reading child output.
const READ_BUFFER_SIZE: usize = 8192;

/// Turn a reader into a stream of chunks, ending at EOF or after the first
/// error.
pub fn chunks<R>(reader: R) -> impl Stream<Item = io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    stream::unfold(Some(reader), |state| async move {
        let mut reader = state?;
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(buf), Some(reader)))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}

/// Collect every chunk in order and concatenate them.
pub async fn accumulate<S>(chunks: S) -> io::Result<Vec<u8>>
where
    S: Stream<Item = io::Result<Vec<u8>>>,
{
    let parts: Vec<Vec<u8>> = chunks.try_collect().await?;
    Ok(parts.concat())
}

/// Rewrite `\r\n` and lone `\r` line endings to `\n`.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Reduce accumulated bytes to the final captured value.
///
/// Returns `None` for [`Capture::Off`]: the bytes are discarded.
pub fn reduce(bytes: Vec<u8>, capture: &Capture, normalize: &Normalize) -> Option<Captured> {
    let value = match capture {
        Capture::Off => return None,
        Capture::Transform(transform) => Captured::Custom(transform(bytes)),
        Capture::Bytes => Captured::Bytes(bytes),
        Capture::Text => {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            let text = match normalize {
                Normalize::Off => text,
                Normalize::Newlines => normalize_newlines(&text),
                Normalize::Custom(f) => f(text),
            };
            Captured::Text(text)
        }
    };
    Some(value)
}

/// Capture a chunk stream into its final value.
pub async fn capture_chunks<S>(
    name: StreamName,
    chunks: S,
    capture: Capture,
    normalize: Normalize,
) -> Result<Option<Captured>>
where
    S: Stream<Item = io::Result<Vec<u8>>>,
{
    let bytes = accumulate(chunks)
        .await
        .map_err(|source| ShellSpawnError::Stream {
            stream: name,
            source,
        })?;
    trace!("{}: captured {} bytes", name, bytes.len());
    Ok(reduce(bytes, &capture, &normalize))
}

/// Capture everything a reader produces until EOF.
pub async fn capture<R>(
    name: StreamName,
    reader: R,
    capture: Capture,
    normalize: Normalize,
) -> Result<Option<Captured>>
where
    R: AsyncRead + Unpin,
{
    capture_chunks(name, chunks(reader), capture, normalize).await
}
