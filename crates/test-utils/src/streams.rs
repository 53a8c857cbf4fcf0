use std::io::{self, Cursor};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWriteExt, DuplexStream, ReadBuf};

use payload_launcher::process::OutputStream;

/// A stream that yields `bytes` and then ends.
pub fn bytes_stream(bytes: impl Into<Vec<u8>>) -> OutputStream {
    Box::new(Cursor::new(bytes.into()))
}

/// A stream fed by a background task writing each chunk separately, then
/// closing. Must be called inside a Tokio runtime.
pub fn chunked_stream<I, C>(chunks: I) -> OutputStream
where
    I: IntoIterator<Item = C>,
    C: Into<Vec<u8>>,
{
    let chunks: Vec<Vec<u8>> = chunks.into_iter().map(Into::into).collect();
    let (mut writer, reader) = tokio::io::duplex(64);
    tokio::spawn(async move {
        for chunk in chunks {
            if writer.write_all(&chunk).await.is_err() {
                return;
            }
            let _ = writer.flush().await;
            tokio::task::yield_now().await;
        }
    });
    Box::new(reader)
}

/// A stream that stays open until the returned writer is dropped.
pub fn open_stream() -> (OutputStream, DuplexStream) {
    let (writer, reader) = tokio::io::duplex(1024);
    (Box::new(reader), writer)
}

/// A stream that yields `prefix` and then fails with `kind`.
pub fn failing_stream(prefix: impl Into<Vec<u8>>, kind: io::ErrorKind) -> OutputStream {
    Box::new(FailingReader {
        data: Cursor::new(prefix.into()),
        kind,
    })
}

struct FailingReader {
    data: Cursor<Vec<u8>>,
    kind: io::ErrorKind,
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let remaining = self.data.get_ref().len() as u64 - self.data.position();
        if remaining > 0 {
            return Pin::new(&mut self.data).poll_read(cx, buf);
        }
        Poll::Ready(Err(io::Error::new(self.kind, "injected read failure")))
    }
}
