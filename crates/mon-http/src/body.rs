//! The response body type handed to hyper.
//!
//! Small bodies arrive from the dispatcher fully buffered; file-backed
//! responses stream from disk in fixed-size frames so a large download never
//! has to sit in memory whole.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use http_body_util::Full;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

/// Bytes read from disk per streamed frame.
const FILE_CHUNK: usize = 64 * 1024;

/// Response body for dispatched requests.
#[derive(Debug, Default)]
pub enum MonResponseBody {
    /// A fully buffered body.
    Buffered(Full<Bytes>),
    /// A file streamed from disk frame by frame.
    File {
        /// The open handle, advanced as frames are read.
        file: File,
        /// Bytes left to stream, fixed by the size taken at open.
        remaining: u64,
    },
    /// An empty body.
    #[default]
    Empty,
}

impl MonResponseBody {
    /// Create a body from raw bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Open a file for streaming.
    ///
    /// The length is taken up front so the response carries an exact
    /// `Content-Length`; the stream ends after that many bytes even if the
    /// file grows underneath it.
    pub async fn from_file(path: &Path) -> io::Result<Self> {
        let file = File::open(path).await?;
        let remaining = file.metadata().await?.len();
        Ok(Self::File { file, remaining })
    }
}

impl http_body::Body for MonResponseBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::File { file, remaining } => {
                if *remaining == 0 {
                    return Poll::Ready(None);
                }
                let want = usize::try_from(*remaining).map_or(FILE_CHUNK, |r| r.min(FILE_CHUNK));
                let mut buf = BytesMut::zeroed(want);
                let mut read_buf = ReadBuf::new(&mut buf);
                match Pin::new(file).poll_read(cx, &mut read_buf) {
                    Poll::Pending => Poll::Pending,
                    Poll::Ready(Err(err)) => Poll::Ready(Some(Err(err))),
                    Poll::Ready(Ok(())) => {
                        let filled = read_buf.filled().len();
                        if filled == 0 {
                            // The file was truncated mid-stream.
                            *remaining = 0;
                            return Poll::Ready(None);
                        }
                        *remaining = remaining.saturating_sub(filled as u64);
                        buf.truncate(filled);
                        Poll::Ready(Some(Ok(http_body::Frame::data(buf.freeze()))))
                    }
                }
            }
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::File { remaining, .. } => *remaining == 0,
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::File { remaining, .. } => http_body::SizeHint::with_exact(*remaining),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
