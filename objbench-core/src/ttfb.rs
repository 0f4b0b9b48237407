use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Instant;

/// Records the time from `started` to the first non-empty read.
#[derive(Debug)]
pub struct TtfbReader<R> {
    inner: R,
    started: Instant,
    ttfb: Option<Duration>,
}

impl<R> TtfbReader<R> {
    pub fn new(inner: R, started: Instant) -> Self {
        Self {
            inner,
            started,
            ttfb: None,
        }
    }

    /// Zero when no byte was ever read.
    pub fn ttfb(&self) -> Duration {
        self.ttfb.unwrap_or_default()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TtfbReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        if this.ttfb.is_none() && buf.filled().len() > before {
            this.ttfb = Some(this.started.elapsed());
        }
        Poll::Ready(Ok(()))
    }
}
