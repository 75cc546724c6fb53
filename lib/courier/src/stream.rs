//! Line-by-line response streaming.

use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{Error, LineSplitter, Result, StreamingBody, body_error};

/// Non-empty lines of a response body, delivered as they arrive.
///
/// Receives from a bounded channel filled by a background task. The stream
/// ends when the body ends; a failure after streaming started (body error,
/// overlong line, stream deadline) arrives as a final `Err` item.
///
/// Dropping the stream stops the background task.
///
/// # Example
///
/// ```ignore
/// use futures_util::StreamExt;
///
/// let mut lines = courier.send_stream(spec).await?;
/// while let Some(line) = lines.next().await {
///     println!("{}", String::from_utf8_lossy(&line?));
/// }
/// ```
#[derive(Debug)]
pub struct LineStream {
    status: u16,
    headers: HashMap<String, String>,
    lines: mpsc::Receiver<Result<Bytes>>,
}

impl LineStream {
    pub(crate) fn new(
        status: u16,
        headers: HashMap<String, String>,
        lines: mpsc::Receiver<Result<Bytes>>,
    ) -> Self {
        Self {
            status,
            headers,
            lines,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Receive the next line; `None` once the stream is closed.
    pub async fn next_line(&mut self) -> Option<Result<Bytes>> {
        self.lines.recv().await
    }

    /// Consume into the channel receiver.
    #[must_use]
    pub fn into_receiver(self) -> mpsc::Receiver<Result<Bytes>> {
        self.lines
    }
}

impl Stream for LineStream {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().lines.poll_recv(cx)
    }
}

/// Why the background task stopped sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Finished,
    Failed,
    DeadlineElapsed,
    Cancelled,
    ReceiverDropped,
}

/// Background task that splits a body into lines and sends them.
pub(crate) struct LinePump {
    status: u16,
    splitter: LineSplitter,
    sender: mpsc::Sender<Result<Bytes>>,
    cancel: CancellationToken,
    deadline: Pin<Box<Sleep>>,
}

impl LinePump {
    pub(crate) fn new(
        status: u16,
        max_line_length: usize,
        sender: mpsc::Sender<Result<Bytes>>,
        cancel: CancellationToken,
        stream_timeout: Duration,
    ) -> Self {
        Self {
            status,
            splitter: LineSplitter::new(status, max_line_length),
            sender,
            cancel,
            deadline: Box::pin(tokio::time::sleep(stream_timeout)),
        }
    }

    /// Pump the whole body; the channel closes when this returns.
    pub(crate) async fn run(mut self, body: StreamingBody) {
        let stop = self.pump(body).await;
        debug!(status = self.status, reason = ?stop, "line stream closed");
    }

    async fn pump(&mut self, mut body: StreamingBody) -> Stop {
        loop {
            let chunk = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Stop::Cancelled,
                () = self.sender.closed() => return Stop::ReceiverDropped,
                () = &mut self.deadline => return self.expire(),
                chunk = body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => self.splitter.push(&bytes),
                Some(Err(err)) => {
                    let err = body_error(self.status, err);
                    return self.fail(err, Stop::Failed).await;
                }
                None => {
                    return match self.splitter.finish() {
                        Some(Ok(line)) => match self.send(Ok(line)).await {
                            Ok(()) => Stop::Finished,
                            Err(stop) => stop,
                        },
                        Some(Err(err)) => self.fail(err, Stop::Failed).await,
                        None => Stop::Finished,
                    };
                }
            }

            while let Some(line) = self.splitter.next_line() {
                match line {
                    Ok(line) => {
                        if let Err(stop) = self.send(Ok(line)).await {
                            return stop;
                        }
                    }
                    Err(err) => return self.fail(err, Stop::Failed).await,
                }
            }
        }
    }

    /// Send the terminal error, then stop with `stop`.
    async fn fail(&mut self, err: Error, stop: Stop) -> Stop {
        match self.send(Err(err)).await {
            Ok(()) => stop,
            Err(other) => other,
        }
    }

    async fn send(&mut self, item: Result<Bytes>) -> std::result::Result<(), Stop> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Stop::Cancelled),
            () = &mut self.deadline => Err(self.expire()),
            sent = self.sender.send(item) => sent.map_err(|_| Stop::ReceiverDropped),
        }
    }

    /// Signal the deadline without waiting: if the caller stopped reading and
    /// the channel is full, the stream just closes.
    fn expire(&self) -> Stop {
        if self.sender.try_send(Err(Error::Timeout)).is_err() {
            debug!(status = self.status, "line channel full at deadline, timeout not delivered");
        }
        Stop::DeadlineElapsed
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn body(chunks: Vec<Result<Bytes>>) -> StreamingBody {
        Box::pin(futures_util::stream::iter(chunks))
    }

    fn spawn_pump(chunks: Vec<Result<Bytes>>, max_line_length: usize) -> LineStream {
        let (sender, receiver) = mpsc::channel(4);
        let pump = LinePump::new(
            200,
            max_line_length,
            sender,
            CancellationToken::new(),
            Duration::from_secs(5),
        );
        tokio::spawn(pump.run(body(chunks)));
        LineStream::new(200, HashMap::new(), receiver)
    }

    #[tokio::test]
    async fn lines_then_close() {
        let mut stream = spawn_pump(vec![Ok(Bytes::from("line1\nline2\n\nline3"))], 64);

        let mut lines = Vec::new();
        while let Some(line) = stream.next_line().await {
            lines.push(line.expect("line"));
        }
        check!(lines == vec!["line1", "line2", "line3"]);
    }

    #[tokio::test]
    async fn body_error_is_terminal_item() {
        let mut stream = spawn_pump(
            vec![Ok(Bytes::from("ok\n")), Err(Error::connection("reset"))],
            64,
        );

        let_assert!(Some(Ok(first)) = stream.next().await);
        check!(first == "ok");
        let_assert!(Some(Err(Error::ReadBody { status: 200, .. })) = stream.next().await);
        check!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn long_line_is_terminal_item() {
        let mut stream = spawn_pump(vec![Ok(Bytes::from("abc\nabcdefgh"))], 4);
        let_assert!(Some(Ok(first)) = stream.next().await);
        check!(first == "abc");
        let_assert!(Some(Err(Error::LineTooLong { limit: 4, .. })) = stream.next().await);
        check!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn cancellation_closes_without_error() {
        let (sender, receiver) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let pump = LinePump::new(200, 64, sender, cancel.clone(), Duration::from_secs(5));
        let pending: StreamingBody = Box::pin(futures_util::stream::pending());
        let task = tokio::spawn(pump.run(pending));

        cancel.cancel();
        task.await.expect("pump task");
        let mut stream = LineStream::new(200, HashMap::new(), receiver);
        check!(stream.next_line().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_stops_pump_when_caller_stops_reading() {
        let (sender, receiver) = mpsc::channel(1);
        let pump = LinePump::new(
            200,
            64,
            sender,
            CancellationToken::new(),
            Duration::from_secs(30),
        );
        let body: StreamingBody = Box::pin(
            futures_util::stream::iter(vec![Ok(Bytes::from("a\nb\n"))])
                .chain(futures_util::stream::pending()),
        );
        let task = tokio::spawn(pump.run(body));

        let finished = tokio::time::timeout(Duration::from_secs(3600), task).await;
        check!(finished.is_ok());

        let mut stream = LineStream::new(200, HashMap::new(), receiver);
        let_assert!(Some(Ok(first)) = stream.next_line().await);
        check!(first == "a");
        check!(stream.next_line().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_terminal_timeout() {
        let (sender, receiver) = mpsc::channel(4);
        let pump = LinePump::new(
            200,
            64,
            sender,
            CancellationToken::new(),
            Duration::from_secs(30),
        );
        let pending: StreamingBody = Box::pin(futures_util::stream::pending());
        tokio::spawn(pump.run(pending));

        let mut stream = LineStream::new(200, HashMap::new(), receiver);
        let_assert!(Some(Err(err)) = stream.next().await);
        check!(err.is_timeout());
        check!(stream.next().await.is_none());
    }
}
