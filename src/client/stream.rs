//! Watch and log streaming over a chunked response body.
use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use http_body_util::BodyExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::{
    codec::{FramedRead, LinesCodec, LinesCodecError},
    io::StreamReader,
    sync::CancellationToken,
};

use crate::{error::ErrorResponse, Error, Result};

/// Kind of watch notification handed to wait predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventType {
    /// Resource was added
    Added,
    /// Resource was modified
    Modified,
    /// Resource was deleted
    Deleted,
}

/// A single multiplexed item from a watch or log stream.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Resource was added
    Added(Value),
    /// Resource was modified
    Modified(Value),
    /// Resource was deleted
    Deleted(Value),
    /// Any other tag on the wire, lowercased, with its payload
    Other {
        /// Lowercased event tag, e.g. `bookmark`
        kind: String,
        /// The event payload
        object: Value,
    },
    /// One line of a log stream, without its delimiter
    Line(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Watch,
    Log,
}

/// A raw `{"type": ..., "object": ...}` line from a watch endpoint.
#[derive(Deserialize)]
struct TaggedEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    object: Value,
}

impl From<TaggedEvent> for StreamEvent {
    fn from(event: TaggedEvent) -> Self {
        let kind = event.kind.to_ascii_lowercase();
        match kind.as_str() {
            "added" => StreamEvent::Added(event.object),
            "modified" => StreamEvent::Modified(event.object),
            "deleted" => StreamEvent::Deleted(event.object),
            _ => StreamEvent::Other {
                kind,
                object: event.object,
            },
        }
    }
}

/// Derive the stream mode from `url` and merge the matching `follow=1` or
/// `watch=1` pair into the query, keeping caller-supplied parameters.
pub(crate) fn watch_uri(url: &str) -> Result<(http::Uri, Mode)> {
    let uri = url.parse::<http::Uri>().map_err(Error::InvalidUri)?;
    let mode = if uri.path().ends_with("/log") {
        Mode::Log
    } else {
        Mode::Watch
    };
    let key = match mode {
        Mode::Log => "follow",
        Mode::Watch => "watch",
    };

    let mut pairs: Vec<(String, String)> = uri
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    if !pairs.iter().any(|(k, _)| k == key) {
        pairs.push((key.to_owned(), "1".to_owned()));
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(&pairs)
        .finish();

    let mut builder = http::Uri::builder();
    if let Some(scheme) = uri.scheme() {
        builder = builder.scheme(scheme.clone());
    }
    if let Some(authority) = uri.authority() {
        builder = builder.authority(authority.clone());
    }
    let uri = builder
        .path_and_query(format!("{}?{}", uri.path(), query))
        .build()
        .map_err(Error::HttpError)?;
    Ok((uri, mode))
}

/// Live event stream over one watch or log connection.
///
/// The watcher exclusively owns the underlying connection for its lifetime:
/// nothing else may read from or close it. Dropping the watcher or calling
/// [`Watcher::unwatch`] tears the connection down.
#[derive(Debug)]
pub struct Watcher {
    events: mpsc::UnboundedReceiver<Result<StreamEvent>>,
    cancel: CancellationToken,
}

impl Watcher {
    pub(crate) fn new<B>(body: B, mode: Mode) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + Unpin + 'static,
        B::Error: Into<tower::BoxError>,
    {
        let (tx, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(pump(body, mode, tx, cancel.clone()));
        Self { events, cancel }
    }

    /// Receive the next event, in wire arrival order.
    ///
    /// Returns `None` once the stream has ended or been torn down.
    pub async fn recv(&mut self) -> Option<Result<StreamEvent>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    /// Tear the stream down: event delivery stops immediately and the
    /// underlying connection is dropped.
    ///
    /// Idempotent; safe to call any number of times, from any task.
    pub fn unwatch(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Stream for Watcher {
    type Item = Result<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        this.events.poll_recv(cx)
    }
}

/// Read the body line by line until cancellation or end of stream.
///
/// Holds the only handle on the response body, so breaking out of the loop
/// drops the connection.
async fn pump<B>(
    body: B,
    mode: Mode,
    tx: mpsc::UnboundedSender<Result<StreamEvent>>,
    cancel: CancellationToken,
) where
    B: http_body::Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: Into<tower::BoxError>,
{
    let reader = StreamReader::new(
        body.into_data_stream()
            .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e.into()))),
    );
    // A partial line with no trailing delimiter is flushed at end of stream.
    let mut frames = FramedRead::new(reader, LinesCodec::new());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            frame = frames.next() => match frame {
                None => break,
                Some(Ok(line)) => {
                    if tx.send(line_event(mode, line)).is_err() {
                        break;
                    }
                }
                Some(Err(LinesCodecError::Io(e))) => {
                    tracing::warn!("watch stream io error: {e}");
                    let _ = tx.send(Err(Error::ReadEvents(e)));
                    break;
                }
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    let _ = tx.send(Err(Error::LinesCodecMaxLineLengthExceeded));
                    break;
                }
            }
        }
    }
}

fn line_event(mode: Mode, line: String) -> Result<StreamEvent> {
    match mode {
        Mode::Log => Ok(StreamEvent::Line(line)),
        Mode::Watch => match serde_json::from_str::<TaggedEvent>(&line) {
            Ok(event) => Ok(event.into()),
            Err(e) => {
                // Got a general error response
                if let Ok(e_resp) = serde_json::from_str::<ErrorResponse>(&line) {
                    return Err(Error::Api(e_resp));
                }
                tracing::warn!("failed to parse watch line: {e}");
                Err(Error::SerdeError(e))
            }
        },
    }
}
