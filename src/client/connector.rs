//! Stream connectors.
//!
//! The transport manager opens its connection through a `LiveConnector`, so
//! the same state machine runs against a real SSE endpoint, or against an
//! in-process channel in tests and embedded setups.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::sync::{SyncError, SyncResult};

/// Inbound raw messages, one per live event
pub type MessageStream = BoxStream<'static, String>;

/// Opens one streaming connection per call.
///
/// The returned stream ends when the connection drops; the transport
/// manager treats stream end and connect failure the same way and schedules
/// a reconnect.
pub trait LiveConnector: Send + Sync {
    fn connect(&self) -> BoxFuture<'static, SyncResult<MessageStream>>;
}

/// Connector for a real `GET /sse` endpoint.
pub struct HttpSseConnector {
    url: String,
    client: reqwest::Client,
}

impl HttpSseConnector {
    /// Create a connector for the given SSE endpoint URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl LiveConnector for HttpSseConnector {
    fn connect(&self) -> BoxFuture<'static, SyncResult<MessageStream>> {
        let client = self.client.clone();
        let url = self.url.clone();

        Box::pin(async move {
            let response = client
                .get(&url)
                .header("accept", "text/event-stream")
                .send()
                .await
                .map_err(|e| SyncError::Connection(e.to_string()))?;

            if !response.status().is_success() {
                return Err(SyncError::Connection(format!(
                    "unexpected status {}",
                    response.status()
                )));
            }

            let bytes = Box::pin(response.bytes_stream());
            let stream = futures_util::stream::unfold(
                (bytes, SseDecoder::default(), VecDeque::new()),
                |(mut bytes, mut decoder, mut pending)| async move {
                    loop {
                        if let Some(message) = pending.pop_front() {
                            return Some((message, (bytes, decoder, pending)));
                        }
                        match bytes.next().await {
                            Some(Ok(chunk)) => {
                                let text = String::from_utf8_lossy(&chunk).into_owned();
                                pending.extend(decoder.feed(&text));
                            }
                            // Mid-stream error or close both end the stream.
                            Some(Err(_)) | None => return None,
                        }
                    }
                },
            );

            Ok(stream.boxed())
        })
    }
}

/// Incremental decoder for the SSE wire format.
///
/// Frames are separated by a blank line; only `data:` lines carry event
/// payloads. Multi-line data is joined with a newline per the SSE spec.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    /// Feed a chunk of text; returns every data payload completed by it
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(&chunk.replace("\r\n", "\n"));

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..pos + 2).collect();

            let data: Vec<&str> = frame
                .lines()
                .filter_map(|line| {
                    line.strip_prefix("data:")
                        .map(|d| d.strip_prefix(' ').unwrap_or(d))
                })
                .collect();

            if !data.is_empty() {
                payloads.push(data.join("\n"));
            }
        }
        payloads
    }
}

/// In-process connector backed by channels, for tests and embedded use.
///
/// Each `connect` call consumes one queued source; connecting with no
/// source queued fails, which exercises the reconnect path.
#[derive(Default)]
pub struct ChannelConnector {
    sources: Mutex<VecDeque<mpsc::UnboundedReceiver<String>>>,
    attempts: AtomicUsize,
}

impl ChannelConnector {
    /// Create a connector with no sources queued
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a source for the next connect; returns the sender that feeds it
    pub fn push_source(&self) -> mpsc::UnboundedSender<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut sources) = self.sources.lock() {
            sources.push_back(rx);
        }
        tx
    }

    /// Number of connect calls made so far
    pub fn connect_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl LiveConnector for ChannelConnector {
    fn connect(&self) -> BoxFuture<'static, SyncResult<MessageStream>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let source = self.sources.lock().ok().and_then(|mut q| q.pop_front());

        Box::pin(async move {
            match source {
                Some(rx) => {
                    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
                        rx.recv().await.map(|message| (message, rx))
                    });
                    Ok(stream.boxed())
                }
                None => Err(SyncError::Connection("no stream source queued".into())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_single_frame() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.feed("data: {\"event\":\"romhack:added\"}\n\n");
        assert_eq!(payloads, vec!["{\"event\":\"romhack:added\"}"]);
    }

    #[test]
    fn test_decoder_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.feed("data: par").is_empty());
        assert!(decoder.feed("tial").is_empty());
        let payloads = decoder.feed("\n\n");
        assert_eq!(payloads, vec!["partial"]);
    }

    #[test]
    fn test_decoder_multiple_frames_one_chunk() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.feed("data: one\n\ndata: two\n\n");
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[test]
    fn test_decoder_ignores_comments_and_ids() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.feed(": keep-alive\n\nid: 4\ndata: real\n\n");
        assert_eq!(payloads, vec!["real"]);
    }

    #[test]
    fn test_decoder_joins_multiline_data() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.feed("data: line1\ndata: line2\n\n");
        assert_eq!(payloads, vec!["line1\nline2"]);
    }

    #[test]
    fn test_decoder_crlf_normalized() {
        let mut decoder = SseDecoder::default();
        let payloads = decoder.feed("data: msg\r\n\r\n");
        assert_eq!(payloads, vec!["msg"]);
    }

    #[tokio::test]
    async fn test_channel_connector_streams_messages() {
        let connector = ChannelConnector::new();
        let tx = connector.push_source();

        let mut stream = connector.connect().await.unwrap();
        tx.send("hello".to_string()).unwrap();
        assert_eq!(stream.next().await.unwrap(), "hello");

        // Dropping the sender ends the stream, like a dropped connection.
        drop(tx);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_channel_connector_fails_without_source() {
        let connector = ChannelConnector::new();
        assert!(connector.connect().await.is_err());
        assert_eq!(connector.connect_attempts(), 1);
    }
}
