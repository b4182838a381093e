//! Network client for the certstream WebSocket feed
//!
//! This module handles connecting to the certstream websocket, parsing
//! messages, feeding certificate domains to the matcher and reconnecting
//! after failures.

use crate::matching::PatternMatcher;
use crate::sink::MatchSender;
use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, instrument, trace, warn};

/// Default pause between a disconnect and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// A decoded certstream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Liveness ping from the server.
    Heartbeat,
    /// A newly logged certificate and every domain it covers.
    CertificateUpdate(Vec<String>),
    /// Any other message type; carries the type name.
    Other(String),
}

/// Parses a raw certstream JSON message
///
/// # Returns
/// * `Ok(StreamEvent)` for any well-formed message
/// * `Err` if the JSON is malformed or a certificate update lacks its domains
pub fn parse_message(text: &str) -> Result<StreamEvent> {
    #[derive(Deserialize)]
    struct CertStreamMessage {
        message_type: String,
        #[serde(default)]
        data: Option<MessageData>,
    }

    #[derive(Deserialize)]
    struct MessageData {
        leaf_cert: LeafCert,
    }

    #[derive(Deserialize)]
    struct LeafCert {
        all_domains: Vec<String>,
    }

    let message: CertStreamMessage = serde_json::from_str(text)?;
    match message.message_type.as_str() {
        "heartbeat" => Ok(StreamEvent::Heartbeat),
        "certificate_update" => {
            let data = message
                .data
                .ok_or_else(|| anyhow::anyhow!("certificate_update without data"))?;
            Ok(StreamEvent::CertificateUpdate(data.leaf_cert.all_domains))
        }
        other => Ok(StreamEvent::Other(other.to_string())),
    }
}

/// Trait for WebSocket connections to enable testing with fake implementations
#[async_trait]
pub trait WebSocketConnection: Send {
    /// Reads the next message from the WebSocket connection
    ///
    /// # Returns
    /// * `Some(Ok(Message))` if a message was successfully received
    /// * `Some(Err(error))` if there was an error reading the message
    /// * `None` if the connection has been closed
    async fn read_message(
        &mut self,
    ) -> Option<Result<Message, tokio_tungstenite::tungstenite::Error>>;
}

/// Why a single session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Closed,
    Shutdown,
}

/// Opens connections to the stream source.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn WebSocketConnection>>;
}

/// Connects with tokio-tungstenite, TLS included.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl WebSocketConnection for TungsteniteConnection {
    async fn read_message(
        &mut self,
    ) -> Option<Result<Message, tokio_tungstenite::tungstenite::Error>> {
        self.stream.next().await
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn WebSocketConnection>> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", url, e))?;
        Ok(Box::new(TungsteniteConnection { stream }))
    }
}

/// Listens to the certstream feed and turns certificate domains into match
/// lines on the match queue.
///
/// The listener owns the matcher, so the record of reported matches
/// survives reconnects.
pub struct StreamListener {
    url: String,
    matcher: PatternMatcher,
    sink: MatchSender,
    reconnect_delay: Duration,
    connector: Arc<dyn Connector>,
}

impl StreamListener {
    /// Creates a new listener
    ///
    /// # Arguments
    /// * `url` - The WebSocket URL to connect to (e.g., "wss://certstream.calidog.io/")
    /// * `matcher` - Matcher every certificate domain is evaluated against
    /// * `sink` - Queue that receives the resulting match lines
    /// * `reconnect_delay` - Pause after a disconnect before reconnecting
    pub fn new(
        url: String,
        matcher: PatternMatcher,
        sink: MatchSender,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            url,
            matcher,
            sink,
            reconnect_delay,
            connector: Arc::new(TungsteniteConnector),
        }
    }

    /// Replaces the connector (primarily for testing).
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    /// Runs the client with a custom WebSocket connection (primarily for testing)
    ///
    /// This method processes messages from the provided connection until it
    /// closes, then returns. It does not implement reconnection logic.
    pub async fn run_with_connection(
        &mut self,
        connection: Box<dyn WebSocketConnection>,
    ) -> Result<()> {
        let (_never_tx, mut never_rx) = watch::channel(false);
        self.listen(connection, &mut never_rx).await.map(|_| ())
    }

    /// Reads messages until the connection ends or shutdown is signalled.
    ///
    /// Shutdown is only observed while waiting for the next message. Once a
    /// message has been read, every match it produces is queued, so nothing
    /// recorded by the matcher is lost.
    async fn listen(
        &mut self,
        mut connection: Box<dyn WebSocketConnection>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd> {
        loop {
            let message = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => return Ok(SessionEnd::Shutdown),
                message = connection.read_message() => message,
            };

            match message {
                Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()).await?,
                Some(Ok(Message::Binary(_))) => {
                    debug!("Received binary message, ignoring");
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    trace!("Received ping/pong message");
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Received close message from server");
                    return Ok(SessionEnd::Closed);
                }
                Some(Ok(Message::Frame(_))) => {
                    debug!("Received frame message, ignoring");
                }
                Some(Err(e)) => {
                    return Err(anyhow::anyhow!("WebSocket error: {}", e));
                }
                None => {
                    info!("WebSocket connection closed");
                    return Ok(SessionEnd::Closed);
                }
            }
        }
    }

    async fn handle_text(&mut self, text: &str) -> Result<()> {
        match parse_message(text) {
            Ok(StreamEvent::Heartbeat) => trace!("Received heartbeat"),
            Ok(StreamEvent::CertificateUpdate(domains)) => {
                trace!(count = domains.len(), "Received certificate update");
                for domain in &domains {
                    for line in self.matcher.evaluate(domain) {
                        self.sink.send(line).await?;
                    }
                }
            }
            Ok(StreamEvent::Other(kind)) => debug!(kind = %kind, "Ignoring certstream message"),
            Err(e) => warn!("Failed to parse certstream message: {}", e),
        }
        Ok(())
    }

    async fn connect_and_listen(
        &mut self,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<SessionEnd> {
        let connector = self.connector.clone();
        let connection = tokio::select! {
            biased;
            _ = shutdown_rx.changed() => return Ok(SessionEnd::Shutdown),
            connection = connector.connect(&self.url) => connection?,
        };
        info!("Connected to {}", self.url);
        self.listen(connection, shutdown_rx).await
    }

    /// Connects, listens, and after any disconnect waits `reconnect_delay`
    /// and connects again.
    ///
    /// Returns only on shutdown or when the match queue has been closed. The
    /// match sender is dropped with the listener, which is what lets the
    /// delivery worker finish.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn run(&mut self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            if *shutdown_rx.borrow_and_update() {
                info!("Stream listener received shutdown signal.");
                break;
            }

            info!("Attempting to connect to certstream");
            match self.connect_and_listen(&mut shutdown_rx).await {
                Ok(SessionEnd::Shutdown) => {
                    info!("Stream listener received shutdown signal.");
                    break;
                }
                Ok(SessionEnd::Closed) => warn!("Certstream connection ended"),
                Err(e) => error!("Error listening to certstream: {}", e),
            }

            if self.sink.is_closed() {
                error!("Match queue closed, stream listener stopping.");
                break;
            }

            info!("Reconnecting in {}s", self.reconnect_delay.as_secs_f64());
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Stream listener received shutdown signal during backoff.");
                    break;
                }
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        info!(
            reported_domains = self.matcher.reported_domains(),
            "Stream listener finished."
        );
    }
}
