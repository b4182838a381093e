//! Scripted stand-ins for the certstream WebSocket.
use anyhow::Result;
use async_trait::async_trait;
use squatwatch::network::{Connector, WebSocketConnection};
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio_tungstenite::tungstenite::{Error, Message};

/// Replays a fixed list of messages, then reports the connection closed.
pub struct ScriptedWebSocket {
    messages: VecDeque<Result<Message, Error>>,
}

impl ScriptedWebSocket {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages: messages.into_iter().map(Ok).collect(),
        }
    }

    /// Replays `messages`, then fails with a protocol error instead of closing.
    pub fn failing_after(messages: Vec<Message>) -> Self {
        let mut ws = Self::new(messages);
        ws.messages.push_back(Err(Error::ConnectionClosed));
        ws
    }
}

#[async_trait]
impl WebSocketConnection for ScriptedWebSocket {
    async fn read_message(&mut self) -> Option<Result<Message, Error>> {
        self.messages.pop_front()
    }
}

/// A connection that never yields anything.
pub struct SilentWebSocket;

#[async_trait]
impl WebSocketConnection for SilentWebSocket {
    async fn read_message(&mut self) -> Option<Result<Message, Error>> {
        std::future::pending().await
    }
}

/// Hands out one scripted session per connect. Once the scripts run out,
/// every further connection stays silent.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    sessions: Arc<Mutex<VecDeque<Vec<Message>>>>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new(sessions: Vec<Vec<Message>>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(sessions.into())),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn WebSocketConnection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some(messages) => Ok(Box::new(ScriptedWebSocket::new(messages))),
            None => Ok(Box::new(SilentWebSocket)),
        }
    }
}

/// Refuses every connection attempt.
#[derive(Clone, Default)]
pub struct FailingConnector {
    attempts: Arc<AtomicUsize>,
}

impl FailingConnector {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FailingConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn WebSocketConnection>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("connection refused: {url}")
    }
}

/// A connection that never runs dry: message `n` is a certificate for
/// `evil-<n>.com`. Counts how many messages were handed out.
pub struct EndlessWebSocket {
    served: Arc<AtomicUsize>,
}

#[async_trait]
impl WebSocketConnection for EndlessWebSocket {
    async fn read_message(&mut self) -> Option<Result<Message, Error>> {
        tokio::task::yield_now().await;
        let n = self.served.fetch_add(1, Ordering::SeqCst);
        let json = super::messages::cert_update_json(&[&format!("evil-{n}.com")]);
        Some(Ok(Message::Text(json.into())))
    }
}

/// Connects to an [`EndlessWebSocket`] that shares one message counter.
#[derive(Clone, Default)]
pub struct EndlessConnector {
    served: Arc<AtomicUsize>,
}

impl EndlessConnector {
    pub fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for EndlessConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn WebSocketConnection>> {
        Ok(Box::new(EndlessWebSocket {
            served: self.served.clone(),
        }))
    }
}
