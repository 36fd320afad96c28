use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::yield_now;

use crate::transport::{MessageSink, Transport};

/// Paired in-process transport, used by tests and local demos.
pub struct InMemoryTransport {
    recv_queue: Arc<Mutex<VecDeque<String>>>,
    send_queue: Arc<Mutex<VecDeque<String>>>,
}

impl InMemoryTransport {
    pub fn pair() -> (Self, Self) {
        let q1 = Arc::new(Mutex::new(VecDeque::new()));
        let q2 = Arc::new(Mutex::new(VecDeque::new()));
        (
            Self {
                recv_queue: q1.clone(),
                send_queue: q2.clone(),
            },
            Self {
                recv_queue: q2,
                send_queue: q1,
            },
        )
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn send(&mut self, text: &str) -> anyhow::Result<()> {
        if Arc::strong_count(&self.send_queue) == 1 {
            return Err(anyhow::anyhow!("Channel closed"));
        }
        self.send_queue.lock().push_back(text.to_string());
        Ok(())
    }

    async fn recv(&mut self) -> anyhow::Result<String> {
        loop {
            if let Some(msg) = self.recv_queue.lock().pop_front() {
                return Ok(msg);
            }
            if Arc::strong_count(&self.recv_queue) == 1 {
                return Err(anyhow::anyhow!("Channel closed"));
            }
            yield_now().await;
        }
    }
}

/// Sink that keeps every message it is handed. Test double for a live client.
#[derive(Debug)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
    open: AtomicBool,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
        }
    }

    /// Everything delivered so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Whether any delivered message contains `needle`.
    pub fn received(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|m| m.contains(needle))
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }

    /// Simulate the transport dropping.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl MessageSink for RecordingSink {
    fn send(&self, text: &str) -> anyhow::Result<()> {
        if !self.is_open() {
            return Err(anyhow::anyhow!("Sink is closed"));
        }
        self.messages.lock().push(text.to_string());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
