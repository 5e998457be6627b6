use async_trait::async_trait;
use tokio::sync::Mutex;

/// Sends replies back to wherever an invocation came from.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, content: &str) -> anyhow::Result<()>;
}

/// Keeps every reply in memory.
#[derive(Default)]
pub struct BufferedResponder {
    replies: Mutex<Vec<String>>,
}

impl BufferedResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn replies(&self) -> Vec<String> {
        self.replies.lock().await.clone()
    }

    pub async fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.replies.lock().await)
    }
}

#[async_trait]
impl Responder for BufferedResponder {
    async fn reply(&self, content: &str) -> anyhow::Result<()> {
        self.replies.lock().await.push(content.to_owned());
        Ok(())
    }
}
