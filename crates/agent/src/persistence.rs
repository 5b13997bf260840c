//! The `saveToServer` / `streamToClient` callback contract between
//! `AgentMind` and `AgentHands` (spec §4.5, ordering guarantees in §5).

use std::sync::Arc;

use async_trait::async_trait;

use agentrt_domain::resource::{AnyResource, Resource};
use agentrt_domain::Result;
use agentrt_index::{MemoryIndex, ResourceIndex};

/// Atomic batch write: parallel to `ResourceIndex`, then one ordered
/// append per message to `MemoryIndex` in conversation order (spec §5
/// "Ordering guarantees").
#[async_trait]
pub trait SaveToServer: Send + Sync {
    async fn save(&self, messages: Vec<AnyResource>) -> Result<()>;
}

/// Fire-and-forget progress notification for non-tool messages.
pub trait StreamToClient: Send + Sync {
    fn stream(&self, message: &AnyResource);
}

/// The concrete persistence used by `AgentMind` outside of tests.
pub struct ServerPersistence {
    resources: Arc<ResourceIndex>,
    memory: Arc<MemoryIndex>,
}

impl ServerPersistence {
    pub fn new(resources: Arc<ResourceIndex>, memory: Arc<MemoryIndex>) -> Self {
        Self { resources, memory }
    }
}

#[async_trait]
impl SaveToServer for ServerPersistence {
    async fn save(&self, messages: Vec<AnyResource>) -> Result<()> {
        let writes = messages
            .iter()
            .cloned()
            .map(|m| async move { self.resources.add(m).await });
        for result in futures_util::future::join_all(writes).await {
            result?;
        }
        for message in &messages {
            self.memory.append(message.identifier().clone()).await?;
        }
        Ok(())
    }
}

/// Suppresses progress emission for `ToolCallMessage` entries (spec §4.6:
/// "tool chatter is not client-facing"), delegating everything else to
/// `inner`.
pub struct SuppressToolChatter<T> {
    inner: T,
}

impl<T: StreamToClient> SuppressToolChatter<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: StreamToClient> StreamToClient for SuppressToolChatter<T> {
    fn stream(&self, message: &AnyResource) {
        if matches!(message, AnyResource::ToolCallMessage(_)) {
            return;
        }
        self.inner.stream(message);
    }
}

impl<T: StreamToClient + ?Sized> StreamToClient for &T {
    fn stream(&self, message: &AnyResource) {
        (**self).stream(message)
    }
}
