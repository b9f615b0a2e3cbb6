use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vellum_core::TextCanvas;

use crate::context::{ChatMessage, ConversationContext};
use crate::tools::SharedCanvas;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryQueryResult {
    pub records: Vec<MemoryRecord>,
}

impl MemoryQueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A memory source consulted before each model call.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Inject this memory's contribution into the conversation context.
    /// Returns what was injected, wrapped as a queryable result for
    /// logging and debugging.
    async fn update_context(&self, context: &mut ConversationContext)
        -> Result<MemoryQueryResult>;

    async fn query(&self, text: &str, limit: usize) -> Result<MemoryQueryResult>;

    async fn add(&self, text: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

/// Memory adapter that surfaces the full canvas as one system message.
///
/// `query` and `add` are deliberate no-ops: the canvas is not a semantic
/// store, and mutation flows only through the canvas tools.
pub struct CanvasMemory {
    canvas: SharedCanvas,
}

impl CanvasMemory {
    pub fn new(canvas: SharedCanvas) -> Self {
        Self { canvas }
    }
}

#[async_trait]
impl Memory for CanvasMemory {
    async fn update_context(
        &self,
        context: &mut ConversationContext,
    ) -> Result<MemoryQueryResult> {
        let snapshot = self.canvas.read().await.get_all_contents_for_context();
        if snapshot.trim().is_empty() {
            return Ok(MemoryQueryResult::empty());
        }

        context.add_message(ChatMessage::system(snapshot.clone())).await;
        tracing::debug!(bytes = snapshot.len(), "canvas snapshot injected into context");
        Ok(MemoryQueryResult { records: vec![MemoryRecord { text: snapshot }] })
    }

    async fn query(&self, _text: &str, _limit: usize) -> Result<MemoryQueryResult> {
        Ok(MemoryQueryResult::empty())
    }

    async fn add(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    /// Discard every file and its history by swapping in a fresh canvas
    /// with the same configuration. Irreversible.
    async fn clear(&self) -> Result<()> {
        let mut canvas = self.canvas.write().await;
        let config = canvas.config().clone();
        *canvas = TextCanvas::with_config(config);
        tracing::info!("canvas cleared");
        Ok(())
    }
}
