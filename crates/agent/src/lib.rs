//! Agent adapters for the vellum canvas
//!
//! This crate is the seam between the canvas revision store and an
//! external agent framework. It exposes:
//!
//! - **Tools** (`tools`) - the two canvas mutations (`update_file`,
//!   `apply_patch`) as named, schema-described, cancellable actions
//! - **Context** (`context`) - the ordered conversation history the
//!   memory layer injects into
//! - **Memory** (`memory`) - `CanvasMemory`, which places a full-canvas
//!   snapshot into the context as a single system message before each
//!   model call
//!
//! # Sharing model
//!
//! All adapters operating on one document set hold the same
//! `SharedCanvas` (an `Arc<RwLock<TextCanvas>>`). The write lock is what
//! makes `apply_patch`'s read-modify-write safe when several agents edit
//! concurrently; the canvas itself performs no locking.
//!
//! Retry and error-surfacing policy is the caller's: tools propagate
//! canvas errors unchanged and never swallow them.

pub mod context;
pub mod memory;
pub mod tools;

pub use context::{ChatMessage, ConversationContext, MessageRole};
pub use memory::{CanvasMemory, Memory, MemoryQueryResult, MemoryRecord};
pub use tools::{shared_canvas, ApplyPatchTool, SharedCanvas, Tool, ToolRegistry, UpdateFileTool};
