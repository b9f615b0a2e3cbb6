use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use vellum_core::TextCanvas;

/// Canvas handle shared by every adapter operating on one document set.
///
/// The write lock makes `apply_patch`'s read-modify-write atomic when
/// several agents collaborate on the same canvas.
pub type SharedCanvas = Arc<RwLock<TextCanvas>>;

pub fn shared_canvas(canvas: TextCanvas) -> SharedCanvas {
    Arc::new(RwLock::new(canvas))
}

/// A callable action exposed to an external tool-invocation framework.
///
/// The cancellation token is cooperative and only consulted at the tool
/// boundary; canvas operations are fast, in-memory, and never poll it.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value, cancel: &CancellationToken) -> Result<Value>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| &**tool)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn execute(
        &self,
        name: &str,
        input: Value,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let tool = self.get(name).ok_or_else(|| anyhow!("unknown tool: `{name}`"))?;
        tool.execute(input, cancel).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct UpdateFileArgs {
    filename: String,
    new_content: String,
}

#[derive(Debug, Serialize)]
struct UpdateFileResult {
    status: &'static str,
    filename: String,
    revision: u32,
}

/// Creates a canvas file or overwrites it with new full content.
pub struct UpdateFileTool {
    canvas: SharedCanvas,
}

impl UpdateFileTool {
    pub fn new(canvas: SharedCanvas) -> Self {
        Self { canvas }
    }
}

#[async_trait]
impl Tool for UpdateFileTool {
    fn name(&self) -> &'static str {
        "update_file"
    }

    fn description(&self) -> &'static str {
        "Create a file on the canvas, or overwrite an existing file with new full content"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Name of the canvas file to create or overwrite"
                },
                "new_content": {
                    "type": "string",
                    "description": "Full replacement content for the file"
                }
            },
            "required": ["filename", "new_content"]
        })
    }

    async fn execute(&self, input: Value, cancel: &CancellationToken) -> Result<Value> {
        if cancel.is_cancelled() {
            bail!("update_file was cancelled before it ran");
        }

        let args: UpdateFileArgs =
            serde_json::from_value(input).context("invalid update_file arguments")?;

        let mut canvas = self.canvas.write().await;
        let revision = canvas.add_or_update_file(&args.filename, &args.new_content);
        tracing::debug!(filename = %args.filename, revision, "canvas file updated");

        Ok(serde_json::to_value(UpdateFileResult {
            status: "OK",
            filename: args.filename,
            revision,
        })?)
    }
}

#[derive(Debug, Deserialize)]
struct ApplyPatchArgs {
    filename: String,
    patch_text: String,
}

#[derive(Debug, Serialize)]
struct ApplyPatchResult {
    status: &'static str,
    filename: String,
    revision: u32,
}

/// Applies a unified-diff patch to a canvas file's latest revision.
///
/// Canvas errors (file not found, invalid patch format) propagate to the
/// caller unchanged; retry policy belongs to the agent framework.
pub struct ApplyPatchTool {
    canvas: SharedCanvas,
}

impl ApplyPatchTool {
    pub fn new(canvas: SharedCanvas) -> Self {
        Self { canvas }
    }
}

#[async_trait]
impl Tool for ApplyPatchTool {
    fn name(&self) -> &'static str {
        "apply_patch"
    }

    fn description(&self) -> &'static str {
        "Apply a unified-diff patch to an existing canvas file"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Name of the existing canvas file to patch"
                },
                "patch_text": {
                    "type": "string",
                    "description": "Unified-diff text describing the edit"
                }
            },
            "required": ["filename", "patch_text"]
        })
    }

    async fn execute(&self, input: Value, cancel: &CancellationToken) -> Result<Value> {
        if cancel.is_cancelled() {
            bail!("apply_patch was cancelled before it ran");
        }

        let args: ApplyPatchArgs =
            serde_json::from_value(input).context("invalid apply_patch arguments")?;

        let mut canvas = self.canvas.write().await;
        let revision = canvas.apply_patch(&args.filename, &args.patch_text)?;
        tracing::debug!(filename = %args.filename, revision, "canvas patch applied");

        Ok(serde_json::to_value(ApplyPatchResult {
            status: "PATCH APPLIED",
            filename: args.filename,
            revision,
        })?)
    }
}
