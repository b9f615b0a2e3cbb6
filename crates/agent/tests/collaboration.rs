//! End-to-end flow over one shared canvas: tool mutations, context
//! injection between turns, and whole-canvas reset.

use serde_json::json;
use tokio_util::sync::CancellationToken;

use vellum_agent::{
    shared_canvas, ApplyPatchTool, CanvasMemory, ConversationContext, Memory, MessageRole,
    ToolRegistry, UpdateFileTool,
};
use vellum_core::TextCanvas;

fn registry_over(canvas: &vellum_agent::SharedCanvas) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(UpdateFileTool::new(canvas.clone()));
    registry.register(ApplyPatchTool::new(canvas.clone()));
    registry
}

#[tokio::test]
async fn two_turn_edit_session_round_trips_through_the_tools() {
    let canvas = shared_canvas(TextCanvas::new());
    let registry = registry_over(&canvas);
    let memory = CanvasMemory::new(canvas.clone());
    let cancel = CancellationToken::new();

    // Turn 1: the agent drafts a file.
    let result = registry
        .execute(
            "update_file",
            json!({"filename": "notes.txt", "new_content": "line1\nline2\n"}),
            &cancel,
        )
        .await
        .expect("draft should commit");
    assert_eq!(result["revision"], 1);

    // Between turns the memory layer surfaces the draft.
    let mut context = ConversationContext::new();
    memory.update_context(&mut context).await.expect("context injection");
    assert_eq!(context.len(), 1);
    assert_eq!(context.messages()[0].role, MessageRole::System);
    assert!(context.messages()[0].content.contains("line2"));

    // Turn 2: the agent patches the draft with a diff generated by the
    // canvas itself.
    let diff = {
        let mut probe = TextCanvas::new();
        probe.add_or_update_file("notes.txt", "line1\nline2\n");
        probe.add_or_update_file("notes.txt", "line1\nline2 modified\nline3\n");
        probe.get_diff("notes.txt", 1, 2)
    };
    let result = registry
        .execute("apply_patch", json!({"filename": "notes.txt", "patch_text": diff}), &cancel)
        .await
        .expect("patch should apply");
    assert_eq!(result["status"], "PATCH APPLIED");
    assert_eq!(result["revision"], 2);

    // The next context snapshot carries only the patched content.
    let mut context = ConversationContext::new();
    memory.update_context(&mut context).await.expect("context injection");
    let content = &context.messages()[0].content;
    assert!(content.contains("File: notes.txt (revision 2)"));
    assert!(content.contains("line2 modified"));

    // Full history stayed retrievable underneath.
    let guard = canvas.read().await;
    assert_eq!(guard.get_revision_content("notes.txt", 1), "line1\nline2\n");
    assert_eq!(guard.get_revision_content("notes.txt", 2), "line1\nline2 modified\nline3\n");
}

#[tokio::test]
async fn patch_errors_reach_the_framework_unchanged() {
    let canvas = shared_canvas(TextCanvas::new());
    let registry = registry_over(&canvas);
    let cancel = CancellationToken::new();

    let error = registry
        .execute(
            "apply_patch",
            json!({"filename": "missing.txt", "patch_text": "--- a\n+++ b\n@@ -1 +1 @@\n-x\n+y\n"}),
            &cancel,
        )
        .await
        .expect_err("patching a missing file must fail");
    assert!(error.to_string().contains("file not found"));
}

#[tokio::test]
async fn memory_clear_resets_the_canvas_for_every_adapter() {
    let canvas = shared_canvas(TextCanvas::new());
    let registry = registry_over(&canvas);
    let memory = CanvasMemory::new(canvas.clone());
    let cancel = CancellationToken::new();

    registry
        .execute("update_file", json!({"filename": "a.txt", "new_content": "a\n"}), &cancel)
        .await
        .expect("first file");
    registry
        .execute("update_file", json!({"filename": "b.txt", "new_content": "b\n"}), &cancel)
        .await
        .expect("second file");
    assert_eq!(canvas.read().await.file_count(), 2);

    memory.clear().await.expect("clear");
    assert!(canvas.read().await.is_empty());

    // The tools still work against the fresh canvas, starting over at
    // revision 1.
    let result = registry
        .execute("update_file", json!({"filename": "a.txt", "new_content": "again\n"}), &cancel)
        .await
        .expect("rewrite after clear");
    assert_eq!(result["revision"], 1);
}
