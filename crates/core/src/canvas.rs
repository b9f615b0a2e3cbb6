use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CanvasConfig;
use crate::diff::{self, patch};
use crate::errors::CanvasError;

/// One immutable snapshot of a file's full content.
///
/// Revisions are 1-indexed and strictly increase by 1 within a file; the
/// canvas never rewrites one after it has been committed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileRevision {
    pub content: String,
    pub revision: u32,
    pub created_at: DateTime<Utc>,
}

/// In-memory, append-only, multi-file revision store.
///
/// Each file carries an independent chronological history; the latest
/// content of a file that was never written is the empty string. There is
/// no per-file delete: the only reset is replacing the whole canvas with a
/// fresh instance.
#[derive(Clone, Debug, Default)]
pub struct TextCanvas {
    files: BTreeMap<String, Vec<FileRevision>>,
    config: CanvasConfig,
}

impl TextCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CanvasConfig) -> Self {
        Self { files: BTreeMap::new(), config }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Content of the highest-numbered revision, or `""` for a filename
    /// with no history.
    pub fn get_latest_content(&self, filename: &str) -> &str {
        self.files
            .get(filename)
            .and_then(|revisions| revisions.last())
            .map(|revision| revision.content.as_str())
            .unwrap_or("")
    }

    /// Exact content at a specific stored revision, or `""` if that
    /// revision number was never stored for the file.
    pub fn get_revision_content(&self, filename: &str, revision: u32) -> &str {
        if revision == 0 {
            return "";
        }
        self.files
            .get(filename)
            .and_then(|revisions| revisions.get(revision as usize - 1))
            .map(|stored| stored.content.as_str())
            .unwrap_or("")
    }

    /// Commit `new_content` as the file's next revision (revision 1 for a
    /// new file). This is a whole-file overwrite; earlier revisions stay
    /// retrievable. Returns the committed revision number.
    pub fn add_or_update_file(&mut self, filename: &str, new_content: &str) -> u32 {
        let revisions = self.files.entry(filename.to_string()).or_default();
        let revision = revisions.len() as u32 + 1;
        revisions.push(FileRevision {
            content: new_content.to_string(),
            revision,
            created_at: Utc::now(),
        });
        revision
    }

    /// Byte-input front door: validates UTF-8 before committing.
    pub fn add_or_update_file_bytes(
        &mut self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<u32, CanvasError> {
        let content = std::str::from_utf8(bytes)?;
        Ok(self.add_or_update_file(filename, content))
    }

    /// Unified diff from `from_revision` to `to_revision`, labeled
    /// `{filename}@r{n}` on each side.
    ///
    /// Returns `""` rather than failing when the file has no history,
    /// either revision number is 0, or both resolved contents are empty.
    /// A revision that was never stored resolves to empty content.
    pub fn get_diff(&self, filename: &str, from_revision: u32, to_revision: u32) -> String {
        if from_revision == 0 || to_revision == 0 {
            return String::new();
        }
        if !self.files.contains_key(filename) {
            return String::new();
        }

        let old = self.get_revision_content(filename, from_revision);
        let new = self.get_revision_content(filename, to_revision);
        if old.is_empty() && new.is_empty() {
            return String::new();
        }

        diff::unified_diff(
            old,
            new,
            &format!("{filename}@r{from_revision}"),
            &format!("{filename}@r{to_revision}"),
            self.config.diff_context_lines,
        )
    }

    /// Chronological unified diffs between each consecutive revision pair;
    /// empty for files with fewer than two revisions.
    pub fn get_revision_diffs(&self, filename: &str) -> Vec<String> {
        let Some(revisions) = self.files.get(filename) else {
            return Vec::new();
        };
        (1..revisions.len() as u32)
            .map(|revision| self.get_diff(filename, revision, revision + 1))
            .collect()
    }

    /// Parse `patch_text` as a unified diff and apply it to the file's
    /// latest content, committing the result as a new revision.
    ///
    /// Fails with `FileNotFound` if the file has no history and
    /// `InvalidPatchFormat` if the patch is empty, malformed, names more
    /// than one file, or does not fit the current content.
    pub fn apply_patch(&mut self, filename: &str, patch_text: &str) -> Result<u32, CanvasError> {
        if !self.files.contains_key(filename) {
            return Err(CanvasError::file_not_found(filename));
        }

        let parsed = patch::parse(patch_text)?;
        let updated = patch::apply(self.get_latest_content(filename), &parsed)?;
        Ok(self.add_or_update_file(filename, &updated))
    }

    /// Every filename ever written, mapped to its latest revision number.
    pub fn list_files(&self) -> BTreeMap<String, u32> {
        self.files
            .iter()
            .map(|(filename, revisions)| (filename.clone(), revisions.len() as u32))
            .collect()
    }

    /// Deterministic, human/model-readable snapshot of every file's latest
    /// revision, bounded by the configured header and footer markers.
    /// Empty canvas produces the empty string.
    pub fn get_all_contents_for_context(&self) -> String {
        if self.files.is_empty() {
            return String::new();
        }

        let mut output = String::new();
        output.push_str(&self.config.context_header);
        output.push('\n');

        for (filename, revisions) in &self.files {
            let Some(latest) = revisions.last() else {
                continue;
            };
            output.push('\n');
            let _ = writeln!(output, "File: {filename} (revision {})", latest.revision);
            output.push_str(&latest.content);
            if !latest.content.is_empty() && !latest.content.ends_with('\n') {
                output.push('\n');
            }
        }

        output.push('\n');
        output.push_str(&self.config.context_footer);
        output.push('\n');
        output
    }
}
