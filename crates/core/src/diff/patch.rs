//! Unified-diff parsing and hunk application.
//!
//! Hunk bodies are consumed by the line counts declared in the `@@` header,
//! not by prefix sniffing, so removed lines that themselves start with `--`
//! cannot be mistaken for a file header. Application walks the hunks in
//! order over a terminator-preserving line array, maintaining a running
//! shift so later hunks stay aligned after earlier ones change the line
//! count.

use crate::diff::split_keepends;
use crate::errors::CanvasError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HunkLine {
    Context(String),
    Added(String),
    Removed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based first source line; the line *before* the edit when
    /// `source_len` is 0.
    pub source_start: usize,
    pub source_len: usize,
    pub target_start: usize,
    pub target_len: usize,
    pub lines: Vec<HunkLine>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedPatch {
    pub hunks: Vec<Hunk>,
}

/// Parse unified-diff text into hunks.
///
/// Accepts `---`/`+++` header pairs, `@@` ranges with or without an
/// explicit length, and `\ No newline at end of file` markers. Rejects
/// empty input, input with no hunks, and patches naming more than one
/// file (the canvas applies patches to exactly one file per call).
pub fn parse(patch_text: &str) -> Result<ParsedPatch, CanvasError> {
    if patch_text.trim().is_empty() {
        return Err(CanvasError::invalid_patch("patch text is empty"));
    }

    let lines = split_keepends(patch_text);
    let mut hunks: Vec<Hunk> = Vec::new();
    let mut file_sections = 0usize;
    let mut index = 0usize;

    while index < lines.len() {
        let line = lines[index];

        if line.starts_with("--- ") {
            file_sections += 1;
            if file_sections > 1 {
                return Err(CanvasError::invalid_patch(
                    "patch names more than one file; apply one file per call",
                ));
            }
            index += 1;
            if index < lines.len() && lines[index].starts_with("+++ ") {
                index += 1;
            } else {
                return Err(CanvasError::invalid_patch("`---` header without a matching `+++`"));
            }
            continue;
        }

        if line.starts_with("+++ ") {
            return Err(CanvasError::invalid_patch("`+++` header without a preceding `---`"));
        }

        if line.starts_with("@@") {
            let (hunk, next_index) = parse_hunk(&lines, index)?;
            hunks.push(hunk);
            index = next_index;
            continue;
        }

        // Anything else between sections (e.g. `diff --git`, `Index:`
        // lines) is preamble noise.
        index += 1;
    }

    if hunks.is_empty() {
        return Err(CanvasError::invalid_patch("patch contains no hunks"));
    }

    Ok(ParsedPatch { hunks })
}

fn parse_hunk(lines: &[&str], header_index: usize) -> Result<(Hunk, usize), CanvasError> {
    let header = lines[header_index];
    let (source_start, source_len, target_start, target_len) = parse_hunk_header(header)?;

    if source_len > 0 && source_start == 0 {
        return Err(CanvasError::invalid_patch(format!(
            "hunk source range is 1-indexed: {}",
            header.trim_end()
        )));
    }
    if target_len > 0 && target_start == 0 {
        return Err(CanvasError::invalid_patch(format!(
            "hunk target range is 1-indexed: {}",
            header.trim_end()
        )));
    }

    let mut body: Vec<HunkLine> = Vec::new();
    let mut source_seen = 0usize;
    let mut target_seen = 0usize;
    let mut index = header_index + 1;

    while source_seen < source_len || target_seen < target_len {
        let Some(&raw) = lines.get(index) else {
            return Err(CanvasError::invalid_patch(format!(
                "hunk is truncated: expected {source_len} source and {target_len} target lines"
            )));
        };
        index += 1;

        if raw.starts_with('\\') {
            strip_trailing_newline(&mut body)?;
            continue;
        }

        if raw == "\n" {
            // Some emitters collapse an all-context blank line to nothing.
            body.push(HunkLine::Context("\n".to_string()));
            source_seen += 1;
            target_seen += 1;
        } else {
            let content = raw[1..].to_string();
            match raw.as_bytes()[0] {
                b' ' => {
                    body.push(HunkLine::Context(content));
                    source_seen += 1;
                    target_seen += 1;
                }
                b'-' => {
                    body.push(HunkLine::Removed(content));
                    source_seen += 1;
                }
                b'+' => {
                    body.push(HunkLine::Added(content));
                    target_seen += 1;
                }
                _ => {
                    return Err(CanvasError::invalid_patch(format!(
                        "unexpected line in hunk body: {}",
                        raw.trim_end()
                    )));
                }
            }
        }

        if source_seen > source_len || target_seen > target_len {
            return Err(CanvasError::invalid_patch(
                "hunk body does not match the counts declared in its header",
            ));
        }
    }

    // A no-newline marker for the final body line sits after the counted
    // lines.
    if lines.get(index).is_some_and(|raw| raw.starts_with('\\')) {
        strip_trailing_newline(&mut body)?;
        index += 1;
    }

    Ok((
        Hunk { source_start, source_len, target_start, target_len, lines: body },
        index,
    ))
}

fn strip_trailing_newline(body: &mut [HunkLine]) -> Result<(), CanvasError> {
    let Some(last) = body.last_mut() else {
        return Err(CanvasError::invalid_patch("`\\` marker with no preceding line"));
    };
    let content = match last {
        HunkLine::Context(content) | HunkLine::Added(content) | HunkLine::Removed(content) => {
            content
        }
    };
    if content.ends_with('\n') {
        content.pop();
    }
    Ok(())
}

fn parse_hunk_header(line: &str) -> Result<(usize, usize, usize, usize), CanvasError> {
    let malformed =
        || CanvasError::invalid_patch(format!("malformed hunk header: {}", line.trim_end()));

    let rest = line.strip_prefix("@@ -").ok_or_else(malformed)?;
    let (source_part, rest) = rest.split_once(" +").ok_or_else(malformed)?;
    let (target_part, _section_heading) = rest.split_once(" @@").ok_or_else(malformed)?;

    let (source_start, source_len) = parse_range(source_part).ok_or_else(malformed)?;
    let (target_start, target_len) = parse_range(target_part).ok_or_else(malformed)?;
    Ok((source_start, source_len, target_start, target_len))
}

fn parse_range(part: &str) -> Option<(usize, usize)> {
    match part.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((part.parse().ok()?, 1)),
    }
}

/// Apply parsed hunks to `content`, returning the new full text.
///
/// Hunks are applied in the order given. The covered slice of the working
/// line array is `[start + shift, start + shift + source_len)` where
/// `start` is the 0-based source index, and after each hunk
/// `shift += replacement_len - source_len`.
pub fn apply(content: &str, patch: &ParsedPatch) -> Result<String, CanvasError> {
    let mut lines: Vec<String> =
        split_keepends(content).into_iter().map(str::to_string).collect();
    let mut shift: isize = 0;

    for hunk in &patch.hunks {
        let base = if hunk.source_len == 0 { hunk.source_start } else { hunk.source_start - 1 };
        let start = base as isize + shift;
        if start < 0 {
            return Err(CanvasError::invalid_patch(format!(
                "hunk at source line {} underflows the file",
                hunk.source_start
            )));
        }
        let start = start as usize;
        let end = start + hunk.source_len;
        if end > lines.len() {
            return Err(CanvasError::invalid_patch(format!(
                "hunk at source line {} does not fit a {}-line file",
                hunk.source_start,
                lines.len()
            )));
        }

        let replacement: Vec<String> = hunk
            .lines
            .iter()
            .filter_map(|line| match line {
                HunkLine::Context(content) | HunkLine::Added(content) => Some(content.clone()),
                HunkLine::Removed(_) => None,
            })
            .collect();

        shift += replacement.len() as isize - hunk.source_len as isize;
        lines.splice(start..end, replacement);
    }

    Ok(lines.concat())
}
