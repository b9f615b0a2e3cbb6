//! Line-oriented unified-diff generation.
//!
//! Lines are compared with their terminators attached so that formatting,
//! including a missing newline on the final line, survives a diff/apply
//! round trip. A line with no terminator is followed in the output by the
//! conventional `\ No newline at end of file` marker.

pub mod patch;

/// Split text into lines, keeping each line's terminator attached.
///
/// `"a\nb"` becomes `["a\n", "b"]`; the empty string becomes no lines.
pub(crate) fn split_keepends(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (index, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            lines.push(&text[start..=index]);
            start = index + 1;
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpTag {
    Equal,
    Delete,
    Insert,
}

/// A run of lines sharing one tag: `[old_start, old_end)` in the old file,
/// `[new_start, new_end)` in the new file. Delete runs have an empty new
/// range and insert runs an empty old range.
#[derive(Clone, Copy, Debug)]
struct OpCode {
    tag: OpTag,
    old_start: usize,
    old_end: usize,
    new_start: usize,
    new_end: usize,
}

/// Render the transformation from `old` to `new` as a unified diff with
/// `context_lines` unchanged lines around each change. Identical inputs
/// produce the empty string.
pub fn unified_diff(
    old: &str,
    new: &str,
    from_label: &str,
    to_label: &str,
    context_lines: usize,
) -> String {
    if old == new {
        return String::new();
    }

    let old_lines = split_keepends(old);
    let new_lines = split_keepends(new);
    let opcodes = diff_opcodes(&old_lines, &new_lines);

    let mut output = String::new();
    output.push_str(&format!("--- {from_label}\n"));
    output.push_str(&format!("+++ {to_label}\n"));

    for group in grouped_opcodes(&opcodes, context_lines) {
        let first = group[0];
        let last = group[group.len() - 1];
        let old_range = format_range(first.old_start, last.old_end);
        let new_range = format_range(first.new_start, last.new_end);
        output.push_str(&format!("@@ -{old_range} +{new_range} @@\n"));

        for code in group {
            match code.tag {
                OpTag::Equal => {
                    for line in &old_lines[code.old_start..code.old_end] {
                        push_body_line(&mut output, ' ', line);
                    }
                }
                OpTag::Delete => {
                    for line in &old_lines[code.old_start..code.old_end] {
                        push_body_line(&mut output, '-', line);
                    }
                }
                OpTag::Insert => {
                    for line in &new_lines[code.new_start..code.new_end] {
                        push_body_line(&mut output, '+', line);
                    }
                }
            }
        }
    }

    output
}

fn push_body_line(output: &mut String, prefix: char, line: &str) {
    output.push(prefix);
    output.push_str(line);
    if !line.ends_with('\n') {
        output.push('\n');
        output.push_str("\\ No newline at end of file\n");
    }
}

/// Hunk range in unified-diff notation: 1-based start plus length, with
/// the length omitted when it is exactly 1 and the start shifted back one
/// line for empty ranges (the insertion-point convention).
fn format_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    if length == 1 {
        return (start + 1).to_string();
    }
    let beginning = if length == 0 { start } else { start + 1 };
    format!("{beginning},{length}")
}

/// Compute maximal same-tag runs transforming `old` into `new`.
///
/// Common prefix and suffix are peeled off first; the remainder goes
/// through a longest-common-subsequence table. On ties the walk prefers
/// deletions, so replaced blocks render as all `-` lines followed by all
/// `+` lines.
fn diff_opcodes(old: &[&str], new: &[&str]) -> Vec<OpCode> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(old_line, new_line)| old_line == new_line)
        .count();

    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(old_line, new_line)| old_line == new_line)
        .count()
        .min(max_suffix);

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut steps: Vec<(OpTag, usize)> = Vec::new();
    if prefix > 0 {
        steps.push((OpTag::Equal, prefix));
    }
    steps.extend(middle_steps(old_mid, new_mid));
    if suffix > 0 {
        steps.push((OpTag::Equal, suffix));
    }

    // Convert (tag, run length) steps into absolute ranges, merging
    // adjacent runs with the same tag.
    let mut opcodes: Vec<OpCode> = Vec::new();
    let mut old_pos = 0;
    let mut new_pos = 0;
    for (tag, count) in steps {
        let (old_advance, new_advance) = match tag {
            OpTag::Equal => (count, count),
            OpTag::Delete => (count, 0),
            OpTag::Insert => (0, count),
        };
        match opcodes.last_mut() {
            Some(last) if last.tag == tag => {
                last.old_end += old_advance;
                last.new_end += new_advance;
            }
            _ => opcodes.push(OpCode {
                tag,
                old_start: old_pos,
                old_end: old_pos + old_advance,
                new_start: new_pos,
                new_end: new_pos + new_advance,
            }),
        }
        old_pos += old_advance;
        new_pos += new_advance;
    }

    opcodes
}

/// Tagged runs for the trimmed middle section, via an LCS length table.
fn middle_steps(old: &[&str], new: &[&str]) -> Vec<(OpTag, usize)> {
    let rows = old.len();
    let cols = new.len();

    if rows == 0 && cols == 0 {
        return Vec::new();
    }
    if rows == 0 {
        return vec![(OpTag::Insert, cols)];
    }
    if cols == 0 {
        return vec![(OpTag::Delete, rows)];
    }

    // lcs[i][j] = LCS length of old[i..] and new[j..], flattened row-major.
    let width = cols + 1;
    let mut lcs = vec![0u32; (rows + 1) * width];
    for i in (0..rows).rev() {
        for j in (0..cols).rev() {
            lcs[i * width + j] = if old[i] == new[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut steps: Vec<(OpTag, usize)> = Vec::new();
    let push = |steps: &mut Vec<(OpTag, usize)>, tag: OpTag| match steps.last_mut() {
        Some((last_tag, count)) if *last_tag == tag => *count += 1,
        _ => steps.push((tag, 1)),
    };

    let mut i = 0;
    let mut j = 0;
    while i < rows && j < cols {
        if old[i] == new[j] {
            push(&mut steps, OpTag::Equal);
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            push(&mut steps, OpTag::Delete);
            i += 1;
        } else {
            push(&mut steps, OpTag::Insert);
            j += 1;
        }
    }
    while i < rows {
        push(&mut steps, OpTag::Delete);
        i += 1;
    }
    while j < cols {
        push(&mut steps, OpTag::Insert);
        j += 1;
    }
    steps
}

/// Cluster opcodes into hunk groups, trimming leading/trailing context to
/// `context` lines and splitting on equal runs longer than `2 * context`.
fn grouped_opcodes(opcodes: &[OpCode], context: usize) -> Vec<Vec<OpCode>> {
    let mut codes: Vec<OpCode> = opcodes.to_vec();
    if codes.is_empty() {
        return Vec::new();
    }

    if let Some(first) = codes.first_mut() {
        if first.tag == OpTag::Equal {
            first.old_start = first.old_end.saturating_sub(context).max(first.old_start);
            first.new_start = first.new_end.saturating_sub(context).max(first.new_start);
        }
    }
    if let Some(last) = codes.last_mut() {
        if last.tag == OpTag::Equal {
            last.old_end = (last.old_start + context).min(last.old_end);
            last.new_end = (last.new_start + context).min(last.new_end);
        }
    }

    let mut groups: Vec<Vec<OpCode>> = Vec::new();
    let mut group: Vec<OpCode> = Vec::new();
    for code in codes {
        if code.tag == OpTag::Equal && code.old_end - code.old_start > 2 * context {
            group.push(OpCode {
                old_end: (code.old_start + context).min(code.old_end),
                new_end: (code.new_start + context).min(code.new_end),
                ..code
            });
            groups.push(group);
            group = vec![OpCode {
                old_start: code.old_end.saturating_sub(context).max(code.old_start),
                new_start: code.new_end.saturating_sub(context).max(code.new_start),
                ..code
            }];
        } else {
            group.push(code);
        }
    }
    let only_equal = group.len() == 1 && group[0].tag == OpTag::Equal;
    if !group.is_empty() && !only_equal {
        groups.push(group);
    }
    groups
}
