// src/prompts/extract.rs — Parse oracle replies into edit batches
//
// Two output modes. Full-rewrite: the oracle names a file, then gives its
// complete new content in a fenced block (deletions are not allowed in this
// mode). Patch: the oracle emits unified diffs which are applied against the
// current workspace content here, so the batch always carries full file text.

use std::collections::BTreeMap;

use crate::core::types::EditBatch;
use crate::infra::errors::PipefixError;

/// Marker some models emit to request a file deletion. Deletions are
/// disallowed in the full-rewrite spec, so such entries are dropped.
const DELETE_MARKER: &str = "__DEL__";

/// Parse a full-rewrite reply: a sequence of `path` lines each followed by a
/// fenced code block with the file's complete new content.
pub fn extract_full_rewrite(reply: &str) -> Result<EditBatch, PipefixError> {
    let mut batch = EditBatch::new();
    let mut pending_path: Option<String> = None;
    let mut in_block = false;
    let mut block: Vec<&str> = Vec::new();

    for line in reply.lines() {
        if line.trim_start().starts_with("```") {
            if in_block {
                // Closing fence: commit the block to the pending path.
                if let Some(path) = pending_path.take() {
                    let content = block.join("\n");
                    if content.trim() == DELETE_MARKER {
                        tracing::warn!(path, "oracle requested a deletion, dropping (not allowed)");
                    } else {
                        batch.insert(path, ensure_trailing_newline(content));
                    }
                }
                block.clear();
                in_block = false;
            } else {
                in_block = true;
            }
            continue;
        }

        if in_block {
            block.push(line);
        } else {
            let candidate = clean_path_line(line);
            if !candidate.is_empty() {
                pending_path = Some(candidate);
            }
        }
    }

    if batch.is_empty() {
        return Err(PipefixError::Extract(
            "no file blocks found in reply".into(),
        ));
    }
    Ok(batch)
}

/// Parse a unified-diff reply and apply each file's hunks against the current
/// workspace content, producing full patched text per path.
pub fn extract_patch(
    reply: &str,
    files: &BTreeMap<String, String>,
) -> Result<EditBatch, PipefixError> {
    let mut batch = EditBatch::new();

    for file_diff in split_file_diffs(reply) {
        let original = files.get(&file_diff.path).map(String::as_str).unwrap_or("");
        let patched = apply_hunks(original, &file_diff.hunks)?;
        batch.insert(file_diff.path, patched);
    }

    if batch.is_empty() {
        return Err(PipefixError::Extract("no diffs found in reply".into()));
    }
    Ok(batch)
}

/// Strip decoration from a line that should carry a file path.
fn clean_path_line(line: &str) -> String {
    let cleaned = line
        .trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('*')
        .trim_matches('`')
        .trim_end_matches(':')
        .trim();
    // A path has no spaces and at least one dot or slash.
    if cleaned.is_empty()
        || cleaned.contains(char::is_whitespace)
        || !(cleaned.contains('.') || cleaned.contains('/'))
    {
        return String::new();
    }
    cleaned.to_string()
}

fn ensure_trailing_newline(mut s: String) -> String {
    if !s.is_empty() && !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

struct FileDiff {
    path: String,
    hunks: Vec<Hunk>,
}

struct Hunk {
    old_start: usize,
    lines: Vec<HunkLine>,
}

enum HunkLine {
    Context(String),
    Remove(String),
    Add(String),
}

/// Split a reply into per-file diffs. Fence lines are ignored so diffs may be
/// wrapped in ```diff blocks.
fn split_file_diffs(reply: &str) -> Vec<FileDiff> {
    let mut diffs: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;

    for line in reply.lines() {
        if line.trim_start().starts_with("```") {
            continue;
        }
        if let Some(rest) = line.strip_prefix("--- ") {
            // A new file section starts. `+++` carries the authoritative path.
            let _ = rest;
            if let Some(d) = current.take() {
                diffs.push(d);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("+++ ") {
            let path = rest
                .trim()
                .trim_start_matches("b/")
                .trim_start_matches("a/")
                .to_string();
            current = Some(FileDiff {
                path,
                hunks: Vec::new(),
            });
            continue;
        }
        if let Some(header) = line.strip_prefix("@@") {
            if let Some(d) = current.as_mut() {
                let old_start = parse_old_start(header);
                d.hunks.push(Hunk {
                    old_start,
                    lines: Vec::new(),
                });
            }
            continue;
        }
        if let Some(d) = current.as_mut() {
            if let Some(hunk) = d.hunks.last_mut() {
                if let Some(text) = line.strip_prefix('+') {
                    hunk.lines.push(HunkLine::Add(text.to_string()));
                } else if let Some(text) = line.strip_prefix('-') {
                    hunk.lines.push(HunkLine::Remove(text.to_string()));
                } else if let Some(text) = line.strip_prefix(' ') {
                    hunk.lines.push(HunkLine::Context(text.to_string()));
                } else if line.is_empty() {
                    hunk.lines.push(HunkLine::Context(String::new()));
                }
            }
        }
    }
    if let Some(d) = current.take() {
        diffs.push(d);
    }
    diffs.retain(|d| !d.hunks.is_empty());
    diffs
}

/// Parse the old-file start line out of `@@ -l,n +l,n @@`.
fn parse_old_start(header: &str) -> usize {
    header
        .split_whitespace()
        .find_map(|tok| tok.strip_prefix('-'))
        .and_then(|range| range.split(',').next())
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(1)
}

/// Apply hunks in order against the original content.
///
/// Each hunk's old block (context + removed lines) must be found in the
/// original at or after the previous hunk's end; the stated start line is a
/// hint, not a requirement, since oracle line numbers drift.
fn apply_hunks(original: &str, hunks: &[Hunk]) -> Result<String, PipefixError> {
    let had_trailing_newline = original.ends_with('\n') || original.is_empty();
    let lines: Vec<&str> = original.lines().collect();
    let mut out: Vec<String> = Vec::new();
    let mut cursor = 0usize;

    for hunk in hunks {
        let old_block: Vec<&str> = hunk
            .lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Remove(s) => Some(s.as_str()),
                HunkLine::Add(_) => None,
            })
            .collect();

        let at = if old_block.is_empty() {
            // Pure insertion: honor the stated position.
            hunk.old_start.saturating_sub(1).min(lines.len()).max(cursor)
        } else {
            find_block(&lines, cursor, &old_block, hunk.old_start)?
        };

        out.extend(lines[cursor..at].iter().map(|s| s.to_string()));
        for l in &hunk.lines {
            match l {
                HunkLine::Context(s) => out.push(s.clone()),
                HunkLine::Add(s) => out.push(s.clone()),
                HunkLine::Remove(_) => {}
            }
        }
        cursor = at + old_block.len();
    }

    out.extend(lines[cursor..].iter().map(|s| s.to_string()));
    let mut result = out.join("\n");
    if had_trailing_newline && !result.is_empty() {
        result.push('\n');
    }
    Ok(result)
}

fn find_block(
    lines: &[&str],
    cursor: usize,
    block: &[&str],
    hint: usize,
) -> Result<usize, PipefixError> {
    let matches_at = |at: usize| -> bool {
        at >= cursor
            && at + block.len() <= lines.len()
            && block.iter().zip(&lines[at..]).all(|(b, l)| b == l)
    };

    let hinted = hint.saturating_sub(1);
    if matches_at(hinted) {
        return Ok(hinted);
    }
    (cursor..=lines.len().saturating_sub(block.len()))
        .find(|&at| matches_at(at))
        .ok_or_else(|| PipefixError::Extract("diff hunk does not match current file content".into()))
}
