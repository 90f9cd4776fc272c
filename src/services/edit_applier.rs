//! Applies batches of text edits to files on disk.
//!
//! Edits for one file are spliced from the end of the document backward, so
//! applying one edit never moves the coordinates of the edits still pending
//! before it. Edits within a file must not overlap; overlapping edits give
//! unspecified results.
//!
//! Files are independent: a missing or unreadable file is logged and skipped
//! without aborting the rest of the batch.

use std::cmp::Reverse;

use serde::Serialize;

use crate::models::lsp::{FileEditSet, Position, TextEdit, uri_to_path};

/// Outcome of applying a [`FileEditSet`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub changed_files: Vec<String>,
    pub total_changes: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_files: Vec<String>,
}

/// Byte offset of `(line, character)` in the text whose `\n`-separated lines
/// are `lines`.
///
/// The offset is the length of every preceding line plus one separator per
/// preceding line, plus `character` clamped to the target line. `character`
/// counts UTF-16 code units and is converted to bytes on the target line.
/// Positions past the last line clamp to the end of the text.
pub fn position_offset(lines: &[&str], line: u32, character: u32) -> usize {
    let line = line as usize;
    let Some(target) = lines.get(line) else {
        return text_len(lines);
    };

    let preceding: usize = lines[..line].iter().map(|l| l.len() + 1).sum();
    preceding + utf16_to_byte_offset(target, character)
}

fn text_len(lines: &[&str]) -> usize {
    lines.iter().map(|l| l.len()).sum::<usize>() + lines.len().saturating_sub(1)
}

/// Byte index within `line` after `units` UTF-16 code units, clamped to the
/// line length. A position inside a surrogate pair rounds down to the start
/// of that character.
fn utf16_to_byte_offset(line: &str, units: u32) -> usize {
    let units = units as usize;
    let mut consumed = 0;
    for (idx, ch) in line.char_indices() {
        if consumed + ch.len_utf16() > units {
            return idx;
        }
        consumed += ch.len_utf16();
    }
    line.len()
}

fn offset_of(content: &str, position: Position) -> usize {
    let lines: Vec<&str> = content.split('\n').collect();
    position_offset(&lines, position.line, position.character)
}

/// Apply `edits` to `content`, returning the new text and the number of
/// edits spliced.
pub fn apply_edits(content: &str, edits: &[TextEdit]) -> (String, usize) {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    // Stable: edits sharing a start keep their given order
    ordered.sort_by_key(|edit| Reverse(edit.range.start));

    let mut text = content.to_string();
    let mut applied = 0;
    for edit in ordered {
        let start = offset_of(&text, edit.range.start);
        let end = offset_of(&text, edit.range.end).max(start);
        text.replace_range(start..end, &edit.new_text);
        applied += 1;
    }
    (text, applied)
}

/// Apply every file's edits and write back the files whose content changed.
pub async fn apply_file_edit_set(edit_set: &FileEditSet) -> ApplyResult {
    let mut result = ApplyResult::default();

    if edit_set.is_empty() {
        tracing::warn!("No changes to apply");
        return result;
    }

    for (file_id, edits) in edit_set.iter() {
        let path = uri_to_path(file_id);
        let shown = path.display().to_string();

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::warn!("Skipping edits for missing file: {}", shown);
            result.skipped_files.push(shown);
            continue;
        }

        let original = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Failed to read {}: {}", shown, e);
                result.skipped_files.push(shown);
                continue;
            }
        };

        let (updated, applied) = apply_edits(&original, edits);

        if updated != original {
            if let Err(e) = tokio::fs::write(&path, &updated).await {
                tracing::error!("Failed to write {}: {}", shown, e);
                result.skipped_files.push(shown);
                continue;
            }
            tracing::debug!("Applied {} edits to {}", applied, shown);
            result.changed_files.push(shown);
        }
        result.total_changes += applied;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lsp::{Range, path_to_uri};
    use tempfile::TempDir;

    fn edit(sl: u32, sc: u32, el: u32, ec: u32, text: &str) -> TextEdit {
        TextEdit::new(
            Range::new(Position::new(sl, sc), Position::new(el, ec)),
            text,
        )
    }

    /// Single-pass reference: splice all edits in ascending order while
    /// tracking the shift they introduce.
    fn splice_forward(content: &str, edits: &[TextEdit]) -> String {
        let lines: Vec<&str> = content.split('\n').collect();
        let mut spans: Vec<(usize, usize, &str)> = edits
            .iter()
            .map(|e| {
                let s = position_offset(&lines, e.range.start.line, e.range.start.character);
                let t = position_offset(&lines, e.range.end.line, e.range.end.character);
                (s, t.max(s), e.new_text.as_str())
            })
            .collect();
        spans.sort_by_key(|(s, _, _)| *s);

        let mut out = String::new();
        let mut cursor = 0;
        for (s, t, text) in spans {
            out.push_str(&content[cursor..s]);
            out.push_str(text);
            cursor = t;
        }
        out.push_str(&content[cursor..]);
        out
    }

    #[test]
    fn test_offset_formula() {
        let lines = vec!["abc", "", "defgh", "ij"];
        assert_eq!(position_offset(&lines, 0, 0), 0);
        assert_eq!(position_offset(&lines, 0, 2), 2);
        assert_eq!(position_offset(&lines, 1, 0), 4);
        assert_eq!(position_offset(&lines, 2, 3), 3 + 1 + 0 + 1 + 3);
        assert_eq!(position_offset(&lines, 3, 1), 3 + 1 + 0 + 1 + 5 + 1 + 1);
    }

    #[test]
    fn test_offset_clamps_character_to_line() {
        let lines = vec!["abc", "de"];
        assert_eq!(position_offset(&lines, 0, 99), 3);
        assert_eq!(position_offset(&lines, 1, 99), 6);
    }

    #[test]
    fn test_offset_every_in_bounds_position() {
        let content = "fn main() {\n    let x = 1;\n\n}\n";
        let lines: Vec<&str> = content.split('\n').collect();
        for (line_idx, line) in lines.iter().enumerate() {
            for character in 0..=(line.len() as u32 + 2) {
                let expected: usize = lines[..line_idx].iter().map(|l| l.len()).sum::<usize>()
                    + line_idx
                    + (character as usize).min(line.len());
                assert_eq!(
                    position_offset(&lines, line_idx as u32, character),
                    expected
                );
            }
        }
    }

    #[test]
    fn test_offset_past_last_line_clamps_to_end() {
        let lines = vec!["abc", "def"];
        assert_eq!(position_offset(&lines, 5, 0), 7);
    }

    #[test]
    fn test_offset_counts_utf16_units() {
        // 'é' is 1 UTF-16 unit / 2 bytes; '😀' is 2 units / 4 bytes
        let lines = vec!["é😀x"];
        assert_eq!(position_offset(&lines, 0, 1), 2);
        assert_eq!(position_offset(&lines, 0, 3), 6);
        assert_eq!(position_offset(&lines, 0, 4), 7);
        // Inside the surrogate pair rounds down
        assert_eq!(position_offset(&lines, 0, 2), 2);
    }

    #[test]
    fn test_single_edit() {
        let (out, n) = apply_edits("abc\ndef\nghi", &[edit(0, 1, 0, 2, "X")]);
        assert_eq!(out, "aXc\ndef\nghi");
        assert_eq!(n, 1);
    }

    #[test]
    fn test_two_edits_applied_from_the_end() {
        let edits = vec![edit(0, 0, 0, 3, "AAA"), edit(2, 0, 2, 3, "BBB")];
        let (out, n) = apply_edits("abc\ndef\nghi", &edits);
        assert_eq!(out, "AAA\ndef\nBBB");
        assert_eq!(n, 2);
    }

    #[test]
    fn test_line_changing_edits_do_not_shift_earlier_ones() {
        let content = "one\ntwo\nthree\nfour";
        let edits = vec![
            edit(0, 0, 0, 3, "ONE\nONE-AND-A-HALF"),
            edit(1, 0, 2, 5, "merged"),
            edit(3, 4, 3, 4, "!\nfive"),
        ];
        let (out, n) = apply_edits(content, &edits);
        assert_eq!(out, "ONE\nONE-AND-A-HALF\nmerged\nfour!\nfive");
        assert_eq!(n, 3);
        assert_eq!(out, splice_forward(content, &edits));
    }

    #[test]
    fn test_reverse_order_matches_single_pass_splice() {
        let content = "alpha beta\ngamma\n\ndelta epsilon zeta\nη θ ι";
        let sets: Vec<Vec<TextEdit>> = vec![
            vec![edit(0, 6, 0, 10, "B"), edit(3, 0, 3, 5, "D"), edit(4, 2, 4, 3, "Θ")],
            vec![edit(4, 0, 4, 1, "eta"), edit(0, 0, 0, 0, "// head\n")],
            vec![edit(1, 0, 3, 0, ""), edit(0, 5, 0, 6, "_")],
            vec![edit(3, 14, 3, 18, "ZETA\nomega"), edit(2, 0, 2, 0, "inserted")],
        ];
        for edits in &sets {
            let mut shuffled = edits.clone();
            shuffled.reverse();
            let (forward_input, _) = apply_edits(content, edits);
            let (reversed_input, _) = apply_edits(content, &shuffled);
            let reference = splice_forward(content, edits);
            assert_eq!(forward_input, reference);
            assert_eq!(reversed_input, reference);
        }
    }

    #[test]
    fn test_inverted_range_is_an_insertion() {
        let (out, _) = apply_edits("abcdef", &[edit(0, 4, 0, 2, "_")]);
        assert_eq!(out, "abcd_ef");
    }

    #[test]
    fn test_crlf_content_preserved() {
        let (out, _) = apply_edits("let a;\r\nlet b;\r\n", &[edit(1, 4, 1, 5, "c")]);
        assert_eq!(out, "let a;\r\nlet c;\r\n");
    }

    #[tokio::test]
    async fn test_empty_edit_set_changes_nothing() {
        let result = apply_file_edit_set(&FileEditSet::new()).await;
        assert_eq!(result.total_changes, 0);
        assert!(result.changed_files.is_empty());
    }

    #[tokio::test]
    async fn test_applies_to_disk_and_skips_missing() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.ts");
        let b = dir.path().join("b.ts");
        tokio::fs::write(&a, "abc\ndef\nghi").await.unwrap();
        tokio::fs::write(&b, "const x = 1;\n").await.unwrap();

        let mut set = FileEditSet::new();
        set.push(path_to_uri(&a), edit(0, 1, 0, 2, "X"));
        set.push(path_to_uri(&a), edit(2, 0, 2, 3, "GHI"));
        // Scheme-stripped identifier, edit that leaves content unchanged
        set.push(b.display().to_string(), edit(0, 6, 0, 7, "x"));
        set.push(path_to_uri(&dir.path().join("gone.ts")), edit(0, 0, 0, 0, "x"));

        let result = apply_file_edit_set(&set).await;

        assert_eq!(
            tokio::fs::read_to_string(&a).await.unwrap(),
            "aXc\ndef\nGHI"
        );
        assert_eq!(result.changed_files, vec![a.display().to_string()]);
        assert_eq!(result.total_changes, 3);
        assert_eq!(result.skipped_files.len(), 1);
        assert!(result.skipped_files[0].ends_with("gone.ts"));
    }
}
