use tree_sitter::{Node, Point, Tree};

use crate::document::{DocContext, Document};
use crate::language::{brace_on_next_line, profile, Language};
use crate::parse::{parse_completion, ParseOutcome, ParsedCompletion};
use crate::text::{closing_bracket_for, opening_bracket_for};
use crate::tree::count_error_nodes;

/// Result of structural truncation: the (possibly shortened) insert text,
/// the node that anchored the decision, and how many parse errors remain in
/// the inserted region after truncation.
#[derive(Debug)]
pub struct TruncatedCompletion {
    pub insert_text: String,
    pub node_kind: Option<String>,
    pub error_count: usize,
}

/// Append closers for any opener left unmatched at end-of-scan.
///
/// Unmatched *closers* are left alone (there is no opener to pair them
/// with), which also makes the repair idempotent.
pub fn insert_missing_brackets(text: &str) -> String {
    let mut opening_stack: Vec<char> = Vec::new();

    for c in text.chars() {
        if let Some(opener) = opening_bracket_for(c) {
            if opening_stack.last() == Some(&opener) {
                opening_stack.pop();
            }
        } else if closing_bracket_for(c).is_some() {
            opening_stack.push(c);
        }
    }

    let mut out = text.to_string();
    for opener in opening_stack.into_iter().rev() {
        out.push(closing_bracket_for(opener).unwrap());
    }
    out
}

/// Shrink a parsed completion to the part that belongs to its anchor node.
///
/// The anchor is the widest ancestor still starting on the trigger's row;
/// the kept text is the largest overlap between the anchor's source text
/// (suffix) and the inserted text (prefix). This is what stops the model
/// from duplicating siblings that already exist after the cursor, or from
/// spilling past the enclosing scope.
pub fn truncate_parsed_completion(
    parsed: &ParsedCompletion,
    document: &Document,
    doc_context: &DocContext,
) -> TruncatedCompletion {
    let insert_text = &parsed.insert_text;

    let repaired_full = insert_missing_brackets(&format!(
        "{}{}",
        doc_context.current_line_prefix, insert_text
    ));
    let repaired = &repaired_full[doc_context.current_line_prefix.len()..];

    // Bracket repair changed the text: re-splice and adopt the new tree when
    // one is obtainable, otherwise keep working with the original tree.
    let reparsed = if repaired.len() != insert_text.len() {
        match parse_completion(repaired, document, doc_context) {
            ParseOutcome::Parsed(p) => Some(p),
            ParseOutcome::Raw(_) => None,
        }
    } else {
        None
    };
    let active = reparsed.as_ref().unwrap_or(parsed);

    let start_point = active.points.trigger.unwrap_or(active.points.start);
    let anchor = find_last_ancestor_on_the_same_row(
        &active.tree,
        start_point,
        insert_text,
        document.language,
    );

    let mut result_text = insert_text.clone();
    let mut node_kind = None;
    if let Some(node) = anchor {
        node_kind = Some(node.kind().to_string());
        let node_text = node
            .utf8_text(active.text_with_completion.as_bytes())
            .unwrap_or_default();
        if let Some(overlap) = find_largest_suffix_prefix_overlap(node_text, insert_text.trim()) {
            result_text = overlap;
        }
    }

    let error_count = match parse_completion(&result_text, document, doc_context) {
        ParseOutcome::Parsed(p) => count_error_nodes(&p.tree, p.edit.start_byte, p.edit.new_end_byte),
        ParseOutcome::Raw(_) => 0,
    };

    TruncatedCompletion {
        insert_text: result_text,
        node_kind,
        error_count,
    }
}

/// Widest ancestor of the node at `start_point` that still starts on that
/// node's row. For Allman-brace languages whose completion opens its brace
/// on the following line, a one-row gap is allowed. Never climbs to the
/// tree root.
fn find_last_ancestor_on_the_same_row<'tree>(
    tree: &'tree Tree,
    start_point: Point,
    insert_text: &str,
    language: Language,
) -> Option<Node<'tree>> {
    let root = tree.root_node();
    let initial = root.descendant_for_point_range(start_point, start_point)?;
    let initial_row = initial.start_position().row;
    let allow_previous_row = check_bracket_in_new_line(insert_text, language);

    let mut current = initial;
    while let Some(parent) = current.parent() {
        let parent_row = parent.start_position().row;
        let same_row = parent_row == initial_row;
        let brace_row = allow_previous_row && parent_row + 1 == initial_row;
        if !(same_row || brace_row) || parent.id() == root.id() {
            break;
        }
        current = parent;
    }
    Some(current)
}

/// Longest string that is both a suffix of `left` and a prefix of `right`.
///
/// Scans every length from 1 upward and keeps the last match, so the
/// retained value is the largest matching length.
pub fn find_largest_suffix_prefix_overlap(left: &str, right: &str) -> Option<String> {
    let left_chars: Vec<char> = left.chars().collect();
    let right_chars: Vec<char> = right.chars().collect();
    let max = left_chars.len().min(right_chars.len());

    let mut overlap: Option<String> = None;
    for i in 1..=max {
        let suffix = &left_chars[left_chars.len() - i..];
        let prefix = &right_chars[..i];
        if suffix == prefix {
            overlap = Some(prefix.iter().collect());
        }
    }
    overlap
}

/// First non-blank line of `text`, plus — for Allman-brace languages — the
/// following line when it is nothing but the opening brace.
fn until_non_empty_line_dynamic(text: &str, language: Language) -> String {
    let all: Vec<&str> = text.split('\n').collect();
    let mut result = String::new();
    for (idx, line) in all.iter().enumerate() {
        result.push_str(line);
        result.push('\n');
        if !line.trim().is_empty() {
            if brace_on_next_line(language) {
                if let (Some(config), Some(next)) = (profile(language), all.get(idx + 1)) {
                    if next.trim() == config.block_start {
                        result.push_str(next);
                        result.push('\n');
                    }
                }
            }
            break;
        }
    }
    result.trim_end_matches('\n').to_string()
}

/// Does the completion open its block with a brace on its own line
/// (C/C++/C# Allman style)?
pub fn check_bracket_in_new_line(text: &str, language: Language) -> bool {
    if !brace_on_next_line(language) {
        return false;
    }
    let head = until_non_empty_line_dynamic(text, language);
    let Some(config) = profile(language) else {
        return false;
    };
    head.split('\n')
        .last()
        .map(|l| l.trim() == config.block_start)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{get_current_doc_context, Document};
    use crate::text::Position;

    #[test]
    fn bracket_repair_appends_missing_closers() {
        assert_eq!(insert_missing_brackets("foo(bar"), "foo(bar)");
        assert_eq!(insert_missing_brackets("a[b(c"), "a[b(c)]");
        assert_eq!(insert_missing_brackets("m = {\"k\": [1, 2"), "m = {\"k\": [1, 2]}");
    }

    #[test]
    fn bracket_repair_leaves_unmatched_closers_alone() {
        // No opener to pair with: nothing to repair.
        assert_eq!(insert_missing_brackets("x = 1\n)"), "x = 1\n)");
        assert_eq!(insert_missing_brackets("}"), "}");
    }

    #[test]
    fn bracket_repair_is_idempotent() {
        for text in ["foo(bar", "a[b(c", "x = 1\n)", "balanced()", ""] {
            let once = insert_missing_brackets(text);
            let twice = insert_missing_brackets(&once);
            assert_eq!(once, twice, "repairing {text:?} twice must be a no-op");
        }
    }

    #[test]
    fn overlap_keeps_largest_matching_length() {
        assert_eq!(
            find_largest_suffix_prefix_overlap("def foo():\n    return 1", "return 1\ndef bar():"),
            Some("return 1".to_string())
        );
        assert_eq!(find_largest_suffix_prefix_overlap("abc", "xyz"), None);
        // Repeating pattern: length 1 and length 3 both match; 3 must win.
        assert_eq!(
            find_largest_suffix_prefix_overlap("xabab", "ababc"),
            Some("abab".to_string())
        );
        // Off-by-one probe: full-length overlap.
        assert_eq!(
            find_largest_suffix_prefix_overlap("ab", "ab"),
            Some("ab".to_string())
        );
    }

    #[test]
    fn truncates_completion_that_spills_past_enclosing_function() {
        // Model kept generating a second function after finishing the body.
        let doc = Document::new(
            "u",
            Language::Python,
            "def foo():\n    ",
            "",
            Position::new(1, 4),
        );
        let ctx = get_current_doc_context(&doc);
        let raw = "return 1\ndef bar():\n    return 2";
        let ParseOutcome::Parsed(parsed) = parse_completion(raw, &doc, &ctx) else {
            panic!("expected a tree for python");
        };
        let truncated = truncate_parsed_completion(&parsed, &doc, &ctx);
        assert_eq!(truncated.insert_text, "return 1");
        assert_eq!(truncated.node_kind.as_deref(), Some("function_definition"));
        assert_eq!(truncated.error_count, 0, "kept text must parse cleanly");
    }

    #[test]
    fn unbalanced_completion_gets_repaired_before_anchoring() {
        let doc = Document::new(
            "u",
            Language::Python,
            "def foo():\n    ",
            "",
            Position::new(1, 4),
        );
        let ctx = get_current_doc_context(&doc);
        let raw = "return compute(1, 2";
        let ParseOutcome::Parsed(parsed) = parse_completion(raw, &doc, &ctx) else {
            panic!("expected a tree for python");
        };
        let truncated = truncate_parsed_completion(&parsed, &doc, &ctx);
        // The anchor is found despite the missing ")"; the reported text is
        // still the caller's own (unrepaired) completion or its overlap.
        assert!(truncated.node_kind.is_some());
        assert!(raw.starts_with(truncated.insert_text.trim_end()));
    }

    #[test]
    fn allman_brace_detection() {
        assert!(check_bracket_in_new_line("int f()\n{\n  return 1;\n}", Language::C));
        assert!(!check_bracket_in_new_line("int f() {\n  return 1;\n}", Language::C));
        // Only C-family styles allow the next-line brace.
        assert!(!check_bracket_in_new_line("fn f()\n{\n}", Language::Rust));
    }
}
