use tree_sitter::{InputEdit, Point, Tree};

use crate::document::{DocContext, Document};
use crate::language::node_types;
use crate::text::get_matching_suffix_length;
use crate::tree::TreeAnalyzer;

/// Structurally meaningful positions in the spliced tree.
#[derive(Debug, Clone, Copy)]
pub struct AnchorPoints {
    /// Cursor position (insertion start).
    pub start: Point,
    /// Row/column right after the inserted text.
    pub end: Point,
    /// Multiline trigger position, possibly overridden to the row where the
    /// inserted text begins.
    pub trigger: Option<Point>,
}

/// Byte and row/column extents of the splice, in the shape tree-sitter's
/// `InputEdit` wants them.
#[derive(Debug, Clone, Copy)]
pub struct SpliceEdit {
    pub start_byte: usize,
    pub start_point: Point,
    pub old_end_byte: usize,
    pub old_end_point: Point,
    pub new_end_byte: usize,
    pub new_end_point: Point,
    /// Row/column where the inserted text's first non-newline content lands.
    pub insert_text_position: Point,
}

impl SpliceEdit {
    pub fn as_input_edit(&self) -> InputEdit {
        InputEdit {
            start_byte: self.start_byte,
            old_end_byte: self.old_end_byte,
            new_end_byte: self.new_end_byte,
            start_position: self.start_point,
            old_end_position: self.old_end_point,
            new_end_position: self.new_end_point,
        }
    }
}

/// A completion spliced into its document and re-parsed.
#[derive(Debug)]
pub struct ParsedCompletion {
    pub insert_text: String,
    pub points: AnchorPoints,
    pub tree: Tree,
    pub text_with_completion: String,
    pub edit: SpliceEdit,
}

/// Outcome of [`parse_completion`]: structural data when a tree was
/// obtainable, otherwise the raw text untouched (degraded mode — callers
/// skip structural truncation).
#[derive(Debug)]
pub enum ParseOutcome {
    Raw(String),
    Parsed(ParsedCompletion),
}

/// Splice `insert_text` into the document at the cursor, re-parse
/// incrementally, and locate the anchor points.
///
/// The splice removes as many suffix characters as the completion consumes
/// (greedy suffix match), so the model re-emitting a closing token never
/// yields a doubled token in the spliced text.
pub fn parse_completion(
    insert_text: &str,
    document: &Document,
    doc_context: &DocContext,
) -> ParseOutcome {
    let raw = || ParseOutcome::Raw(insert_text.to_string());

    let Some(mut analyzer) = TreeAnalyzer::new(document.language) else {
        return raw();
    };

    let matching_chars =
        get_matching_suffix_length(insert_text, &doc_context.current_line_suffix);
    let removed_bytes: usize = doc_context
        .current_line_suffix
        .chars()
        .take(matching_chars)
        .map(|c| c.len_utf8())
        .sum();

    let spliced_insert = format!("{}{}", doc_context.injected_completion_text, insert_text);
    let (text_with_completion, edit) = splice_insert_text(
        &document.text,
        document.offset,
        removed_bytes,
        &spliced_insert,
    );

    // Parse the original text, shift its offsets, then let the incremental
    // parser reuse everything outside the splice.
    let Some(mut base_tree) = analyzer.safe_parse(&document.text, None) else {
        return raw();
    };
    TreeAnalyzer::edit(&mut base_tree, &edit.as_input_edit());
    let Some(tree) = analyzer.safe_parse(&text_with_completion, Some(&base_tree)) else {
        return raw();
    };

    let mut points = AnchorPoints {
        start: edit.start_point,
        end: edit.new_end_point,
        trigger: doc_context.multiline_trigger_position.map(|p| Point {
            row: p.line as usize,
            column: p.character as usize,
        }),
    };

    // If the completion begins a comment or a whole function/method on the
    // trigger's row, the structural unit of interest starts where the
    // inserted text starts, not at the original trigger.
    if let Some(types) = node_types(document.language) {
        let new_point = Point {
            row: edit.insert_text_position.row,
            column: points.start.column,
        };
        if let Some(mut node) = tree
            .root_node()
            .descendant_for_point_range(new_point, new_point)
        {
            if node.kind() == types.comment {
                points.trigger = Some(new_point);
            }
            while let Some(parent) = node.parent() {
                if parent.start_position().row != new_point.row {
                    break;
                }
                node = parent;
            }
            if node.kind() == types.method {
                points.trigger = Some(new_point);
            }
        }
    }

    ParseOutcome::Parsed(ParsedCompletion {
        insert_text: insert_text.to_string(),
        points,
        tree,
        text_with_completion,
        edit,
    })
}

/// Remove `length_removed` bytes at `start_index` and insert `insert_text`,
/// computing all edit extents with a newline-counting scan.
pub fn splice_insert_text(
    current_text: &str,
    start_index: usize,
    length_removed: usize,
    insert_text: &str,
) -> (String, SpliceEdit) {
    let old_end_index = start_index + length_removed;
    let new_end_index = start_index + insert_text.len();

    let start_point = get_extent(&current_text[..start_index]);
    let old_end_point = get_extent(&current_text[..old_end_index]);

    let text_with_completion = format!(
        "{}{}{}",
        &current_text[..start_index],
        insert_text,
        &current_text[old_end_index..]
    );
    let new_end_point = get_extent(&text_with_completion[..new_end_index]);

    let insert_text_position = Point {
        row: start_point.row + count_leading_newlines(insert_text),
        column: start_point.column,
    };

    (
        text_with_completion,
        SpliceEdit {
            start_byte: start_index,
            start_point,
            old_end_byte: old_end_index,
            old_end_point,
            new_end_byte: new_end_index,
            new_end_point,
            insert_text_position,
        },
    )
}

/// Row/column reached at the end of `text` (column in bytes, as tree-sitter
/// points want it).
fn get_extent(text: &str) -> Point {
    let row = text.matches('\n').count();
    let column = match text.rfind('\n') {
        Some(idx) => text.len() - idx - 1,
        None => text.len(),
    };
    Point { row, column }
}

fn count_leading_newlines(text: &str) -> usize {
    text.chars().take_while(|c| *c == '\n').count()
}
