use serde::{Deserialize, Serialize};

use crate::language::Language;
use crate::multiline::detect_multiline;
use crate::text::{
    get_first_line, get_last_line, get_matching_suffix_length, get_next_non_empty_line,
    get_prev_non_empty_line, position_after_insertion, Position,
};

/// Immutable snapshot of a source file split at the cursor.
///
/// Invariant: `prefix + suffix == text` and `offset == prefix.len()` (bytes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub uri: String,
    pub language: Language,
    pub text: String,
    pub prefix: String,
    pub suffix: String,
    pub offset: usize,
    pub position: Position,
}

impl Document {
    pub fn new(
        uri: impl Into<String>,
        language: Language,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
        position: Position,
    ) -> Self {
        let prefix = prefix.into();
        let suffix = suffix.into();
        let offset = prefix.len();
        Self {
            uri: uri.into(),
            language,
            text: format!("{prefix}{suffix}"),
            prefix,
            suffix,
            offset,
            position,
        }
    }

    /// Build a document from full text and a cursor, deriving the split.
    pub fn from_text_at(
        uri: impl Into<String>,
        language: Language,
        text: &str,
        position: Position,
    ) -> Self {
        let offset = byte_offset_at(text, position);
        Self::new(uri, language, &text[..offset], &text[offset..], position)
    }
}

/// Byte offset of a (line, character) position inside `text`.
fn byte_offset_at(text: &str, position: Position) -> usize {
    let mut offset = 0;
    for (i, line) in text.split('\n').enumerate() {
        if i as u32 == position.line {
            let within: usize = line
                .chars()
                .take(position.character as usize)
                .map(|c| c.len_utf8())
                .sum();
            return offset + within;
        }
        offset += line.len() + 1;
    }
    text.len()
}

/// Point-in-time view of a document relative to a cursor.
///
/// Never mutated: a fresh context is derived after every text insertion,
/// with the cursor shifted by the inserted text's line/column delta.
#[derive(Debug, Clone)]
pub struct DocContext {
    pub prefix: String,
    pub suffix: String,
    pub current_line_prefix: String,
    pub current_line_suffix: String,
    pub prev_non_empty_line: String,
    pub next_non_empty_line: String,
    pub position: Position,
    pub multiline_trigger: Option<String>,
    pub multiline_trigger_position: Option<Position>,
    /// Already-accepted completion fragment to splice ahead of new text.
    pub injected_completion_text: String,
}

pub fn get_current_doc_context(document: &Document) -> DocContext {
    derive_doc_context(
        &document.prefix,
        &document.suffix,
        document.language,
        document.position,
    )
}

/// Re-derive the context after inserting `insert_text` at the cursor.
///
/// The suffix loses the characters the insertion consumed (per the greedy
/// suffix match), mirroring what the editor would show once the completion
/// is accepted.
pub fn insert_into_doc_context(
    doc_context: &DocContext,
    insert_text: &str,
    language: Language,
) -> DocContext {
    let updated_position = position_after_insertion(doc_context.position, insert_text);
    let consumed = get_matching_suffix_length(insert_text, &doc_context.current_line_suffix);
    let consumed_bytes: usize = doc_context
        .suffix
        .chars()
        .take(consumed)
        .map(|c| c.len_utf8())
        .sum();

    derive_doc_context(
        &format!("{}{}", doc_context.prefix, insert_text),
        &doc_context.suffix[consumed_bytes..],
        language,
        updated_position,
    )
}

fn derive_doc_context(
    prefix: &str,
    suffix: &str,
    language: Language,
    position: Position,
) -> DocContext {
    let mut ctx = DocContext {
        prefix: prefix.to_string(),
        suffix: suffix.to_string(),
        current_line_prefix: get_last_line(prefix).to_string(),
        current_line_suffix: get_first_line(suffix).to_string(),
        prev_non_empty_line: get_prev_non_empty_line(prefix).to_string(),
        next_non_empty_line: get_next_non_empty_line(suffix).to_string(),
        position,
        multiline_trigger: None,
        multiline_trigger_position: None,
        injected_completion_text: String::new(),
    };

    let (trigger, trigger_position) = detect_multiline(&ctx, language, position);
    ctx.multiline_trigger = trigger;
    ctx.multiline_trigger_position = trigger_position;
    ctx
}
