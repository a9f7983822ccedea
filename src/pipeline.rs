use serde::Serialize;

use crate::document::{DocContext, Document};
use crate::parse::{parse_completion, ParseOutcome};
use crate::trim::{fix_bad_completion_start, process_completion};
use crate::truncate::truncate_parsed_completion;

/// Final shape of one completion after the tree-based and line-based passes.
#[derive(Debug, Clone, Serialize)]
pub struct ShapedCompletion {
    pub insert_text: String,
    /// Kind of the anchor node the truncator used, when structural
    /// truncation ran and found one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_kind: Option<String>,
    /// Error/missing nodes remaining in the inserted region.
    pub error_count: usize,
    /// False when no parse tree was obtainable and the pipeline degraded to
    /// text-only processing.
    pub structural: bool,
}

/// Tree-based half of the pipeline: splice, re-parse, truncate.
///
/// Degrades silently: an unparsable document or unsupported language yields
/// the right-trimmed completion with `structural: false`, never an error.
pub fn parse_and_truncate_completion(
    completion: &str,
    document: &Document,
    doc_context: &DocContext,
    multiline: bool,
) -> ShapedCompletion {
    let insert_text = completion.trim_end();

    if insert_text.is_empty() {
        return ShapedCompletion {
            insert_text: String::new(),
            node_kind: None,
            error_count: 0,
            structural: false,
        };
    }

    match parse_completion(insert_text, document, doc_context) {
        ParseOutcome::Raw(text) => ShapedCompletion {
            insert_text: text,
            node_kind: None,
            error_count: 0,
            structural: false,
        },
        ParseOutcome::Parsed(parsed) => {
            if multiline {
                let truncated = truncate_parsed_completion(&parsed, document, doc_context);
                ShapedCompletion {
                    insert_text: truncated.insert_text,
                    node_kind: truncated.node_kind,
                    error_count: truncated.error_count,
                    structural: true,
                }
            } else {
                ShapedCompletion {
                    insert_text: parsed.insert_text,
                    node_kind: None,
                    error_count: 0,
                    structural: true,
                }
            }
        }
    }
}

/// Full pipeline: noise strip, tree-based truncation, then the line-level
/// trimmer. The two passes are complementary and idempotent in combination.
pub fn shape_completion(
    completion: &str,
    document: &Document,
    doc_context: &DocContext,
    multiline: bool,
) -> ShapedCompletion {
    let cleaned = fix_bad_completion_start(completion);
    let mut shaped = parse_and_truncate_completion(&cleaned, document, doc_context, multiline);
    shaped.insert_text = process_completion(&shaped.insert_text, document, doc_context, multiline);
    shaped
}
