use regex::Regex;
use std::sync::OnceLock;

use crate::document::{DocContext, Document};
use crate::language::{profile, Language};
use crate::text::{
    get_first_non_empty_line, indentation, remove_trailing_whitespace, DEFAULT_TAB_SIZE,
};

fn bad_completion_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([\u{1F300}-\u{1FAFF}]|\u{200B}|\+ |- |\. )+\s+").unwrap()
    })
}

/// Strip emoji / zero-width / list-bullet noise some models emit before the
/// actual code.
pub fn fix_bad_completion_start(completion: &str) -> String {
    bad_completion_start().replace(completion, "").into_owned()
}

/// Cut the completion once it starts duplicating the upcoming suffix.
///
/// Lines are scanned from the bottom up; the first line of the completion is
/// measured with the prefix's trailing partial line prepended (it continues
/// that line). Two cuts apply:
/// - a lone block-end line at the starting indentation when the completion
///   began on a blank line (the suffix will supply the real block end), and
/// - any line the first non-empty suffix line already starts with, at
///   suffix indentation or shallower.
pub fn trim_until_suffix(insertion: &str, prefix: &str, suffix: &str, language: Language) -> String {
    let config = profile(language);
    let insertion = insertion.trim_end();

    let first_non_empty_suffix_line = get_first_non_empty_line(suffix);
    if first_non_empty_suffix_line.is_empty() {
        return insertion.to_string();
    }

    let prefix_tail = match prefix.rfind('\n') {
        Some(idx) => &prefix[idx + 1..],
        None => prefix,
    };
    let suffix_indent = indentation(first_non_empty_suffix_line, DEFAULT_TAB_SIZE);
    let start_indent = indentation(prefix_tail, DEFAULT_TAB_SIZE);
    let has_empty_completion_line = prefix_tail.trim().is_empty();

    let insertion_lines: Vec<&str> = insertion.split('\n').collect();
    let mut cut_off_index = insertion_lines.len();

    for i in (0..insertion_lines.len()).rev() {
        if insertion_lines[i].is_empty() {
            continue;
        }

        let line = if i == 0 {
            format!("{}{}", prefix_tail, insertion_lines[i])
        } else {
            insertion_lines[i].to_string()
        };

        let line_indentation = indentation(&line, DEFAULT_TAB_SIZE);
        let is_same_indentation = line_indentation <= suffix_indent;

        let is_lone_block_end = has_empty_completion_line
            && insertion_lines.len() == 1
            && config
                .and_then(|c| c.block_end)
                .map(|end| line.trim().starts_with(end))
                .unwrap_or(false)
            && start_indent == line_indentation;

        if is_lone_block_end
            || (is_same_indentation && first_non_empty_suffix_line.starts_with(&line))
        {
            cut_off_index = i;
            break;
        }
    }

    insertion_lines[..cut_off_index].join("\n")
}

/// When the prefix already ends in horizontal whitespace, drop any leading
/// whitespace the completion duplicates.
pub fn collapse_duplicative_whitespace(prefix: &str, completion: &str) -> String {
    if prefix.ends_with(' ') || prefix.ends_with('\t') {
        completion.trim_start_matches([' ', '\t']).to_string()
    } else {
        completion.to_string()
    }
}

/// Line-level normalization pass: trailing-whitespace strip, suffix
/// deduplication, whitespace collapse, final right-trim. Purely textual —
/// runs with or without a parse tree, and is a no-op on its own output.
pub fn process_completion(
    insert_text: &str,
    document: &Document,
    doc_context: &DocContext,
    multiline: bool,
) -> String {
    if insert_text.is_empty() {
        return insert_text.to_string();
    }

    let mut text = insert_text.to_string();
    if multiline {
        text = remove_trailing_whitespace(&text);
    }
    text = trim_until_suffix(&text, &doc_context.prefix, &doc_context.suffix, document.language);
    text = collapse_duplicative_whitespace(&doc_context.prefix, &text);
    text.trim_end().to_string()
}
