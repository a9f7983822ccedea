use regex::Regex;
use std::sync::OnceLock;

use crate::document::DocContext;
use crate::language::{profile, supports_multiline, Language};
use crate::text::{get_last_line, indentation, lines, Position, DEFAULT_TAB_SIZE};

fn function_keywords() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(function|def|fn|fun)").unwrap())
}

fn function_or_method_invocation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[^()]+\((.*)\)$").unwrap())
}

fn opening_bracket_at_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([(\[{])$").unwrap())
}

/// Decide whether the completion at `position` should produce a multi-line
/// block, and if so which token triggered it and where that token sits.
///
/// Detectors run in order, first match wins:
/// 1. call-expression suppression (never expand inside `foo(...)` lines),
/// 2. start of an empty block (`prefix` ends with the block-start token),
/// 3. open bracket at the end of the prefix,
/// 4. start of a non-empty block (next line is the block end; walk the
///    prefix backwards for the matching block start).
pub fn detect_multiline(
    ctx: &DocContext,
    language: Language,
    position: Position,
) -> (Option<String>, Option<Position>) {
    let current_line_prefix = &ctx.current_line_prefix;
    let current_line_suffix = &ctx.current_line_suffix;

    // The current line as the model sees it once the suffix remainder is
    // folded in. Suffix first: a trailing `)` must land at line end so the
    // invocation pattern can anchor on it.
    let current_line_text = if !current_line_suffix.trim().is_empty() {
        format!("{}{}", current_line_suffix.trim(), current_line_prefix)
    } else {
        current_line_prefix.clone()
    };

    let is_invocation = !function_keywords().is_match(current_line_prefix.trim())
        && function_or_method_invocation().is_match(&current_line_text);

    if is_invocation || !supports_multiline(language) {
        return (None, None);
    }

    if let Some(result) = detect_start_empty_block(ctx, language, position) {
        return result;
    }
    if let Some(result) = detect_open_bracket(ctx, position) {
        return result;
    }
    if let Some(result) = detect_start_non_empty_block(ctx, language, position) {
        return result;
    }

    (None, None)
}

fn ends_with_block_start(text: &str, language: Language) -> Option<&'static str> {
    let config = profile(language)?;
    text.trim_end()
        .ends_with(config.block_start)
        .then_some(config.block_start)
}

fn starts_with_block_end(text: &str, language: Language) -> Option<&'static str> {
    let config = profile(language)?;
    let block_end = config.block_end?;
    text.trim_start().starts_with(block_end).then_some(block_end)
}

/// Both positional shapes share the same indentation tests: either the
/// cursor line carries text and is indented at least as deep as the next
/// non-empty line, or the cursor sits on a blank line indented deeper than
/// the previous non-empty line which itself is at least as deep as the next.
fn positional_conditions(ctx: &DocContext) -> (bool, bool) {
    let ind = |line: &str| indentation(line, DEFAULT_TAB_SIZE);
    let current = ind(&ctx.current_line_prefix);
    let prev = ind(&ctx.prev_non_empty_line);
    let next = ind(&ctx.next_non_empty_line);

    let on_non_blank_line = !ctx.current_line_prefix.trim().is_empty() && current >= next;
    let on_blank_line = ctx.current_line_prefix.trim().is_empty()
        && ctx.current_line_suffix.trim().is_empty()
        && current > prev
        && prev >= next;

    (on_non_blank_line, on_blank_line)
}

fn detect_start_empty_block(
    ctx: &DocContext,
    language: Language,
    position: Position,
) -> Option<(Option<String>, Option<Position>)> {
    let block_start = ends_with_block_start(&ctx.prefix, language)?;
    let (on_non_blank_line, on_blank_line) = positional_conditions(ctx);

    if on_non_blank_line || on_blank_line {
        return Some((
            Some(block_start.to_string()),
            Some(prefix_last_non_empty_char_position(&ctx.prefix, position)),
        ));
    }
    None
}

fn detect_open_bracket(
    ctx: &DocContext,
    position: Position,
) -> Option<(Option<String>, Option<Position>)> {
    let last_line = get_last_line(ctx.prefix.trim());
    let bracket = opening_bracket_at_end().find(last_line)?;
    let (on_non_blank_line, on_blank_line) = positional_conditions(ctx);

    if on_non_blank_line || on_blank_line {
        return Some((
            Some(bracket.as_str().to_string()),
            Some(prefix_last_non_empty_char_position(&ctx.prefix, position)),
        ));
    }
    None
}

fn detect_start_non_empty_block(
    ctx: &DocContext,
    language: Language,
    position: Position,
) -> Option<(Option<String>, Option<Position>)> {
    let ind = |line: &str| indentation(line, DEFAULT_TAB_SIZE);
    starts_with_block_end(&ctx.next_non_empty_line, language)?;
    if ind(&ctx.current_line_prefix) < ind(&ctx.next_non_empty_line) {
        return None;
    }
    Some(find_block_start(
        language,
        &ctx.prefix,
        &ctx.current_line_prefix,
        position,
    ))
}

/// Backward scan for the nearest prefix line that contains the block-start
/// token at a shallower indentation than the cursor line.
fn find_block_start(
    language: Language,
    prefix: &str,
    current_line_prefix: &str,
    cursor: Position,
) -> (Option<String>, Option<Position>) {
    let Some(config) = profile(language) else {
        return (None, None);
    };
    let block_start = config.block_start;
    let current_indent = indentation(current_line_prefix, DEFAULT_TAB_SIZE);

    for (i, line) in lines(prefix).iter().rev().enumerate() {
        if line.contains(block_start) && indentation(line, DEFAULT_TAB_SIZE) < current_indent {
            let column = line.trim_end().chars().count().saturating_sub(1);
            return (
                Some(block_start.to_string()),
                Some(Position::new(
                    cursor.line.saturating_sub(i as u32),
                    column as u32,
                )),
            );
        }
    }
    (None, None)
}

/// Position of the last non-whitespace character of `prefix`.
///
/// When the prefix has no trailing whitespace this is one character before
/// the cursor; otherwise walk back over the trimmed-off tail, reducing the
/// row by the number of line breaks it contained.
fn prefix_last_non_empty_char_position(prefix: &str, cursor: Position) -> Position {
    let trimmed = prefix.trim_end();
    if trimmed.len() == prefix.len() {
        return cursor.translate(0, -1);
    }

    let trailing = &prefix[trimmed.len()..];
    let trailing_line_breaks = lines(trailing).len() - 1;
    Position::new(
        cursor.line.saturating_sub(trailing_line_breaks as u32),
        get_last_line(trimmed).chars().count().saturating_sub(1) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{get_current_doc_context, Document};

    fn detect(language: Language, prefix: &str, suffix: &str, position: Position) -> (Option<String>, Option<Position>) {
        let doc = Document::new("u", language, prefix, suffix, position);
        let ctx = get_current_doc_context(&doc);
        (ctx.multiline_trigger, ctx.multiline_trigger_position)
    }

    #[test]
    fn python_colon_triggers_at_colon_position() {
        // Scenario: cursor at the start of an empty function body.
        let (trigger, pos) = detect(Language::Python, "def foo():\n    ", "", Position::new(1, 4));
        assert_eq!(trigger.as_deref(), Some(":"));
        // The colon is the last character of row 0: "def foo():" -> column 9.
        assert_eq!(pos, Some(Position::new(0, 9)));
    }

    #[test]
    fn trigger_without_trailing_whitespace_points_before_cursor() {
        let (trigger, pos) = detect(Language::Python, "if x:", "\nprint(1)", Position::new(0, 5));
        assert_eq!(trigger.as_deref(), Some(":"));
        assert_eq!(pos, Some(Position::new(0, 4)));
    }

    #[test]
    fn open_bracket_triggers() {
        let (trigger, pos) = detect(
            Language::Typescript,
            "const xs = [\n  ",
            "",
            Position::new(1, 2),
        );
        assert_eq!(trigger.as_deref(), Some("["));
        assert!(pos.is_some());
    }

    #[test]
    fn brace_language_block_start() {
        let (trigger, _) = detect(
            Language::Go,
            "func main() {\n\t",
            "",
            Position::new(1, 1),
        );
        assert_eq!(trigger.as_deref(), Some("{"));
    }

    #[test]
    fn call_expression_suppresses_trigger() {
        // Cursor at the end of an invocation line. Without suppression the
        // non-empty-block detector would fire (next line closes the block).
        let (trigger, pos) = detect(
            Language::Javascript,
            "function f() {\n  g(x)",
            "\n}\n",
            Position::new(1, 6),
        );
        assert_eq!((trigger, pos), (None, None));
    }

    #[test]
    fn definition_keyword_escapes_suppression() {
        // "def ..." lines are block starts even though they end in "(...)".
        let (trigger, _) = detect(Language::Python, "def foo(a, b):\n    ", "", Position::new(1, 4));
        assert_eq!(trigger.as_deref(), Some(":"));
    }

    #[test]
    fn unsupported_language_never_triggers() {
        let (trigger, pos) = detect(Language::Json, "{\n  ", "", Position::new(1, 2));
        assert_eq!((trigger, pos), (None, None));
    }

    #[test]
    fn start_of_non_empty_block_walks_back_to_block_start() {
        // Cursor on a blank body line; next non-empty line closes the block.
        let prefix = "function f() {\n  const a = 1;\n  ";
        let suffix = "\n}\n";
        let (trigger, pos) = detect(Language::Javascript, prefix, suffix, Position::new(2, 2));
        assert_eq!(trigger.as_deref(), Some("{"));
        // "function f() {" is two rows above the cursor, "{" is its last char.
        assert_eq!(pos, Some(Position::new(0, 13)));
    }

    #[test]
    fn deeper_next_line_blocks_trigger() {
        // Next non-empty line is indented deeper than the cursor line:
        // we are not at the start of a block the model should fill.
        let (trigger, _) = detect(
            Language::Python,
            "def foo():\n",
            "\n        body()\n",
            Position::new(1, 0),
        );
        assert_eq!(trigger, None);
    }

    #[test]
    fn trigger_position_never_past_prefix_end() {
        for (prefix, suffix) in [
            ("def foo():\n    ", ""),
            ("if a:\n    if b:\n        ", "\n    done()"),
            ("while True:", ""),
        ] {
            let doc = Document::from_text_at(
                "u",
                Language::Python,
                &format!("{prefix}{suffix}"),
                Position::new(
                    prefix.matches('\n').count() as u32,
                    get_last_line(prefix).chars().count() as u32,
                ),
            );
            let ctx = get_current_doc_context(&doc);
            if let Some(pos) = ctx.multiline_trigger_position {
                assert!(
                    pos.line <= doc.position.line,
                    "trigger must sit inside the prefix ({prefix:?})"
                );
                if pos.line == doc.position.line {
                    assert!(pos.character < doc.position.character.max(1));
                }
            }
        }
    }
}
