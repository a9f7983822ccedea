use serde::{Deserialize, Serialize};

pub const DEFAULT_TAB_SIZE: usize = 4;

/// Zero-based (line, character) cursor position.
///
/// Treated as a value type everywhere: `translate` returns a new position,
/// callers never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    pub fn translate(&self, line_delta: i64, character_delta: i64) -> Self {
        Self {
            line: (self.line as i64 + line_delta).max(0) as u32,
            character: (self.character as i64 + character_delta).max(0) as u32,
        }
    }
}

/// Width of a line's leading whitespace: tabs count `tab_size`, spaces 1.
pub fn indentation(line: &str, tab_size: usize) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { tab_size } else { 1 })
        .sum()
}

/// Text after the last line break (the whole text when there is none).
pub fn get_last_line(text: &str) -> &str {
    match text.rfind('\n') {
        Some(idx) => &text[idx + 1..],
        None => text,
    }
}

/// Text before the first line break, CRLF-aware.
pub fn get_first_line(text: &str) -> &str {
    match text.find('\n') {
        Some(idx) => text[..idx].strip_suffix('\r').unwrap_or(&text[..idx]),
        None => text,
    }
}

/// Most recent non-blank line strictly before the current (last) line of
/// `prefix`. Empty string when there is none.
pub fn get_prev_non_empty_line(prefix: &str) -> &str {
    let Some(last_break) = prefix.rfind('\n') else {
        return "";
    };
    prefix[..last_break]
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
}

/// First non-blank line strictly after the current (first) line of `suffix`.
/// Empty string when there is none.
pub fn get_next_non_empty_line(suffix: &str) -> &str {
    let Some(first_break) = suffix.find('\n') else {
        return "";
    };
    suffix[first_break + 1..]
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
}

/// Like [`get_next_non_empty_line`] but keeps blank-but-whitespace lines out
/// of consideration starting from the first line break (the current line's
/// remainder never counts as "suffix content" for trimming purposes).
pub fn get_first_non_empty_line(suffix: &str) -> &str {
    let Some(first_break) = suffix.find('\n') else {
        return "";
    };
    suffix[first_break..]
        .split('\n')
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
}

/// Split on `\r?\n`, keeping empty segments (like a text editor's line view).
pub fn lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}

/// Strip trailing spaces/tabs from every line, preserving line structure.
pub fn remove_trailing_whitespace(text: &str) -> String {
    text.split('\n')
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cursor position after inserting `text` at `position`.
pub fn position_after_insertion(position: Position, text: &str) -> Position {
    if text.is_empty() {
        return position;
    }
    let inserted = lines(text);
    if inserted.len() <= 1 {
        position.translate(0, get_first_line(text).chars().count() as i64)
    } else {
        Position::new(
            position.line + (inserted.len() - 1) as u32,
            inserted.last().unwrap().chars().count() as u32,
        )
    }
}

/// How many characters of `current_line_suffix` the completion "consumes".
///
/// Greedy left-to-right scan: walk `insert_text`, advancing a suffix pointer
/// only on a character match. Monotonic in `insert_text` and bounded by the
/// suffix length, which is what lets the splice drop exactly the duplicated
/// closing tokens.
pub fn get_matching_suffix_length(insert_text: &str, current_line_suffix: &str) -> usize {
    let suffix: Vec<char> = current_line_suffix.chars().collect();
    let mut j = 0;
    for c in insert_text.chars() {
        if j >= suffix.len() {
            return j;
        }
        if c == suffix[j] {
            j += 1;
        }
    }
    j
}

pub fn closing_bracket_for(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        '<' => Some('>'),
        _ => None,
    }
}

pub fn opening_bracket_for(close: char) -> Option<char> {
    match close {
        ')' => Some('('),
        ']' => Some('['),
        '}' => Some('{'),
        '>' => Some('<'),
        _ => None,
    }
}
