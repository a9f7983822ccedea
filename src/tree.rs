use tree_sitter::{InputEdit, Parser, Tree};

use crate::language::Language;

/// Grammar for a language id, when one is compiled in.
///
/// Languages without a grammar fall back to raw-text mode everywhere: the
/// pipeline still runs, it just skips structural truncation.
pub fn grammar_for(language: Language) -> Option<tree_sitter::Language> {
    use Language::*;
    let grammar = match language {
        Python => tree_sitter_python::LANGUAGE.into(),
        Rust => tree_sitter_rust::LANGUAGE.into(),
        Javascript | Javascriptreact => tree_sitter_javascript::LANGUAGE.into(),
        Typescript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Typescriptreact => tree_sitter_typescript::LANGUAGE_TSX.into(),
        #[cfg(feature = "lang-go")]
        Go => tree_sitter_go::LANGUAGE.into(),
        #[cfg(feature = "lang-java")]
        Java => tree_sitter_java::LANGUAGE.into(),
        #[cfg(feature = "lang-c")]
        C => tree_sitter_c::LANGUAGE.into(),
        #[cfg(feature = "lang-cpp")]
        Cpp => tree_sitter_cpp::LANGUAGE.into(),
        #[cfg(feature = "lang-csharp")]
        CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
        _ => return None,
    };
    Some(grammar)
}

/// One parser bound to one language, reused across the repair/overlap loop
/// of a single completion. A tree is only valid for the exact text it was
/// parsed from; call [`TreeAnalyzer::edit`] before any incremental re-parse
/// against changed text, or node offsets go stale.
pub struct TreeAnalyzer {
    parser: Parser,
}

impl TreeAnalyzer {
    pub fn new(language: Language) -> Option<Self> {
        let grammar = grammar_for(language)?;
        let mut parser = Parser::new();
        parser.set_language(&grammar).ok()?;
        Some(Self { parser })
    }

    /// Parse `text`, never panicking: `None` means "no tree, degrade to raw
    /// text". `old_tree` enables incremental parsing; it must already have
    /// been edited to describe the change from its text to `text`.
    pub fn safe_parse(&mut self, text: &str, old_tree: Option<&Tree>) -> Option<Tree> {
        self.parser.parse(text, old_tree)
    }

    /// Shift a tree's node offsets to account for a pending splice.
    pub fn edit(tree: &mut Tree, edit: &InputEdit) {
        tree.edit(edit);
    }
}

/// Number of error or missing nodes whose span intersects
/// `[start_byte, end_byte)`. Used as the residual-error count attached to a
/// truncated completion.
pub fn count_error_nodes(tree: &Tree, start_byte: usize, end_byte: usize) -> usize {
    let mut count = 0;
    let mut cursor = tree.walk();
    let mut reached_root = false;

    while !reached_root {
        let node = cursor.node();
        let overlaps = node.start_byte() < end_byte && node.end_byte() > start_byte;
        if overlaps && (node.is_error() || node.is_missing()) {
            count += 1;
        }

        // Skip subtrees entirely outside the window.
        if overlaps && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                reached_root = true;
                break;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_registry_covers_core_languages() {
        for lang in [
            Language::Python,
            Language::Rust,
            Language::Javascript,
            Language::Typescript,
            Language::Typescriptreact,
        ] {
            assert!(grammar_for(lang).is_some(), "missing grammar for {}", lang.id());
        }
        assert!(grammar_for(Language::Html).is_none());
        assert!(TreeAnalyzer::new(Language::Kotlin).is_none());
    }

    #[test]
    fn safe_parse_produces_a_tree() {
        let mut analyzer = TreeAnalyzer::new(Language::Python).unwrap();
        let tree = analyzer.safe_parse("def foo():\n    return 1\n", None).unwrap();
        assert_eq!(tree.root_node().kind(), "module");
        assert!(!tree.root_node().has_error());
    }

    #[test]
    fn incremental_reparse_after_edit() {
        let mut analyzer = TreeAnalyzer::new(Language::Python).unwrap();
        let old_text = "x = 1\n";
        let new_text = "x = 1 + 2\n";
        let mut tree = analyzer.safe_parse(old_text, None).unwrap();

        TreeAnalyzer::edit(
            &mut tree,
            &InputEdit {
                start_byte: 5,
                old_end_byte: 5,
                new_end_byte: 9,
                start_position: tree_sitter::Point { row: 0, column: 5 },
                old_end_position: tree_sitter::Point { row: 0, column: 5 },
                new_end_position: tree_sitter::Point { row: 0, column: 9 },
            },
        );
        let new_tree = analyzer.safe_parse(new_text, Some(&tree)).unwrap();
        assert!(!new_tree.root_node().has_error());
        // The module root spans the whole source, trailing newline included.
        assert_eq!(
            new_tree.root_node().utf8_text(new_text.as_bytes()).unwrap(),
            new_text
        );
        assert_eq!(new_tree.root_node().end_byte(), new_text.len());
    }

    #[test]
    fn error_node_count_restricted_to_window() {
        let mut analyzer = TreeAnalyzer::new(Language::Python).unwrap();
        let text = "def foo():\n    return (1\n";
        let tree = analyzer.safe_parse(text, None).unwrap();
        assert!(tree.root_node().has_error());
        assert!(count_error_nodes(&tree, 0, text.len()) > 0);
        // A window before the broken region sees no errors.
        assert_eq!(count_error_nodes(&tree, 0, 3), 0);
    }
}
