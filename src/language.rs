use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Closed set of language identifiers the pipeline knows about.
///
/// The string forms match editor language ids (`"typescriptreact"`, not
/// `"tsx"`), because batch records carry whatever the editor reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Astro,
    Bash,
    C,
    Cpp,
    CSharp,
    Css,
    Dart,
    Elisp,
    Elixir,
    Elm,
    Go,
    Html,
    Java,
    Javascript,
    Javascriptreact,
    Json,
    Kotlin,
    Lua,
    ObjectiveC,
    Ocaml,
    Php,
    Python,
    Rescript,
    Ruby,
    Rust,
    Scala,
    Svelte,
    Swift,
    Typescript,
    Typescriptreact,
    Vue,
}

impl Language {
    pub fn from_id(id: &str) -> Option<Self> {
        let lang = match id {
            "astro" => Self::Astro,
            "bash" => Self::Bash,
            "c" => Self::C,
            "cpp" => Self::Cpp,
            "c_sharp" | "csharp" => Self::CSharp,
            "css" => Self::Css,
            "dart" => Self::Dart,
            "elisp" => Self::Elisp,
            "elixir" => Self::Elixir,
            "elm" => Self::Elm,
            "go" => Self::Go,
            "html" => Self::Html,
            "java" => Self::Java,
            "javascript" => Self::Javascript,
            "javascriptreact" => Self::Javascriptreact,
            "json" => Self::Json,
            "kotlin" => Self::Kotlin,
            "lua" => Self::Lua,
            "objective-c" => Self::ObjectiveC,
            "ocaml" => Self::Ocaml,
            "php" => Self::Php,
            "python" => Self::Python,
            "rescript" => Self::Rescript,
            "ruby" => Self::Ruby,
            "rust" => Self::Rust,
            "scala" => Self::Scala,
            "svelte" => Self::Svelte,
            "swift" => Self::Swift,
            "typescript" => Self::Typescript,
            "typescriptreact" => Self::Typescriptreact,
            "vue" => Self::Vue,
            _ => return None,
        };
        Some(lang)
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Astro => "astro",
            Self::Bash => "bash",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "c_sharp",
            Self::Css => "css",
            Self::Dart => "dart",
            Self::Elisp => "elisp",
            Self::Elixir => "elixir",
            Self::Elm => "elm",
            Self::Go => "go",
            Self::Html => "html",
            Self::Java => "java",
            Self::Javascript => "javascript",
            Self::Javascriptreact => "javascriptreact",
            Self::Json => "json",
            Self::Kotlin => "kotlin",
            Self::Lua => "lua",
            Self::ObjectiveC => "objective-c",
            Self::Ocaml => "ocaml",
            Self::Php => "php",
            Self::Python => "python",
            Self::Rescript => "rescript",
            Self::Ruby => "ruby",
            Self::Rust => "rust",
            Self::Scala => "scala",
            Self::Svelte => "svelte",
            Self::Swift => "swift",
            Self::Typescript => "typescript",
            Self::Typescriptreact => "typescriptreact",
            Self::Vue => "vue",
        }
    }
}

/// Block tokens and comment delimiter for one language.
///
/// `block_else_test` matches lines that *continue* a block chain
/// (`elif`/`else:` in Python, `} else` in brace languages) — those must not
/// be mistaken for fresh block ends by the trimmer.
pub struct LanguageProfile {
    pub block_start: &'static str,
    block_else_cell: &'static OnceLock<Regex>,
    block_else_pattern: &'static str,
    pub block_end: Option<&'static str>,
    pub comment_start: &'static str,
}

impl LanguageProfile {
    pub fn block_else_test(&self) -> &Regex {
        self.block_else_cell
            .get_or_init(|| Regex::new(self.block_else_pattern).unwrap())
    }
}

static PYTHON_ELSE: OnceLock<Regex> = OnceLock::new();
static ELIXIR_ELSE: OnceLock<Regex> = OnceLock::new();
static BRACE_ELSE: OnceLock<Regex> = OnceLock::new();

static PYTHON_PROFILE: LanguageProfile = LanguageProfile {
    block_start: ":",
    block_else_cell: &PYTHON_ELSE,
    block_else_pattern: r"^[\t ]*(elif |else:)",
    block_end: None,
    comment_start: "# ",
};

static ELIXIR_PROFILE: LanguageProfile = LanguageProfile {
    block_start: "do",
    block_else_cell: &ELIXIR_ELSE,
    block_else_pattern: r"^[\t ]*(else|else do)",
    block_end: Some("end"),
    comment_start: "# ",
};

static BRACE_PROFILE: LanguageProfile = LanguageProfile {
    block_start: "{",
    block_else_cell: &BRACE_ELSE,
    block_else_pattern: r"^[\t ]*\} else",
    block_end: Some("}"),
    comment_start: "// ",
};

/// Per-language block profile, or `None` when the language has no profile.
///
/// A `None` here means multiline detection and the language-specific
/// truncation branches are skipped entirely for that language.
pub fn profile(language: Language) -> Option<&'static LanguageProfile> {
    use Language::*;
    match language {
        Python => Some(&PYTHON_PROFILE),
        Elixir => Some(&ELIXIR_PROFILE),
        Astro | C | Cpp | CSharp | Dart | Go | Java | Javascript | Javascriptreact | Kotlin
        | Php | Rust | Svelte | Typescript | Typescriptreact | Vue => Some(&BRACE_PROFILE),
        _ => None,
    }
}

/// Languages for which a multiline trigger may fire at all.
pub fn supports_multiline(language: Language) -> bool {
    use Language::*;
    matches!(
        language,
        Astro
            | C
            | Cpp
            | CSharp
            | Css
            | Dart
            | Elixir
            | Go
            | Html
            | Java
            | Javascript
            | Javascriptreact
            | Kotlin
            | Php
            | Python
            | Rust
            | Svelte
            | Typescript
            | Typescriptreact
            | Vue
    )
}

/// Grammar node-type names used for the same-row trigger override.
pub struct NodeTypes {
    pub comment: &'static str,
    pub method: &'static str,
    pub function: Option<&'static str>,
}

pub fn node_types(language: Language) -> Option<&'static NodeTypes> {
    use Language::*;
    const C_LIKE: NodeTypes = NodeTypes {
        comment: "comment",
        method: "function_definition",
        function: Some("function_definition"),
    };
    const JS_LIKE: NodeTypes = NodeTypes {
        comment: "comment",
        method: "method_definition",
        function: Some("function_declaration"),
    };
    match language {
        C | Cpp => Some(&C_LIKE),
        CSharp => {
            const T: NodeTypes = NodeTypes {
                comment: "comment",
                method: "method_declaration",
                function: None,
            };
            Some(&T)
        }
        Java => {
            const T: NodeTypes = NodeTypes {
                comment: "line_comment",
                method: "method_declaration",
                function: None,
            };
            Some(&T)
        }
        Javascript | Typescript | Typescriptreact => Some(&JS_LIKE),
        Javascriptreact => {
            const T: NodeTypes = NodeTypes {
                comment: "comment",
                method: "function_definition",
                function: Some("function_declaration"),
            };
            Some(&T)
        }
        Kotlin => {
            const T: NodeTypes = NodeTypes {
                comment: "line_comment",
                method: "function_declaration",
                function: Some("function_declaration"),
            };
            Some(&T)
        }
        Php => {
            const T: NodeTypes = NodeTypes {
                comment: "comment",
                method: "method_declaration",
                function: Some("function_definition"),
            };
            Some(&T)
        }
        Python => {
            const T: NodeTypes = NodeTypes {
                comment: "comment",
                method: "function_definition",
                function: Some("function_definition"),
            };
            Some(&T)
        }
        Ruby => {
            const T: NodeTypes = NodeTypes {
                comment: "comment",
                method: "method",
                function: None,
            };
            Some(&T)
        }
        _ => None,
    }
}

/// Languages whose style puts the opening brace on its own following line
/// (Allman-style C/C++/C#). The truncator's ancestor walk allows a one-row
/// gap for these.
pub fn brace_on_next_line(language: Language) -> bool {
    matches!(language, Language::C | Language::Cpp | Language::CSharp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trips_for_every_language() {
        let all = [
            "astro", "bash", "c", "cpp", "c_sharp", "css", "dart", "elisp", "elixir", "elm",
            "go", "html", "java", "javascript", "javascriptreact", "json", "kotlin", "lua",
            "objective-c", "ocaml", "php", "python", "rescript", "ruby", "rust", "scala",
            "svelte", "swift", "typescript", "typescriptreact", "vue",
        ];
        for id in all {
            let lang = Language::from_id(id).unwrap_or_else(|| panic!("unknown id {id}"));
            assert_eq!(lang.id(), id, "id() must round-trip for {id}");
        }
        assert!(Language::from_id("cobol").is_none());
    }

    #[test]
    fn python_profile_is_indentation_based() {
        let p = profile(Language::Python).unwrap();
        assert_eq!(p.block_start, ":");
        assert!(p.block_end.is_none(), "python has no block-end token");
        assert!(p.block_else_test().is_match("    elif x:"));
        assert!(p.block_else_test().is_match("else:"));
        assert!(!p.block_else_test().is_match("    el"));
    }

    #[test]
    fn brace_profile_covers_typescript() {
        let p = profile(Language::Typescript).unwrap();
        assert_eq!(p.block_start, "{");
        assert_eq!(p.block_end, Some("}"));
        assert!(p.block_else_test().is_match("  } else {"));
    }

    #[test]
    fn unsupported_language_has_no_profile() {
        assert!(profile(Language::Json).is_none());
        assert!(profile(Language::Lua).is_none());
        assert!(!supports_multiline(Language::Json));
        // CSS and HTML detect multiline but have no block profile.
        assert!(supports_multiline(Language::Css));
        assert!(profile(Language::Css).is_none());
    }

    #[test]
    fn node_types_match_grammar_names() {
        assert_eq!(node_types(Language::Python).unwrap().method, "function_definition");
        assert_eq!(node_types(Language::Java).unwrap().comment, "line_comment");
        assert!(node_types(Language::Rust).is_none(), "rust has no override table");
    }
}
