//! Language detection and code-boundary patterns.
//!
//! The language of a code document is derived purely from the file
//! extension of its locator. Only JavaScript, TypeScript, Python and Java
//! carry boundary patterns; every other language has an empty set and is
//! split by size alone.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Languages recognised by the extension lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Java,
    Cpp,
    C,
    Go,
    Rust,
    Php,
    Ruby,
    Bash,
    Text,
}

impl Language {
    /// Detect language from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "jsx" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "py" => Language::Python,
            "java" => Language::Java,
            "cpp" => Language::Cpp,
            "c" => Language::C,
            "go" => Language::Go,
            "rs" => Language::Rust,
            "php" => Language::Php,
            "rb" => Language::Ruby,
            "sh" => Language::Bash,
            _ => Language::Text,
        }
    }

    /// Detect language from a locator (path, file name or URL).
    pub fn from_locator(locator: &str) -> Self {
        Path::new(locator)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Text)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Php => "php",
            Language::Ruby => "ruby",
            Language::Bash => "bash",
            Language::Text => "text",
        }
    }

    /// True for every language except the `text` fallback.
    pub fn is_code(self) -> bool {
        self != Language::Text
    }

    /// Top-level declaration openers that start a new code chunk.
    pub fn boundary_patterns(self) -> &'static [Regex] {
        static JS: OnceLock<Vec<Regex>> = OnceLock::new();
        static TS: OnceLock<Vec<Regex>> = OnceLock::new();
        static PY: OnceLock<Vec<Regex>> = OnceLock::new();
        static JAVA: OnceLock<Vec<Regex>> = OnceLock::new();

        match self {
            Language::JavaScript => JS.get_or_init(|| {
                compile(&[r"^(function|class|const|let|var)\s", r"^export\s", r"^import\s"])
            }),
            Language::TypeScript => TS.get_or_init(|| {
                compile(&[
                    r"^(function|class|interface|type|const|let|var)\s",
                    r"^export\s",
                    r"^import\s",
                ])
            }),
            Language::Python => {
                PY.get_or_init(|| compile(&[r"^(def|class)\s", r"^import\s", r"^from\s"]))
            }
            Language::Java => JAVA.get_or_init(|| {
                compile(&[
                    r"^(public|private|protected)?\s*(class|interface|enum)\s",
                    r"^import\s",
                ])
            }),
            _ => &[],
        }
    }

    /// Whether `line` opens a new code unit. Leading and trailing
    /// whitespace is ignored.
    pub fn is_boundary(self, line: &str) -> bool {
        let trimmed = line.trim();
        self.boundary_patterns().iter().any(|re| re.is_match(trimmed))
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    // Fixed literals, checked by `test_all_patterns_compile`.
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}
