use std::path::Path;

/// Source language guessed from a file extension.
///
/// Only used for display (code fences, JSON output). Structural matching always
/// applies the whole pattern table regardless of language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Unknown,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" => Language::Python,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "cs" => Language::CSharp,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            "swift" => Language::Swift,
            "kt" | "kts" => Language::Kotlin,
            _ => Language::Unknown,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Unknown => "unknown",
        }
    }
}

/// Language label for a chunk: the backend's tag when present, else the extension guess.
pub fn display_language(declared: Option<&str>, relative_path: &str) -> String {
    match declared.map(str::trim).filter(|tag| !tag.is_empty()) {
        Some(tag) => tag.to_lowercase(),
        None => Language::from_path(relative_path).as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_extensions() {
        assert_eq!(Language::from_path("src/lib.rs"), Language::Rust);
        assert_eq!(Language::from_path("web/App.TSX"), Language::TypeScript);
        assert_eq!(Language::from_path("tools/run.py"), Language::Python);
        assert_eq!(Language::from_path("Makefile"), Language::Unknown);
    }

    #[test]
    fn declared_tag_wins_over_extension() {
        assert_eq!(display_language(Some("TypeScript"), "a.js"), "typescript");
        assert_eq!(display_language(Some("  "), "a.go"), "go");
        assert_eq!(display_language(None, "README"), "unknown");
    }
}
