//! Regex table used to approximate symbol declarations without a parser.
//!
//! Each focus category owns an ordered list of patterns. Group 1 of a pattern, when it
//! participates, is the symbol name. Adding language coverage means appending a row.

use once_cell::sync::Lazy;
use regex::Regex;
use scout_protocol::{Focus, FocusCategory};

/// Syntax family a pattern was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternLanguage {
    /// C, C++, Java, C# and other brace languages with typed declarations
    CFamily,
    /// JavaScript and TypeScript
    JavaScript,
    Python,
    Rust,
    Go,
    /// Syntax shared by several families
    Generic,
}

#[derive(Debug)]
pub struct StructuralPattern {
    pub category: FocusCategory,
    pub language: PatternLanguage,
    pub regex: Regex,
    /// Captured names that are control-flow keywords are not declarations.
    pub rejects_keywords: bool,
}

struct PatternSpec {
    language: PatternLanguage,
    source: &'static str,
    rejects_keywords: bool,
}

const fn spec(language: PatternLanguage, source: &'static str) -> PatternSpec {
    PatternSpec {
        language,
        source,
        rejects_keywords: false,
    }
}

const fn guarded(language: PatternLanguage, source: &'static str) -> PatternSpec {
    PatternSpec {
        language,
        source,
        rejects_keywords: true,
    }
}

use PatternLanguage::{CFamily, Generic, Go, JavaScript, Python, Rust};

const TS_INTERFACE: &str = r"(?m)^[ \t]*(?:export[ \t]+)?(?:declare[ \t]+)?interface[ \t]+([A-Za-z_$][\w$]*)";
const TS_TYPE_ALIAS: &str =
    r"(?m)^[ \t]*(?:export[ \t]+)?(?:declare[ \t]+)?type[ \t]+([A-Za-z_$][\w$]*)[ \t]*(?:<[^>\n]*>)?[ \t]*=";
const TS_ENUM: &str =
    r"(?m)^[ \t]*(?:export[ \t]+)?(?:declare[ \t]+)?(?:const[ \t]+)?enum[ \t]+([A-Za-z_$][\w$]*)";
const RUST_TYPE_DECL: &str = r"(?m)^[ \t]*(?:pub(?:\([^)\n]*\))?[ \t]+)?(?:unsafe[ \t]+)?(?:struct|enum|union|trait|type)[ \t]+([A-Za-z_]\w*)";
const GO_TYPE_DECL: &str = r"(?m)^[ \t]*type[ \t]+([A-Za-z_]\w*)[ \t]+(?:struct|interface)\b";

const FUNCTION_PATTERNS: &[PatternSpec] = &[
    spec(
        JavaScript,
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:async[ \t]+)?function[ \t]*\*?[ \t]*([A-Za-z_$][\w$]*)",
    ),
    spec(
        JavaScript,
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:const|let|var)[ \t]+([A-Za-z_$][\w$]*)[ \t]*(?::[^=\n]+)?=[ \t]*(?:async[ \t]+)?(?:\([^)\n]*\)|[A-Za-z_$][\w$]*)[ \t]*(?::[^=\n]+)?=>",
    ),
    guarded(
        JavaScript,
        r"(?m)^[ \t]*(?:(?:public|private|protected|static|async|override|readonly|abstract|get|set)[ \t]+)*([A-Za-z_$][\w$]*)[ \t]*\([^)\n]*\)[ \t]*(?::[ \t]*[^{;\n]+)?\{",
    ),
    spec(Python, r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+([A-Za-z_]\w*)[ \t]*\("),
    spec(
        Rust,
        r#"(?m)^[ \t]*(?:pub(?:\([^)\n]*\))?[ \t]+)?(?:const[ \t]+)?(?:async[ \t]+)?(?:unsafe[ \t]+)?(?:extern[ \t]+"[^"\n]*"[ \t]+)?fn[ \t]+([A-Za-z_]\w*)"#,
    ),
    spec(Go, r"(?m)^[ \t]*func[ \t]+(?:\([^)\n]*\)[ \t]*)?([A-Za-z_]\w*)[ \t]*\("),
    guarded(
        CFamily,
        r"(?m)^[ \t]*(?:(?:public|private|protected|internal|static|final|inline|virtual|extern|synchronized|override)[ \t]+)*[A-Za-z_][\w<>\[\],:*&]*[ \t]+\**([A-Za-z_]\w*)[ \t]*\([^;{)\n]*\)[ \t]*(?:const[ \t]*)?(?:throws[ \t]+[\w., \t]+)?\{",
    ),
];

const CLASS_PATTERNS: &[PatternSpec] = &[
    spec(
        Generic,
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:(?:public|private|protected|internal|abstract|static|final|sealed|data|open)[ \t]+)*class[ \t]+([A-Za-z_$][\w$]*)",
    ),
    spec(JavaScript, TS_INTERFACE),
    spec(CFamily, r"(?m)^[ \t]*(?:public[ \t]+)?interface[ \t]+([A-Za-z_]\w*)"),
    spec(Rust, RUST_TYPE_DECL),
    spec(
        Rust,
        r"(?m)^[ \t]*impl(?:<[^>\n]*>)?[ \t]+(?:[\w:<>, ]+[ \t]+for[ \t]+)?([A-Za-z_][\w:]*)",
    ),
    spec(JavaScript, TS_ENUM),
    spec(JavaScript, TS_TYPE_ALIAS),
    spec(Go, GO_TYPE_DECL),
];

const IMPORT_PATTERNS: &[PatternSpec] = &[
    spec(
        JavaScript,
        r#"(?m)^[ \t]*import[ \t]+(?:type[ \t]+)?(?:[\w*{}$, \t]+[ \t]+from[ \t]+)?['"]([^'"\n]+)['"]"#,
    ),
    spec(JavaScript, r#"\brequire\([ \t]*['"]([^'"\n]+)['"][ \t]*\)"#),
    spec(
        Rust,
        r"(?m)^[ \t]*(?:pub(?:\([^)\n]*\))?[ \t]+)?use[ \t]+([\w:]+(?:::\{[^}]*\})?)",
    ),
    spec(Python, r"(?m)^[ \t]*from[ \t]+([\w.]+)[ \t]+import[ \t]+"),
    spec(
        Python,
        r"(?m)^[ \t]*import[ \t]+([A-Za-z_][\w.]*)(?:[ \t]+as[ \t]+\w+)?[ \t]*$",
    ),
    spec(CFamily, r"(?m)^[ \t]*import[ \t]+(?:static[ \t]+)?([\w.]+\*?)[ \t]*;"),
    spec(CFamily, r#"(?m)^[ \t]*#[ \t]*include[ \t]*[<"]([^>"\n]+)[>"]"#),
];

const TYPE_PATTERNS: &[PatternSpec] = &[
    spec(JavaScript, TS_INTERFACE),
    spec(JavaScript, TS_TYPE_ALIAS),
    spec(JavaScript, TS_ENUM),
    spec(Rust, RUST_TYPE_DECL),
    spec(Go, GO_TYPE_DECL),
];

const TEST_PATTERNS: &[PatternSpec] = &[
    spec(
        JavaScript,
        r#"\b(?:describe|it|test)(?:\.(?:only|skip|each))?[ \t]*\([ \t]*['"`]([^'"`\n]+)['"`]"#,
    ),
    spec(JavaScript, r"\bexpect[ \t]*\("),
    spec(
        Rust,
        r"#\[(?:tokio::)?test(?:\([^)\n]*\))?\]\s*(?:#\[[^\]\n]*\]\s*)*(?:pub[ \t]+)?(?:async[ \t]+)?fn[ \t]+([A-Za-z_]\w*)",
    ),
    spec(Python, r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+(test_?\w*)[ \t]*\("),
    spec(Go, r"(?m)^[ \t]*func[ \t]+(Test\w*)[ \t]*\([ \t]*\w+[ \t]+\*testing\.T"),
    spec(CFamily, r"@Test\b\s*(?:@\w+\s*)*(?:public[ \t]+)?void[ \t]+([A-Za-z_]\w*)[ \t]*\("),
];

const CONFIG_PATTERNS: &[PatternSpec] = &[
    spec(
        JavaScript,
        r"(?m)^[ \t]*export[ \t]+(?:default[ \t]+)?(?:const|let|var)[ \t]+(\w*(?:[Cc]onfig|[Ss]ettings|[Oo]ptions|CONFIG|SETTINGS|OPTIONS)\w*)",
    ),
    spec(JavaScript, r"\bmodule\.exports[ \t]*=[ \t]*\{"),
    spec(
        Rust,
        r"(?m)^[ \t]*(?:pub(?:\([^)\n]*\))?[ \t]+)?(?:const|static)[ \t]+([A-Z][A-Z0-9_]*(?:CONFIG|SETTINGS|OPTIONS)[A-Z0-9_]*)[ \t]*:",
    ),
    spec(
        Python,
        r"(?m)^([A-Z][A-Z0-9_]*(?:CONFIG|SETTINGS|OPTIONS)[A-Z0-9_]*)[ \t]*=",
    ),
];

const CONTROL_FLOW_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "switch", "catch", "return", "function", "do", "new",
    "typeof", "sizeof", "with", "foreach", "using", "lock", "match", "when",
];

pub(crate) fn is_control_flow_keyword(name: &str) -> bool {
    CONTROL_FLOW_KEYWORDS.contains(&name)
}

/// Compiled patterns, grouped by category.
#[derive(Debug)]
pub struct PatternTable {
    functions: Vec<StructuralPattern>,
    classes: Vec<StructuralPattern>,
    imports: Vec<StructuralPattern>,
    types: Vec<StructuralPattern>,
    tests: Vec<StructuralPattern>,
    config: Vec<StructuralPattern>,
}

static TABLE: Lazy<PatternTable> = Lazy::new(PatternTable::compile);

/// Shared table, compiled on first use.
pub fn pattern_table() -> &'static PatternTable {
    &TABLE
}

impl PatternTable {
    fn compile() -> Self {
        Self {
            functions: compile_category(FocusCategory::Functions, FUNCTION_PATTERNS),
            classes: compile_category(FocusCategory::Classes, CLASS_PATTERNS),
            imports: compile_category(FocusCategory::Imports, IMPORT_PATTERNS),
            types: compile_category(FocusCategory::Types, TYPE_PATTERNS),
            tests: compile_category(FocusCategory::Tests, TEST_PATTERNS),
            config: compile_category(FocusCategory::Config, CONFIG_PATTERNS),
        }
    }

    pub fn patterns(&self, category: FocusCategory) -> &[StructuralPattern] {
        match category {
            FocusCategory::Functions => &self.functions,
            FocusCategory::Classes => &self.classes,
            FocusCategory::Imports => &self.imports,
            FocusCategory::Types => &self.types,
            FocusCategory::Tests => &self.tests,
            FocusCategory::Config => &self.config,
        }
    }

    /// Patterns for a focus in category order; `all` yields every category.
    pub fn select(&self, focus: Focus) -> impl Iterator<Item = &StructuralPattern> + '_ {
        focus
            .categories()
            .iter()
            .flat_map(move |category| self.patterns(*category).iter())
    }

    pub fn len(&self) -> usize {
        FocusCategory::ALL
            .iter()
            .map(|category| self.patterns(*category).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compile_category(category: FocusCategory, specs: &[PatternSpec]) -> Vec<StructuralPattern> {
    specs
        .iter()
        .filter_map(|spec| match Regex::new(spec.source) {
            Ok(regex) => Some(StructuralPattern {
                category,
                language: spec.language,
                regex,
                rejects_keywords: spec.rejects_keywords,
            }),
            Err(err) => {
                log::warn!("Skipping invalid {category} pattern {:?}: {err}", spec.source);
                None
            }
        })
        .collect()
}
