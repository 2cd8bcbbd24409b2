/// Normalizes a scope prefix: `\` becomes `/`, leading `./` and surrounding slashes go.
/// Returns `None` when nothing meaningful is left.
pub fn normalize_scope(raw: &str) -> Option<String> {
    let normalized = normalize_filter_path(raw);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Plain prefix comparison of a normalized relative path against a normalized scope.
pub fn scope_allows(rel_path: &str, scope: Option<&str>) -> bool {
    let Some(scope) = scope.and_then(normalize_scope) else {
        return true;
    };
    normalize_relative_path(rel_path).starts_with(&scope)
}

/// Suffix comparison used by the `file_type` filter. A bare extension (`rs`) means `.rs`.
pub fn file_type_allows(rel_path: &str, file_type: Option<&str>) -> bool {
    let Some(file_type) = file_type.map(str::trim).filter(|t| !t.is_empty()) else {
        return true;
    };
    let suffix = if file_type.starts_with('.') || file_type.contains('/') {
        file_type.to_string()
    } else {
        format!(".{file_type}")
    };
    normalize_relative_path(rel_path).ends_with(&suffix)
}

pub fn normalize_relative_path(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while let Some(rest) = value.strip_prefix("./") {
        value = rest.to_string();
    }
    value
}

/// Workspace paths compare equal when they match after separator normalization,
/// trailing-slash removal and lowercasing.
pub fn same_workspace_path(left: &str, right: &str) -> bool {
    normalize_workspace_path(left) == normalize_workspace_path(right)
}

fn normalize_workspace_path(raw: &str) -> String {
    raw.trim()
        .replace('\\', "/")
        .trim_end_matches('/')
        .to_lowercase()
}

fn normalize_filter_path(raw: &str) -> String {
    let value = normalize_relative_path(raw);
    let value = value.trim_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}
