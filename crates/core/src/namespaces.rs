//! Namespace list parsing for the `namespace-to-watch` setting.

pub const DEFAULT_NAMESPACE: &str = "default";

/// Split a comma-separated namespace setting into trimmed, non-empty names.
///
/// Order is preserved and duplicates are kept. Blank or missing input yields
/// `[DEFAULT_NAMESPACE]`, so the result is never empty.
pub fn resolve_namespaces(spec: Option<&str>) -> Vec<String> {
    let out: Vec<String> = spec
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if out.is_empty() {
        vec![DEFAULT_NAMESPACE.to_string()]
    } else {
        out
    }
}
