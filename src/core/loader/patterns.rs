/// Whether a unit path matches a load pattern.
///
/// Patterns are unit paths (`app/models`), recursive patterns
/// (`app/models/...`) or `...` for everything. Paths starting with `./` are
/// relative to the module root.
pub fn matches_pattern(pattern: &str, module: &str, unit: &str) -> bool {
    let pattern = absolutize(pattern.trim_end_matches('/'), module);
    if pattern == "..." {
        return true;
    }
    match pattern.strip_suffix("/...") {
        Some(base) => unit == base || unit.strip_prefix(base).is_some_and(|rest| rest.starts_with('/')),
        None => unit == pattern,
    }
}

fn absolutize(pattern: &str, module: &str) -> String {
    if pattern == "." {
        return module.to_string();
    }
    match pattern.strip_prefix("./") {
        Some("...") => format!("{}/...", module),
        Some(rest) => format!("{}/{}", module, rest),
        None => pattern.to_string(),
    }
}
