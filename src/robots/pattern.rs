//! Robots.txt path pattern matching
//!
//! `*` matches any run of characters and a trailing `$` anchors the pattern
//! to the end of the path. Anything else is a plain prefix match.

use regex::Regex;

/// Returns true if `path` matches the robots.txt `pattern`
pub fn matches_pattern(pattern: &str, path: &str) -> bool {
    let (body, anchored) = match pattern.strip_suffix('$') {
        Some(body) => (body, true),
        None => (pattern, false),
    };

    if !body.contains('*') {
        return if anchored {
            path == body
        } else {
            path.starts_with(body)
        };
    }

    let translated = body
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    let expression = if anchored {
        format!("^{}$", translated)
    } else {
        format!("^{}", translated)
    };

    Regex::new(&expression)
        .map(|re| re.is_match(path))
        .unwrap_or(false)
}
