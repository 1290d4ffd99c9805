//! Glob pattern matching for in-process backends

use regex::Regex;

use crate::domain::DomainError;

/// Compiles a Redis-style glob (`*`, `?`, `[...]`) into an anchored regex
pub fn glob_to_regex(pattern: &str) -> Result<Regex, DomainError> {
    let mut expr = String::with_capacity(pattern.len() * 2 + 2);
    expr.push('^');

    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            '[' => {
                expr.push('[');

                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }

                    if inner == '\\' || inner == '[' {
                        expr.push('\\');
                    }
                    expr.push(inner);
                }

                expr.push(']');
            }
            '\\' => {
                if let Some(escaped) = chars.next() {
                    expr.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }

    expr.push('$');

    Regex::new(&expr).map_err(|e| DomainError::validation(format!("Invalid pattern: {}", e)))
}

/// Escapes glob metacharacters so `value` only matches itself
pub fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}
