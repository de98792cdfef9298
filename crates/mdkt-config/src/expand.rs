//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a config value.
///
/// Bare `$VAR` is left alone, which matters for Kotlin names and imports
/// that may legitimately contain `$`.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    let escaped = escape_bare_dollars(value);
    shellexpand::env_with_context(&escaped, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var).map(Some).map_err(|_| UnsetVar {
            name: var.to_owned(),
        })
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.name),
    })
}

/// Double every `$` outside a `${...}` reference that does not open one.
fn escape_bare_dollars(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    let mut in_reference = false;
    while let Some(c) = chars.next() {
        match c {
            '$' if !in_reference => {
                if chars.peek() == Some(&'{') {
                    in_reference = true;
                    escaped.push('$');
                } else {
                    escaped.push_str("$$");
                }
            }
            '}' if in_reference => {
                in_reference = false;
                escaped.push('}');
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Lookup failure for a variable without a default.
struct UnsetVar {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_group_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MDKT_EXPAND_GROUP", "com.example");
        }
        let result = expand_env("${MDKT_EXPAND_GROUP}.pages", "project.group").unwrap();
        assert_eq!(result, "com.example.pages");
        unsafe {
            std::env::remove_var("MDKT_EXPAND_GROUP");
        }
    }

    #[test]
    fn test_expand_default_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MDKT_EXPAND_UNSET");
        }
        let result = expand_env("${MDKT_EXPAND_UNSET:-.layouts.Page}", "markdown.default_root")
            .unwrap();
        assert_eq!(result, ".layouts.Page");
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MDKT_EXPAND_MISSING");
        }
        let err = expand_env("${MDKT_EXPAND_MISSING}", "markdown.imports").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MDKT_EXPAND_MISSING"));
        assert!(err.to_string().contains("markdown.imports"));
    }

    #[test]
    fn test_bare_dollar_kept() {
        let result = expand_env("com.example.Outer$Inner", "markdown.imports").unwrap();
        assert_eq!(result, "com.example.Outer$Inner");
    }

    #[test]
    fn test_bare_dollar_kept_next_to_reference() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MDKT_EXPAND_NESTED", "com.example");
        }
        let result = expand_env("${MDKT_EXPAND_NESTED}.Outer$Inner", "markdown.imports").unwrap();
        assert_eq!(result, "com.example.Outer$Inner");
        unsafe {
            std::env::remove_var("MDKT_EXPAND_NESTED");
        }
    }

    #[test]
    fn test_escape_bare_dollars() {
        assert_eq!(escape_bare_dollars("a$b"), "a$$b");
        assert_eq!(escape_bare_dollars("${A}$B"), "${A}$$B");
        assert_eq!(escape_bare_dollars("${A:-x}.y$"), "${A:-x}.y$$");
    }
}
