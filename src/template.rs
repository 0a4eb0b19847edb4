//! Variable substitution for datasource configs
//!
//! Handles `${VAR}` references in connection strings and base URLs, resolved
//! from the process environment at connect time.

use crate::error::{Error, Result};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Regex for matching variable references: ${NAME}
static VARIABLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}").unwrap());

/// Render a template against the process environment
pub fn render(template: &str) -> Result<String> {
    render_with(template, |name| std::env::var(name).ok())
}

/// Render a template with a custom variable lookup
///
/// Every undefined variable is reported in a single error.
pub fn render_with<F>(template: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    let result = VARIABLE_REGEX.replace_all(template, |cap: &Captures<'_>| {
        let name = &cap[1];
        match lookup(name) {
            Some(value) => value,
            None => {
                errors.push(name.to_string());
                String::new()
            }
        }
    });

    if errors.is_empty() {
        Ok(result.into_owned())
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Check if a string contains variable references
pub fn has_templates(s: &str) -> bool {
    VARIABLE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    VARIABLE_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_simple_substitution() {
        let result = render_with("s3://${BUCKET}/raw", vars(&[("BUCKET", "lake")])).unwrap();
        assert_eq!(result, "s3://lake/raw");
    }

    #[test]
    fn test_multiple_substitutions() {
        let lookup = vars(&[("PG_USER", "reader"), ("PG_PASS", "s3cret")]);
        let result = render_with("postgresql://${PG_USER}:${PG_PASS}@db/main", lookup).unwrap();
        assert_eq!(result, "postgresql://reader:s3cret@db/main");
    }

    #[test]
    fn test_undefined_variables_are_all_reported() {
        let err = render_with("${A}/${B}", vars(&[])).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("A, B"));
    }

    #[test]
    fn test_no_templates() {
        let result = render("plain string without variables").unwrap();
        assert_eq!(result, "plain string without variables");
    }

    #[test]
    fn test_whitespace_in_reference() {
        let lookup = vars(&[("KEY", "value")]);
        assert_eq!(render_with("${KEY}", &lookup).unwrap(), "value");
        assert_eq!(render_with("${ KEY }", &lookup).unwrap(), "value");
    }

    #[test]
    fn test_render_reads_environment() {
        let result = render("${PATH}").unwrap();
        assert_eq!(result, std::env::var("PATH").unwrap());
    }

    #[test]
    fn test_has_templates() {
        assert!(has_templates("${HOME}/data"));
        assert!(!has_templates("$HOME/data"));
        assert!(!has_templates("{{ config.key }}"));
    }

    #[test]
    fn test_extract_variables() {
        assert_eq!(extract_variables("${A}:${B_2}"), vec!["A", "B_2"]);
    }
}
