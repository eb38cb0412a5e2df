//! Template variable substitution
//!
//! Dashboards let filter values reference variables (`$host`, `${host}`,
//! `[[host]]`). Variable storage lives outside this crate; the query builder
//! only sees the [`TemplateSrv`] seam.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Resolves named variables inside a string
pub trait TemplateSrv: Send + Sync {
    fn replace(&self, input: &str) -> String;
}

/// Identity substitution
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTemplates;

impl TemplateSrv for NoTemplates {
    fn replace(&self, input: &str) -> String {
        input.to_string()
    }
}

/// Substitution from a fixed name → value map; unknown variables are kept verbatim
#[derive(Debug, Clone, Default)]
pub struct VariableMap {
    vars: HashMap<String, String>,
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{(\w+)\}|\[\[(\w+)\]\]|\$(\w+)").expect("variable pattern is valid")
    })
}

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: define a variable
    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl From<HashMap<String, String>> for VariableMap {
    fn from(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

impl TemplateSrv for VariableMap {
    fn replace(&self, input: &str) -> String {
        if self.vars.is_empty() || !(input.contains('$') || input.contains("[[")) {
            return input.to_string();
        }

        variable_pattern()
            .replace_all(input, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(3))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match self.vars.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_variable_syntaxes() {
        let vars = VariableMap::new().var("host", "web-01").var("dc", "us-east");

        assert_eq!(vars.replace("$host"), "web-01");
        assert_eq!(vars.replace("${host}.example"), "web-01.example");
        assert_eq!(vars.replace("[[dc]]/$host"), "us-east/web-01");
    }

    #[test]
    fn test_unknown_variables_are_kept() {
        let vars = VariableMap::new().var("host", "web-01");
        assert_eq!(vars.replace("$region-$host"), "$region-web-01");
        assert_eq!(vars.replace("^[a-z]+$"), "^[a-z]+$");
    }

    #[test]
    fn test_no_templates_is_identity() {
        assert_eq!(NoTemplates.replace("$host"), "$host");
    }
}
