//! `{{variable}}` interpolation for archive names and other project-level
//! strings.
//!
//! This is distinct from catalog placeholders (`$key`): the variables here
//! describe the project being packaged, not library versions.

use std::collections::BTreeMap;

use terrabuild_util::errors::TerraError;

/// Default archive name: `<CapitalizedProjectName>-<version>.jar`.
pub const DEFAULT_ARCHIVE_NAME: &str = "{{Name}}-{{version}}.jar";

/// Variables available for `{{variable}}` interpolation.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    vars: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Create a context with the standard project variables:
    /// `name`, `Name` (capitalized), `version` and `platform`.
    pub fn new(project_name: &str, version: &str, platform: &str) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("name".to_string(), project_name.to_string());
        vars.insert("Name".to_string(), capitalize(project_name));
        vars.insert("version".to_string(), version.to_string());
        vars.insert("platform".to_string(), platform.to_string());
        Self { vars }
    }

    /// Add a custom variable to the context.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }
}

/// Replace all `{{key}}` placeholders in `input` with values from `ctx`.
///
/// Unknown keys and unterminated `{{` are errors.
pub fn interpolate(input: &str, ctx: &TemplateContext) -> miette::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(TerraError::Packaging {
                message: format!("Unterminated `{{{{` in `{input}`"),
            }
            .into());
        };
        let key = after[..end].trim();
        let value = ctx.vars.get(key).ok_or_else(|| TerraError::Packaging {
            message: format!("Unknown variable `{{{{{key}}}}}` in `{input}`"),
        })?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Upper-case the first character, leaving the rest untouched.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
