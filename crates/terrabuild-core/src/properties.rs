use std::collections::BTreeMap;
use std::path::Path;

/// File name of the project-local secrets file.
pub const ENV_FILE: &str = ".terrabuild.env";

/// Loads a `.terrabuild.env` file (shell-style `KEY=value` format).
///
/// The file holds repository credentials and other secrets. Values are
/// available via `${env:VAR}` interpolation in `Terrabuild.toml`.
pub fn load_env_file(path: &Path) -> miette::Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    if !path.is_file() {
        return Ok(map);
    }
    let content =
        std::fs::read_to_string(path).map_err(terrabuild_util::errors::TerraError::Io)?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(map)
}

/// Interpolate `${env:VAR}` references in every string of a parsed TOML
/// document, including strings nested in arrays and tables. Keys are left
/// alone.
pub fn interpolate_value(value: &mut toml::Value, env_overrides: &BTreeMap<String, String>) {
    match value {
        toml::Value::String(s) if s.contains("${env:") => *s = interpolate(s, env_overrides),
        toml::Value::Array(items) => {
            for item in items {
                interpolate_value(item, env_overrides);
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                interpolate_value(item, env_overrides);
            }
        }
        _ => {}
    }
}

/// Interpolate `${env:VAR}` references in a string.
///
/// Looks up values first in `env_overrides` (from `.terrabuild.env`), then in
/// the process environment. Unknown variables become empty strings. Catalog
/// placeholders such as `${Fabric.yarn}` are left alone.
pub fn interpolate(input: &str, env_overrides: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${env:") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let end = start + end;
        let key = &rest[start + 6..end];
        let value = env_overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
            .unwrap_or_default();
        out.push_str(&rest[..start]);
        out.push_str(&value);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}
