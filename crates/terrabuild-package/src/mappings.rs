//! Class-name mappings in the Tiny format (v1 and v2).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use terrabuild_util::errors::TerraError;

/// Location of the mappings file inside a mappings jar.
pub const TINY_ENTRY: &str = "mappings/mappings.tiny";

/// Internal class names (`a/b/C`) mapped from one namespace to another.
#[derive(Debug, Clone, Default)]
pub struct ClassMappings {
    pub from: String,
    pub to: String,
    classes: HashMap<String, String>,
}

impl ClassMappings {
    /// Parse Tiny text, mapping class names from namespace `from` to `to`.
    pub fn parse_tiny(text: &str, from: &str, to: &str) -> miette::Result<Self> {
        let mut lines = text.lines();
        let header = lines.next().unwrap_or_default();
        let fields: Vec<&str> = header.split('\t').collect();

        let (namespaces, class_tag, indented) = match fields.as_slice() {
            ["v1", namespaces @ ..] => (namespaces, "CLASS", false),
            ["tiny", "2", _, namespaces @ ..] => (namespaces, "c", true),
            _ => {
                return Err(malformed(format!(
                    "unrecognized header `{}`",
                    header.trim_end()
                )))
            }
        };
        let column = |name: &str| {
            namespaces.iter().position(|n| *n == name).ok_or_else(|| {
                malformed(format!(
                    "namespace `{name}` not present (available: {})",
                    namespaces.join(", ")
                ))
            })
        };
        let from_col = column(from)?;
        let to_col = column(to)?;

        let mut classes = HashMap::new();
        for (number, line) in lines.enumerate() {
            // v2 members and properties are indented; v1 members use other tags
            if indented && line.starts_with('\t') {
                continue;
            }
            let mut parts = line.split('\t');
            if parts.next() != Some(class_tag) {
                continue;
            }
            let names: Vec<&str> = parts.collect();
            if names.len() < namespaces.len() {
                return Err(malformed(format!(
                    "line {}: expected {} class names, found {}",
                    number + 2,
                    namespaces.len(),
                    names.len()
                )));
            }
            // An empty name means the class keeps its first-namespace name.
            let name = |col: usize| match names[col] {
                "" => names[0],
                n => n,
            };
            let (source, target) = (name(from_col), name(to_col));
            if source != target {
                classes.insert(source.to_string(), target.to_string());
            }
        }

        tracing::debug!("loaded {} class mappings ({from} -> {to})", classes.len());
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
            classes,
        })
    }

    /// Load from a mappings jar containing [`TINY_ENTRY`], or from a bare
    /// Tiny file.
    pub fn from_file(path: &Path, from: &str, to: &str) -> miette::Result<Self> {
        let unreadable = |e: &dyn std::fmt::Display| TerraError::Packaging {
            message: format!("cannot read mappings {}: {e}", path.display()),
        };
        let mut bytes = Vec::new();
        File::open(path)
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .map_err(|e| unreadable(&e))?;

        let text = if bytes.starts_with(b"PK") {
            let mut archive =
                zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| unreadable(&e))?;
            let mut entry = archive.by_name(TINY_ENTRY).map_err(|e| unreadable(&e))?;
            let mut text = String::new();
            entry.read_to_string(&mut text).map_err(|e| unreadable(&e))?;
            text
        } else {
            String::from_utf8(bytes).map_err(|e| unreadable(&e))?
        };
        Self::parse_tiny(&text, from, to)
    }

    /// Mapped name of an internal class name, if it is mapped.
    pub fn get(&self, internal: &str) -> Option<&str> {
        self.classes.get(internal).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

fn malformed(message: String) -> miette::Report {
    TerraError::Packaging {
        message: format!("malformed Tiny mappings: {message}"),
    }
    .into()
}
