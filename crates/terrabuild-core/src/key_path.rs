//! Dotted key paths into the version catalog (`Libraries.Internal.fastutil`).

use std::fmt;
use std::str::FromStr;

use terrabuild_util::errors::TerraError;

/// A non-empty sequence of catalog namespace segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parse a dot-separated path such as `Fabric.minecraft`.
    pub fn parse(input: &str) -> miette::Result<Self> {
        Self::from_segments(input.split('.'))
    }

    /// Build a path from individual segments, validating each one.
    pub fn from_segments<I, S>(segments: I) -> miette::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| !is_valid_segment(s)) {
            return Err(TerraError::Manifest {
                message: format!("Invalid catalog key path `{}`", segments.join(".")),
            }
            .into());
        }
        Ok(Self { segments })
    }

    /// The segments of this path, outermost namespace first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; key paths have at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment (the value name inside its namespace).
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The enclosing namespace, or `None` for a top-level key.
    pub fn namespace(&self) -> Option<KeyPath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append a segment. The caller guarantees the segment is valid.
    pub fn child(&self, segment: &str) -> KeyPath {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    /// A single-segment path. The caller guarantees the segment is valid.
    pub(crate) fn single(segment: &str) -> KeyPath {
        Self {
            segments: vec![segment.to_string()],
        }
    }

    /// Whether `self` is `other` or lies inside it.
    pub fn starts_with(&self, other: &KeyPath) -> bool {
        self.segments.starts_with(&other.segments)
    }
}

/// Segments are non-empty and free of whitespace and placeholder syntax.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '.' | '$' | '{' | '}'))
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl serde::Serialize for KeyPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for KeyPath {
    type Err = miette::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_path() {
        let path = KeyPath::parse("Libraries.Internal.fastutil").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.leaf(), "fastutil");
        assert_eq!(path.namespace().unwrap().to_string(), "Libraries.Internal");
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(KeyPath::parse("").is_err());
        assert!(KeyPath::parse("Fabric.").is_err());
        assert!(KeyPath::parse("Fabric..yarn").is_err());
    }

    #[test]
    fn rejects_placeholder_characters() {
        assert!(KeyPath::parse("Fabric.$yarn").is_err());
        assert!(KeyPath::parse("Fab ric").is_err());
    }

    #[test]
    fn top_level_key_has_no_namespace() {
        let path = KeyPath::parse("version").unwrap();
        assert!(path.namespace().is_none());
    }

    #[test]
    fn starts_with_namespace() {
        let path = KeyPath::parse("Libraries.Internal.jafama").unwrap();
        assert!(path.starts_with(&KeyPath::parse("Libraries").unwrap()));
        assert!(!path.starts_with(&KeyPath::parse("Fabric").unwrap()));
    }
}
