//! Placeholder syntax for referencing catalog values.
//!
//! - `$ident` references a sibling key in the enclosing namespace.
//! - `${A.B.c}` references an absolute key path; `${ident}` is relative.
//! - `$$` is a literal `$`; any other lone `$` is kept verbatim.

use thiserror::Error;

use crate::key_path::{is_valid_segment, KeyPath};

/// Errors produced while parsing a placeholder template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
    #[error("unterminated placeholder `${{` in `{input}`")]
    Unterminated { input: String },

    #[error("invalid placeholder `${{{inner}}}` in `{input}`")]
    InvalidPath { inner: String, input: String },
}

/// A reference to another catalog value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    path: KeyPath,
    relative: bool,
}

impl Reference {
    /// The path as written in the template.
    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    /// Whether the reference is resolved against the enclosing namespace.
    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// The absolute key path this reference points to when it appears in
    /// `namespace` (`None` for top-level values).
    pub fn resolve_in(&self, namespace: Option<&KeyPath>) -> KeyPath {
        match (self.relative, namespace) {
            (true, Some(ns)) => ns.child(self.path.leaf()),
            _ => self.path.clone(),
        }
    }
}

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Reference(Reference),
}

/// A string split into literal text and catalog references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `input` into literal and reference segments.
    pub fn parse(input: &str) -> Result<Self, PlaceholderError> {
        let chars: Vec<char> = input.chars().collect();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] != '$' {
                literal.push(chars[i]);
                i += 1;
                continue;
            }

            match chars.get(i + 1) {
                Some('$') => {
                    literal.push('$');
                    i += 2;
                }
                Some('{') => {
                    let Some(close) = chars[i + 2..].iter().position(|&c| c == '}') else {
                        return Err(PlaceholderError::Unterminated {
                            input: input.to_string(),
                        });
                    };
                    let inner: String = chars[i + 2..i + 2 + close].iter().collect();
                    let parts: Vec<&str> = inner.split('.').collect();
                    if parts.iter().any(|p| !is_valid_segment(p)) {
                        return Err(PlaceholderError::InvalidPath {
                            inner,
                            input: input.to_string(),
                        });
                    }
                    let path = KeyPath::from_segments(parts).map_err(|_| {
                        PlaceholderError::InvalidPath {
                            inner: inner.clone(),
                            input: input.to_string(),
                        }
                    })?;
                    flush(&mut literal, &mut segments);
                    segments.push(Segment::Reference(Reference {
                        relative: path.len() == 1,
                        path,
                    }));
                    i += close + 3;
                }
                Some(&c) if c.is_ascii_alphabetic() || c == '_' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                    {
                        end += 1;
                    }
                    let ident: String = chars[start..end].iter().collect();
                    flush(&mut literal, &mut segments);
                    segments.push(Segment::Reference(Reference {
                        path: KeyPath::single(&ident),
                        relative: true,
                    }));
                    i = end;
                }
                _ => {
                    literal.push('$');
                    i += 1;
                }
            }
        }

        flush(&mut literal, &mut segments);
        Ok(Self { segments })
    }

    /// All parsed segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// All references in order of appearance.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Reference(r) => Some(r),
            Segment::Literal(_) => None,
        })
    }

    /// `true` when the template contains no references.
    pub fn is_literal(&self) -> bool {
        self.references().next().is_none()
    }

    /// Substitute every reference, left to right, with the value `lookup`
    /// returns for it. Substituted values are not re-scanned.
    pub fn render<F>(&self, mut lookup: F) -> miette::Result<String>
    where
        F: FnMut(&Reference) -> miette::Result<String>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Reference(r) => out.push_str(&lookup(r)?),
            }
        }
        Ok(out)
    }
}

fn flush(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}
