//! Merging bundled jars into one set of archive entries.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use terrabuild_util::errors::TerraError;

const SERVICES_PREFIX: &str = "META-INF/services/";
const SIGNATURE_EXTENSIONS: [&str; 4] = [".SF", ".DSA", ".RSA", ".EC"];

/// One file of the output archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub data: Vec<u8>,
}

impl Entry {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn is_class(&self) -> bool {
        self.name.ends_with(".class")
    }
}

/// Accumulates entries from jars in order. The first occurrence of a path
/// wins, except service files, which are merged.
#[derive(Debug)]
pub struct Shader {
    exclude: GlobSet,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Shader {
    /// A shader dropping entries that match any of `exclude`.
    pub fn new(exclude: &[String]) -> miette::Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude {
            let glob = Glob::new(pattern).map_err(|e| TerraError::Packaging {
                message: format!("invalid exclude pattern `{pattern}`: {e}"),
            })?;
            builder.add(glob);
        }
        let exclude = builder.build().map_err(|e| TerraError::Packaging {
            message: format!("invalid exclude patterns: {e}"),
        })?;
        Ok(Self {
            exclude,
            entries: Vec::new(),
            index: HashMap::new(),
        })
    }

    /// Add every file of the jar at `path`. Returns how many entries were
    /// kept from it.
    pub fn add_jar(&mut self, path: &Path) -> miette::Result<usize> {
        let unreadable = |e: &dyn std::fmt::Display| TerraError::Packaging {
            message: format!("cannot read jar {}: {e}", path.display()),
        };
        let file = File::open(path).map_err(|e| unreadable(&e))?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| unreadable(&e))?;

        let mut kept = 0;
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|e| unreadable(&e))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).map_err(|e| unreadable(&e))?;
            if self.add(Entry::new(name, data)) {
                kept += 1;
            }
        }
        tracing::debug!("shaded {kept} entries from {}", path.display());
        Ok(kept)
    }

    /// Add one entry. Returns whether it changed the output.
    pub fn add(&mut self, entry: Entry) -> bool {
        if entry.name.ends_with('/') || is_dropped(&entry.name) || self.exclude.is_match(&entry.name) {
            return false;
        }
        match self.index.get(&entry.name).copied() {
            Some(existing) if entry.name.starts_with(SERVICES_PREFIX) => {
                merge_services(&mut self.entries[existing].data, &entry.data)
            }
            Some(_) => {
                tracing::debug!("duplicate entry {} ignored", entry.name);
                false
            }
            None => {
                self.index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
                true
            }
        }
    }

    pub fn finish(self) -> Vec<Entry> {
        self.entries
    }
}

/// Shade `jars` in order into a list of entries.
pub fn shade(jars: &[impl AsRef<Path>], exclude: &[String]) -> miette::Result<Vec<Entry>> {
    let mut shader = Shader::new(exclude)?;
    for jar in jars {
        shader.add_jar(jar.as_ref())?;
    }
    Ok(shader.finish())
}

/// The jar manifest and signature files never survive shading.
fn is_dropped(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    if upper == "META-INF/MANIFEST.MF" {
        return true;
    }
    match upper.strip_prefix("META-INF/") {
        Some(rest) => {
            !rest.contains('/') && SIGNATURE_EXTENSIONS.iter().any(|ext| rest.ends_with(ext))
        }
        None => false,
    }
}

/// Append the provider lines of `extra` not already in `existing`.
fn merge_services(existing: &mut Vec<u8>, extra: &[u8]) -> bool {
    let current = String::from_utf8_lossy(existing).into_owned();
    let mut lines: Vec<&str> = current
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let before = lines.len();
    let extra = String::from_utf8_lossy(extra);
    for line in extra.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !lines.contains(&line) {
            lines.push(line);
        }
    }
    if lines.len() == before {
        return false;
    }
    let mut merged = lines.join("\n");
    merged.push('\n');
    *existing = merged.into_bytes();
    true
}
