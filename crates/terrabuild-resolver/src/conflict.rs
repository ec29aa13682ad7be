//! Version conflicts recorded while resolving.

use std::fmt;

use crate::version;

/// Every request that lost to an already selected version.
#[derive(Debug, Default, Clone)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// One `group:artifact[:classifier]` requested at a version other than the
/// one that was selected.
#[derive(Debug, Clone)]
pub struct VersionConflict {
    pub key: String,
    pub requested: String,
    pub resolved: String,
    /// Coordinate whose POM (or declaration) made the losing request.
    pub requested_by: Option<String>,
    pub reason: String,
}

impl VersionConflict {
    /// Whether the losing request asked for a newer version than the one
    /// selected. Incomparable versions are never reported as newer.
    pub fn newer_ignored(&self) -> bool {
        version::is_newer(&self.requested, &self.resolved)
    }
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: VersionConflict) {
        if conflict.newer_ignored() {
            tracing::warn!("{conflict}");
        } else {
            tracing::debug!("{conflict}");
        }
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn for_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a VersionConflict> {
        self.conflicts.iter().filter(move |c| c.key == key)
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requested {} but resolved {} ({})",
            self.key, self.requested, self.resolved, self.reason
        )?;
        if let Some(by) = &self.requested_by {
            write!(f, " via {by}")?;
        }
        if self.newer_ignored() {
            write!(f, "; newer version ignored")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(requested: &str, resolved: &str) -> VersionConflict {
        VersionConflict {
            key: "org.example:lib".to_string(),
            requested: requested.to_string(),
            resolved: resolved.to_string(),
            requested_by: Some("org.example:app:1.0".to_string()),
            reason: "nearest wins (depth 1 vs 2)".to_string(),
        }
    }

    #[test]
    fn empty_report() {
        let report = ConflictReport::new();
        assert!(report.is_empty());
        assert_eq!(report.len(), 0);
        assert_eq!(report.to_string(), "No version conflicts.");
    }

    #[test]
    fn report_with_conflicts() {
        let mut report = ConflictReport::new();
        report.add(conflict("2.0", "1.0"));
        assert_eq!(report.len(), 1);
        let s = report.to_string();
        assert!(s.contains("org.example:lib requested 2.0 but resolved 1.0"));
        assert!(s.contains("via org.example:app:1.0"));
        assert!(s.contains("newer version ignored"));
        assert_eq!(report.for_key("org.example:lib").count(), 1);
        assert_eq!(report.for_key("org.example:other").count(), 0);
    }

    #[test]
    fn older_request_is_not_flagged() {
        let c = conflict("1.0", "2.0");
        assert!(!c.newer_ignored());
        assert!(!c.to_string().contains("newer"));
    }

    #[test]
    fn incomparable_versions_are_not_flagged() {
        assert!(!conflict("LATEST", "1.0").newer_ignored());
    }
}
