//! Lenient version comparison on top of `semver`.
//!
//! Maven versions are often not valid semver (`1.6`, `8.5.6.1`). They are
//! normalized to three numeric components first; anything that still fails
//! to parse is considered incomparable.

use std::cmp::Ordering;

use semver::Version;

/// Parse `version` as semver, padding or folding the numeric core to
/// `major.minor.patch`.
pub fn parse_lenient(version: &str) -> Option<Version> {
    if let Ok(v) = Version::parse(version) {
        return Some(v);
    }

    let (core, suffix) = match version.find(['-', '+']) {
        Some(i) => version.split_at(i),
        None => (version, ""),
    };
    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    let extra: Vec<&str> = if parts.len() > 3 {
        parts.split_off(3)
    } else {
        Vec::new()
    };
    while parts.len() < 3 {
        parts.push("0");
    }
    let numbers: Vec<u64> = parts
        .iter()
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;

    let mut normalized = format!("{}.{}.{}", numbers[0], numbers[1], numbers[2]);
    if extra.is_empty() {
        normalized.push_str(suffix);
    } else {
        // components past the third become build metadata
        let extra = extra.join(".");
        match suffix.split_once('+') {
            Some((pre, build)) => normalized.push_str(&format!("{pre}+{extra}.{build}")),
            None => normalized.push_str(&format!("{suffix}+{extra}")),
        }
    }
    Version::parse(&normalized).ok()
}

/// Compare two version strings, or `None` if either isn't comparable.
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    Some(parse_lenient(a)?.cmp_precedence(&parse_lenient(b)?))
}

/// Whether `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare(candidate, current) == Some(Ordering::Greater)
}
