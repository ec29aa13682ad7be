//! Maven repository abstraction: layout, location and credentials.

use std::fmt;
use std::path::{Path, PathBuf};

use terrabuild_core::dependency::MavenCoordinate;
use terrabuild_core::manifest::RepositoryEntry;

/// Maven Central base URL.
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// Where a repository's files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryLocation {
    /// An `http://` or `https://` base URL without a trailing slash.
    Http(String),
    /// A directory in Maven layout on the local filesystem.
    Directory(PathBuf),
}

impl fmt::Display for RepositoryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => f.write_str(url),
            Self::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Credentials sent with HTTP requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    None,
    Basic {
        username: String,
        password: Option<String>,
    },
    Bearer(String),
}

/// A configured Maven repository.
#[derive(Debug, Clone)]
pub struct MavenRepository {
    pub name: String,
    pub location: RepositoryLocation,
    pub credentials: Credentials,
}

impl MavenRepository {
    /// Build a repository from a manifest entry. Relative local paths are
    /// resolved against `project_root`.
    ///
    /// `auth = "bearer"` sends the password as a bearer token; a password
    /// without a username is always a bearer token.
    pub fn from_entry(name: &str, entry: &RepositoryEntry, project_root: &Path) -> Self {
        let (url, credentials) = match entry {
            RepositoryEntry::Url(url) => (url.as_str(), Credentials::None),
            RepositoryEntry::Detailed {
                url,
                auth,
                username,
                password,
            } => {
                let bearer = auth.as_deref().is_some_and(|a| a.eq_ignore_ascii_case("bearer"));
                let credentials = match (username, password) {
                    (_, Some(token)) if bearer => Credentials::Bearer(token.clone()),
                    (None, Some(token)) => Credentials::Bearer(token.clone()),
                    (Some(user), pass) => Credentials::Basic {
                        username: user.clone(),
                        password: pass.clone(),
                    },
                    (None, None) => Credentials::None,
                };
                (url.as_str(), credentials)
            }
        };
        Self {
            name: name.to_string(),
            location: parse_location(url, project_root),
            credentials,
        }
    }

    /// Build an unauthenticated repository from a URL or path.
    pub fn from_url(name: &str, url: &str, project_root: &Path) -> Self {
        Self {
            name: name.to_string(),
            location: parse_location(url, project_root),
            credentials: Credentials::None,
        }
    }

    /// The default Maven Central repository.
    pub fn maven_central() -> Self {
        Self {
            name: "maven-central".to_string(),
            location: RepositoryLocation::Http(MAVEN_CENTRAL_URL.to_string()),
            credentials: Credentials::None,
        }
    }

    /// Standard Maven layout directory for a coordinate.
    ///
    /// `net.fabricmc:yarn:1.18.2+build.3` becomes
    /// `net/fabricmc/yarn/1.18.2+build.3`.
    pub fn coordinate_path(coordinate: &MavenCoordinate) -> String {
        format!(
            "{}/{}/{}",
            coordinate.group_id.replace('.', "/"),
            coordinate.artifact_id,
            coordinate.version
        )
    }

    /// Layout path of the coordinate's jar, relative to the repository root.
    pub fn jar_path(coordinate: &MavenCoordinate) -> String {
        format!(
            "{}/{}",
            Self::coordinate_path(coordinate),
            coordinate.jar_filename()
        )
    }

    /// Layout path of the coordinate's POM, relative to the repository root.
    pub fn pom_path(coordinate: &MavenCoordinate) -> String {
        format!(
            "{}/{}",
            Self::coordinate_path(coordinate),
            coordinate.pom_filename()
        )
    }

    /// Human-readable location of a file in this repository.
    pub fn describe(&self, relative: &str) -> String {
        match &self.location {
            RepositoryLocation::Http(url) => format!("{url}/{relative}"),
            RepositoryLocation::Directory(dir) => dir.join(relative).display().to_string(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.location, RepositoryLocation::Directory(_))
    }

    pub fn has_auth(&self) -> bool {
        self.credentials != Credentials::None
    }
}

fn parse_location(url: &str, project_root: &Path) -> RepositoryLocation {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return RepositoryLocation::Http(trimmed.to_string());
    }
    let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
    RepositoryLocation::Directory(project_root.join(path))
}
