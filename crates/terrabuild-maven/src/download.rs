//! Artifact transfer from Maven repositories, over HTTP or from a local
//! directory.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use terrabuild_util::errors::TerraError;

use crate::auth;
use crate::repository::{MavenRepository, RepositoryLocation};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const PROGRESS_THRESHOLD: u64 = 100_000;

/// Build a shared reqwest client for Maven downloads.
pub fn build_client() -> miette::Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("terrabuild/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            TerraError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// Read `relative` (a Maven layout path) from `repo`.
///
/// Returns `Ok(None)` when the repository doesn't have the file. `label`
/// enables a progress bar for large HTTP downloads.
pub async fn fetch_file(
    client: &Client,
    repo: &MavenRepository,
    relative: &str,
    label: Option<&str>,
) -> miette::Result<Option<Vec<u8>>> {
    match &repo.location {
        RepositoryLocation::Directory(root) => {
            let path = root.join(relative);
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    tracing::debug!("read {} from local repository", path.display());
                    Ok(Some(bytes))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(TerraError::Io(e).into()),
            }
        }
        RepositoryLocation::Http(base) => {
            let url = format!("{base}/{relative}");
            download_bytes(client, repo, &url, label).await
        }
    }
}

/// Read a text file (POM, checksum sidecar) from `repo`.
pub async fn fetch_text(
    client: &Client,
    repo: &MavenRepository,
    relative: &str,
) -> miette::Result<Option<String>> {
    Ok(fetch_file(client, repo, relative, None)
        .await?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

/// Download raw bytes from a URL, with authentication and retries.
///
/// Server errors, timeouts and connection failures are retried. Returns
/// `Ok(None)` for 404; any other non-success status is an error.
pub async fn download_bytes(
    client: &Client,
    repo: &MavenRepository,
    url: &str,
    label: Option<&str>,
) -> miette::Result<Option<Vec<u8>>> {
    let mut last_err = String::new();

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tracing::debug!("retrying {url} (attempt {})", attempt + 1);
            tokio::time::sleep(RETRY_DELAY * attempt).await;
        }

        let request = auth::apply_auth(client.get(url), &repo.credentials);

        let resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_err = e.to_string();
                continue;
            }
            Err(e) => {
                return Err(TerraError::Network {
                    message: format!("Request to {url} failed: {e}"),
                }
                .into());
            }
        };

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status.is_server_error() {
            last_err = format!("HTTP {status} from {url}");
            continue;
        }
        if !status.is_success() {
            return Err(TerraError::Network {
                message: format!("HTTP {status} fetching {url}"),
            }
            .into());
        }

        let progress = match (label, resp.content_length()) {
            (Some(label), Some(total)) if total > PROGRESS_THRESHOLD => {
                Some(progress_bar(total, label))
            }
            _ => None,
        };

        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) if e.is_timeout() => {
                last_err = e.to_string();
                if let Some(pb) = progress {
                    pb.finish_and_clear();
                }
                continue;
            }
            Err(e) => {
                return Err(TerraError::Network {
                    message: format!("Failed to read response from {url}: {e}"),
                }
                .into());
            }
        };

        if let Some(pb) = progress {
            pb.set_position(bytes.len() as u64);
            pb.finish_and_clear();
        }
        return Ok(Some(bytes.to_vec()));
    }

    Err(TerraError::Network {
        message: format!("Failed after {MAX_RETRIES} attempts for {url}: {last_err}"),
    }
    .into())
}

fn progress_bar(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template("  {msg} {bar:30.cyan/dim} {bytes}/{total_bytes}")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message(label.to_string());
    pb
}
