//! Repository authentication.
//!
//! Credentials come from `[repositories]` in `Terrabuild.toml`, usually via
//! `${env:SECRET}` interpolation from `.terrabuild.env`:
//!
//! ```toml
//! [repositories]
//! private = { url = "https://nexus.example/maven", username = "${env:NEXUS_USER}", password = "${env:NEXUS_PASS}" }
//! ```

use reqwest::RequestBuilder;

use crate::repository::Credentials;

/// Attach `credentials` to an outgoing request.
pub fn apply_auth(request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
    match credentials {
        Credentials::None => request,
        Credentials::Basic { username, password } => {
            request.basic_auth(username, password.as_deref())
        }
        Credentials::Bearer(token) => request.bearer_auth(token),
    }
}
