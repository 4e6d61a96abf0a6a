//! One-shot blocking client for the instance metadata server.

use reqwest::blocking::{Client, Response};

use crate::LoggerError;

/// Base URL of the metadata server as seen from inside Google Cloud.
pub const METADATA_BASE_URL: &str = "http://metadata.google.internal/computeMetadata/v1";

const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR: &str = "Google";

/// Fetches the project and region of the running instance.
///
/// Requests block the calling thread; do not call from within an async runtime.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: Client,
    base_url: String,
}

impl MetadataClient {
    /// Creates a client for [`METADATA_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::HttpClient`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, LoggerError> {
        Self::with_base_url(METADATA_BASE_URL)
    }

    /// Creates a client for a custom metadata server location.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::HttpClient`] if the HTTP client cannot be built.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, LoggerError> {
        let client = Client::builder().build().map_err(LoggerError::HttpClient)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// The project ID, e.g. `acme-prod`.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError`] if the request fails or the server returns an empty value.
    pub fn project_id(&self) -> Result<String, LoggerError> {
        self.get("project/project-id")
    }

    /// The region, e.g. `europe-west1`.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError`] if the request fails or the server returns an empty value.
    pub fn region(&self) -> Result<String, LoggerError> {
        let path = "instance/region";
        let value = self.get(path)?;
        region_from_path(&value)
            .map(str::to_owned)
            .ok_or_else(|| LoggerError::EmptyMetadataValue(path.to_owned()))
    }

    fn get(&self, path: &str) -> Result<String, LoggerError> {
        let url = format!("{}/{path}", self.base_url.trim_end_matches('/'));
        tracing::debug!(%url, "Querying metadata server");

        let body = self
            .client
            .get(&url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR)
            .send()
            .and_then(Response::error_for_status)
            .and_then(Response::text)
            .map_err(|source| LoggerError::MetadataRequest {
                path: path.to_owned(),
                source,
            })?;

        let value = body.trim();
        if value.is_empty() {
            return Err(LoggerError::EmptyMetadataValue(path.to_owned()));
        }

        Ok(value.to_owned())
    }
}

/// The metadata server reports the region as `projects/<number>/regions/<region>`.
fn region_from_path(value: &str) -> Option<&str> {
    value
        .rsplit('/')
        .next()
        .filter(|region| !region.is_empty())
}
