//! GitHub releases REST API.

use std::time::Duration;

use reqwest::header;

use super::{Release, ResolveError, VersionSelector};
use crate::USER_AGENT;

pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Accept header for the release-info endpoints.
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Release metadata is small; a response that stalls mid-body must not hang
/// the operation. Asset downloads are streamed elsewhere without this bound.
const METADATA_TIMEOUT: Duration = Duration::from_secs(60);

pub struct GithubProvider {
    base_url: String,
    timeout: Duration,
}

impl GithubProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: METADATA_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `releases/latest` or `releases/tags/{tag}`, where the tag is the
    /// selector prefixed by the binary's literal tag prefix.
    pub fn release_url(
        &self,
        provider_path: &str,
        selector: &VersionSelector,
        tag_prefix: Option<&str>,
    ) -> String {
        match selector {
            VersionSelector::Latest => {
                format!("{}/repos/{}/releases/latest", self.base_url, provider_path)
            }
            VersionSelector::Tag(tag) => {
                let prefix = tag_prefix.unwrap_or("");
                format!(
                    "{}/repos/{}/releases/tags/{}{}",
                    self.base_url, provider_path, prefix, tag
                )
            }
        }
    }

    pub async fn fetch_release(
        &self,
        client: &reqwest::Client,
        token: Option<&str>,
        provider_path: &str,
        selector: &VersionSelector,
        tag_prefix: Option<&str>,
    ) -> Result<Release, ResolveError> {
        let url = self.release_url(provider_path, selector, tag_prefix);
        tracing::debug!(%url, "fetching release metadata");

        let mut request = client
            .get(&url)
            .timeout(self.timeout)
            .header(header::ACCEPT, GITHUB_ACCEPT)
            .header(header::USER_AGENT, USER_AGENT);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::UpstreamStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("json") {
            return Err(ResolveError::UpstreamContent(content_type));
        }

        Ok(response.json::<Release>().await?)
    }
}

impl Default for GithubProvider {
    fn default() -> Self {
        Self::new(GITHUB_API_BASE)
    }
}
