//! Asset fetching.
//!
//! Archives are streamed into a temporary file in the system temp directory
//! and renamed into the user cache once complete, so a crashed download
//! never leaves a partial file at the cache path.

use std::io::Write;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::{Client, header};
use thiserror::Error;

use crate::USER_AGENT;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
}

/// Read the credential for a provider from `<PROVIDER>_TOKEN` (e.g.
/// `GITHUB_TOKEN`). Returns `None` when the binary is not flagged
/// authenticated.
pub fn provider_token(
    provider: &str,
    authenticated: bool,
) -> Result<Option<String>, DownloadError> {
    if !authenticated {
        return Ok(None);
    }
    let var = format!("{}_TOKEN", provider.to_uppercase());
    match std::env::var(&var) {
        Ok(token) if !token.is_empty() => Ok(Some(token)),
        _ => Err(DownloadError::MissingCredential(var)),
    }
}

/// Build the shared HTTP client: finite timeout on connection setup, none
/// overall so large assets can stream as long as they make progress.
pub fn build_client() -> Result<Client, DownloadError> {
    Ok(Client::builder()
        .connect_timeout(std::time::Duration::from_secs(30))
        .build()?)
}

/// Download `url` into `<cache_dir>/<asset_name>`, returning the final path.
pub async fn download(
    client: &Client,
    url: &str,
    asset_name: &str,
    token: Option<&str>,
    cache_dir: &Path,
) -> Result<PathBuf, DownloadError> {
    let mut request = client.get(url).header(header::USER_AGENT, USER_AGENT);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::UpstreamStatus(status.as_u16()));
    }

    // Stage in the system temp dir; the file is removed on drop if any
    // write fails mid-stream.
    let mut staged = tempfile::NamedTempFile::new()?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        staged.write_all(&chunk)?;
        written += chunk.len() as u64;
    }
    staged.flush()?;

    std::fs::create_dir_all(cache_dir)?;
    let dest = cache_dir.join(asset_name);
    persist(staged, &dest)?;

    tracing::debug!(%url, bytes = written, dest = %dest.display(), "download complete");
    Ok(dest)
}

/// Rename into place; fall back to copy-then-unlink when the temp dir and
/// cache live on different filesystems.
fn persist(staged: tempfile::NamedTempFile, dest: &Path) -> Result<(), DownloadError> {
    match staged.persist(dest) {
        Ok(_) => Ok(()),
        Err(err) => {
            let staged = err.file;
            std::fs::copy(staged.path(), dest)?;
            // NamedTempFile unlinks its path on drop.
            drop(staged);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::tempdir;

    #[tokio::test]
    async fn downloads_to_cache_path() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/assets/tool.tar.gz")
            .with_status(200)
            .with_body(b"archive bytes")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let client = Client::new();
        let url = format!("{}/assets/tool.tar.gz", server.url());
        let path = download(&client, &url, "tool.tar.gz", None, dir.path())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("tool.tar.gz"));
        assert_eq!(std::fs::read(&path).unwrap(), b"archive bytes");
    }

    #[tokio::test]
    async fn non_2xx_fails_without_writing_cache() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/assets/tool.tar.gz")
            .with_status(500)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let client = Client::new();
        let url = format!("{}/assets/tool.tar.gz", server.url());
        let err = download(&client, &url, "tool.tar.gz", None, dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::UpstreamStatus(500)));
        assert!(!dir.path().join("tool.tar.gz").exists());
    }

    #[tokio::test]
    async fn bearer_token_is_sent_when_provided() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/assets/tool.tar.gz")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body(b"ok")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let client = Client::new();
        let url = format!("{}/assets/tool.tar.gz", server.url());
        let path = download(&client, &url, "tool.tar.gz", Some("secret"), dir.path())
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"ok");
    }

    #[test]
    fn provider_token_reads_env() {
        // Unauthenticated binaries never consult the environment.
        assert!(provider_token("github", false).unwrap().is_none());

        unsafe { std::env::remove_var("EXAMPLEFORGE_TOKEN") };
        assert!(matches!(
            provider_token("exampleforge", true),
            Err(DownloadError::MissingCredential(var)) if var == "EXAMPLEFORGE_TOKEN"
        ));

        unsafe { std::env::set_var("EXAMPLEFORGE_TOKEN", "tok") };
        assert_eq!(
            provider_token("exampleforge", true).unwrap().as_deref(),
            Some("tok")
        );
        unsafe { std::env::remove_var("EXAMPLEFORGE_TOKEN") };
    }
}
