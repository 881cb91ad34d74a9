//! End-to-end lifecycle flows against a mock GitHub API and a temp
//! directory layout.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use tempfile::TempDir;

use armory::layout::Layout;
use armory::ops::{self, CheckOutcome, EngineContext, EngineError};
use armory::resolver::{GithubProvider, ProviderRegistry};
use armory::store::{BinaryDescriptor, BinarySource, Store, StoreError};
use armory::types::{ArchiveFormat, Platform};

fn test_ctx(server_url: &str, root: &TempDir) -> EngineContext {
    let layout = Layout::rooted_at(root.path());
    let store = Store::open_at(&layout.db_path()).unwrap();
    EngineContext::new(
        store,
        reqwest::Client::new(),
        ProviderRegistry::with_github(GithubProvider::new(server_url)),
        layout,
        Platform::new("linux", "amd64"),
    )
}

fn descriptor(user_id: &str) -> BinaryDescriptor {
    BinaryDescriptor {
        user_id: user_id.to_string(),
        name: user_id.to_string(),
        alias: None,
        provider: "github".to_string(),
        provider_path: format!("acme/{user_id}"),
        asset_regex: None,
        tag_prefix: None,
        install_path: None,
        format: ArchiveFormat::TarGz,
        authenticated: false,
    }
}

/// A gzipped tar holding one executable at `<dir>/<name>`.
fn tar_gz_with(name: &str, contents: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(flate2::write::GzEncoder::new(
        Vec::new(),
        flate2::Compression::default(),
    ));
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
        .append_data(&mut header, format!("pkg/{name}"), contents)
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

fn sha256_wire(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

fn release_json(server_url: &str, tag: &str, asset_name: &str, digest: Option<&str>) -> String {
    serde_json::json!({
        "name": format!("release {tag}"),
        "tag_name": tag,
        "assets": [{
            "id": 1,
            "name": asset_name,
            "content_type": "application/gzip",
            "size": 128,
            "digest": digest,
            "browser_download_url": format!("{server_url}/dl/{asset_name}"),
        }]
    })
    .to_string()
}

#[cfg(unix)]
fn assert_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(path).unwrap().permissions().mode();
    assert_ne!(mode & 0o111, 0, "{} is not executable", path.display());
}

#[tokio::test]
async fn install_latest_extracts_links_and_records() {
    let mut server = mockito::Server::new_async().await;
    let root = TempDir::new().unwrap();
    let ctx = test_ctx(&server.url(), &root);
    let binary = ctx
        .store
        .create_binary(&descriptor("tool"), BinarySource::Manual, 0)
        .unwrap();

    let archive = tar_gz_with("tool", b"#!/bin/sh\necho one\n");
    let digest = sha256_wire(&archive);
    server
        .mock("GET", "/repos/acme/tool/releases/latest")
        .with_header("content-type", "application/json")
        .with_body(release_json(
            &server.url(),
            "v1.0.0",
            "tool-v1.0.0-linux-amd64.tar.gz",
            Some(&digest),
        ))
        .create_async()
        .await;
    let asset_mock = server
        .mock("GET", "/dl/tool-v1.0.0-linux-amd64.tar.gz")
        .with_body(&archive)
        .expect(1)
        .create_async()
        .await;

    let outcome = ops::install(&ctx, "tool", "latest").await.unwrap();
    assert!(!outcome.already_installed);
    assert_eq!(outcome.version, "v1.0.0");

    // Payload extracted into the versioned directory, executable.
    let payload = outcome.installation.installed_path.as_path();
    assert!(payload.starts_with(ctx.layout.version_dir("tool", "v1.0.0")));
    let payload_bytes = fs::read(payload).unwrap();
    assert_eq!(payload_bytes, b"#!/bin/sh\necho one\n");
    #[cfg(unix)]
    assert_executable(payload);

    // The recorded checksum is the hash of the extracted bytes, not of the
    // archive they came in.
    assert_eq!(
        outcome.installation.checksum,
        hex::encode(Sha256::digest(&payload_bytes))
    );

    // Symlink flipped to the payload.
    let link = ctx.layout.bin_dir().join("tool");
    assert_eq!(fs::read_link(&link).unwrap(), payload.to_path_buf());

    // Rows recorded: installation, active version, completed download.
    let active = ctx
        .store
        .get_active_with_installation(binary.id)
        .unwrap()
        .unwrap();
    assert_eq!(active.installation.version, "v1.0.0");
    let download = ctx.store.get_download(binary.id, "v1.0.0").unwrap().unwrap();
    assert!(download.is_complete);

    // Reinstalling the same version short-circuits before any download.
    let again = ops::install(&ctx, "tool", "latest").await.unwrap();
    assert!(again.already_installed);
    assert_eq!(again.installation.id, outcome.installation.id);
    asset_mock.assert_async().await;
}

#[tokio::test]
async fn tagged_install_and_switch_flip_symlink() {
    let mut server = mockito::Server::new_async().await;
    let root = TempDir::new().unwrap();
    let ctx = test_ctx(&server.url(), &root);
    ctx.store
        .create_binary(&descriptor("tool"), BinarySource::Manual, 0)
        .unwrap();

    for (tag, body) in [("v1", b"one".as_slice()), ("v2", b"two".as_slice())] {
        let archive = tar_gz_with("tool", body);
        let asset_name = format!("tool-{tag}-linux-amd64.tar.gz");
        server
            .mock("GET", format!("/repos/acme/tool/releases/tags/{tag}").as_str())
            .with_header("content-type", "application/json")
            .with_body(release_json(&server.url(), tag, &asset_name, None))
            .create_async()
            .await;
        server
            .mock("GET", format!("/dl/{asset_name}").as_str())
            .with_body(&archive)
            .create_async()
            .await;
    }

    ops::install(&ctx, "tool", "v1").await.unwrap();
    let v2 = ops::install(&ctx, "tool", "v2").await.unwrap();

    let link = ctx.layout.bin_dir().join("tool");
    assert_eq!(
        fs::read_link(&link).unwrap(),
        v2.installation.installed_path.as_path().to_path_buf()
    );
    assert_eq!(fs::read(&link).unwrap(), b"two");

    // Switch back without touching the network.
    let installation = ops::switch(&ctx, "tool", "v1").unwrap();
    assert_eq!(installation.version, "v1");
    assert_eq!(fs::read(&link).unwrap(), b"one");

    // Switching to a version never installed fails and leaves the link.
    let err = ops::switch(&ctx, "tool", "v9").unwrap_err();
    assert!(matches!(
        err,
        EngineError::Context { source, .. }
            if matches!(*source, EngineError::VersionNotInstalled { .. })
    ));
    assert_eq!(fs::read(&link).unwrap(), b"one");
}

#[tokio::test]
async fn digest_mismatch_aborts_before_any_user_visible_change() {
    let mut server = mockito::Server::new_async().await;
    let root = TempDir::new().unwrap();
    let ctx = test_ctx(&server.url(), &root);
    let binary = ctx
        .store
        .create_binary(&descriptor("tool"), BinarySource::Manual, 0)
        .unwrap();

    let archive = tar_gz_with("tool", b"payload");
    let wrong = format!("sha256:{}", "ab".repeat(32));
    server
        .mock("GET", "/repos/acme/tool/releases/latest")
        .with_header("content-type", "application/json")
        .with_body(release_json(
            &server.url(),
            "v1",
            "tool-v1-linux-amd64.tar.gz",
            Some(&wrong),
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/dl/tool-v1-linux-amd64.tar.gz")
        .with_body(&archive)
        .create_async()
        .await;

    let err = ops::install(&ctx, "tool", "latest").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Context { source, .. } if matches!(*source, EngineError::Verify(_))
    ));

    // No payload, no symlink, no installation row.
    assert!(!ctx.layout.binary_versions_dir("tool").exists());
    assert!(!ctx.layout.bin_dir().join("tool").exists());
    assert!(matches!(
        ctx.store.get_installation(binary.id, "v1"),
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn remove_with_files_deletes_rows_and_payloads() {
    let mut server = mockito::Server::new_async().await;
    let root = TempDir::new().unwrap();
    let ctx = test_ctx(&server.url(), &root);
    let binary = ctx
        .store
        .create_binary(&descriptor("tool"), BinarySource::Manual, 0)
        .unwrap();

    let archive = tar_gz_with("tool", b"bits");
    server
        .mock("GET", "/repos/acme/tool/releases/latest")
        .with_header("content-type", "application/json")
        .with_body(release_json(
            &server.url(),
            "v1",
            "tool-v1-linux-amd64.tar.gz",
            None,
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/dl/tool-v1-linux-amd64.tar.gz")
        .with_body(&archive)
        .create_async()
        .await;

    ops::install(&ctx, "tool", "latest").await.unwrap();
    let report = ops::remove(&ctx, "tool", true).unwrap();
    assert_eq!(report.installations_removed, 1);
    assert!(report.files_removed);

    assert!(!ctx.layout.bin_dir().join("tool").exists());
    assert!(!ctx.layout.binary_versions_dir("tool").exists());
    assert!(matches!(
        ctx.store.get_binary_by_user_id("tool"),
        Err(StoreError::NotFound(_))
    ));
    // Cascade took the dependent rows.
    assert!(ctx.store.get_active_version(binary.id).unwrap().is_none());
    assert!(ctx.store.list_installations(binary.id).unwrap().is_empty());
}

#[tokio::test]
async fn check_reports_freshness_against_latest() {
    let mut server = mockito::Server::new_async().await;
    let root = TempDir::new().unwrap();
    let ctx = test_ctx(&server.url(), &root);
    ctx.store
        .create_binary(&descriptor("tool"), BinarySource::Manual, 0)
        .unwrap();

    server
        .mock("GET", "/repos/acme/tool/releases/latest")
        .with_header("content-type", "application/json")
        .with_body(release_json(
            &server.url(),
            "v2",
            "tool-v2-linux-amd64.tar.gz",
            None,
        ))
        .create_async()
        .await;

    // Nothing installed yet.
    let outcome = ops::check(&ctx, "tool").await.unwrap();
    assert!(matches!(
        outcome,
        CheckOutcome::NotInstalled { ref latest } if latest == "v2"
    ));

    // Install v1 via its tag, then check again.
    let archive = tar_gz_with("tool", b"old");
    server
        .mock("GET", "/repos/acme/tool/releases/tags/v1")
        .with_header("content-type", "application/json")
        .with_body(release_json(
            &server.url(),
            "v1",
            "tool-v1-linux-amd64.tar.gz",
            None,
        ))
        .create_async()
        .await;
    server
        .mock("GET", "/dl/tool-v1-linux-amd64.tar.gz")
        .with_body(&archive)
        .create_async()
        .await;
    ops::install(&ctx, "tool", "v1").await.unwrap();

    let outcome = ops::check(&ctx, "tool").await.unwrap();
    assert!(matches!(
        outcome,
        CheckOutcome::UpdateAvailable { ref current, ref latest }
            if current == "v1" && latest == "v2"
    ));
}

#[tokio::test]
async fn add_from_url_then_config_sync_preserves_it() {
    let server = mockito::Server::new_async().await;
    let root = TempDir::new().unwrap();
    let mut ctx = test_ctx(&server.url(), &root);

    let (binary, parsed) = ops::add_from_url(
        &ctx,
        "https://github.com/acme/tool/releases/download/v1.2.0/tool-v1.2.0-linux-amd64.tar.gz",
    )
    .unwrap();
    assert_eq!(binary.user_id, "tool");
    assert_eq!(binary.provider_path, "acme/tool");
    assert_eq!(binary.source, BinarySource::Manual);
    assert_eq!(parsed.version, "v1.2.0");

    // Adding the same URL again returns the existing row.
    let (again, _) = ops::add_from_url(
        &ctx,
        "https://github.com/acme/tool/releases/download/v1.3.0/tool-v1.3.0-linux-amd64.tar.gz",
    )
    .unwrap();
    assert_eq!(again.id, binary.id);

    // A config sync that does not declare it leaves the manual row alone.
    let report = ctx
        .store
        .sync_from_config(&[descriptor("other")], 1)
        .unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.deleted, 0);
    assert!(ctx.store.get_binary_by_user_id("tool").is_ok());
}
