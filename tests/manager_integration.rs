//! End-to-end exercise of the coordinator against a mocked HTTP mirror.

use std::sync::Arc;

use pymget_core::config::Config;
use pymget_core::console::{Console, TerminalConsole};
use pymget_core::manager::Manager;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY: &[u8] = b"the quick brown fox jumps over the lazy dog, 32 more bytes";

#[tokio::test]
async fn downloads_whole_file_from_a_single_mirror() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/file.bin"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Content-Length", BODY.len().to_string()),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Length", BODY.len().to_string())
                .set_body_bytes(BODY),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("file.bin");

    let console: Arc<dyn Console> = Arc::new(TerminalConsole::new());

    let config = Config::build(
        vec![format!("{}/file.bin", server.uri())],
        &BODY.len().to_string(),
        5,
        None,
        out_path.to_str().unwrap().to_string(),
        console.as_ref(),
    )
    .unwrap();

    let mut manager = Manager::new(config, console).await.unwrap();
    manager.download().await.unwrap();

    let written = tokio::fs::read(&out_path).await.unwrap();
    assert_eq!(written, BODY);
    let mut sidecar = out_path.into_os_string();
    sidecar.push(".pymget");
    assert!(!std::path::Path::new(&sidecar).exists());
}

#[tokio::test]
async fn all_mirrors_failing_is_a_fatal_error() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("file.bin");

    let console: Arc<dyn Console> = Arc::new(TerminalConsole::new());

    let config = Config::build(
        vec![format!("{}/file.bin", server.uri())],
        "64",
        5,
        None,
        out_path.to_str().unwrap().to_string(),
        console.as_ref(),
    )
    .unwrap();

    let mut manager = Manager::new(config, console).await.unwrap();
    let result = manager.download().await;
    assert!(result.is_err());
}
