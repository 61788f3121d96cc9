//! Tests for the command line entry point

use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USAGE: &str = "No valid arguments specified. Options: [specialize startup shutdown]";

fn run(args: &[&str], config: Option<&NamedTempFile>) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_metadata-scripts"));
    command.args(args);
    match config {
        Some(file) => command.env("METADATA_SCRIPTS_CONFIG", file.path()),
        None => command.env_remove("METADATA_SCRIPTS_CONFIG"),
    };
    command.output().expect("failed to launch binary")
}

fn config_file(server: &MockServer) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "metadata_url: {}/computeMetadata/v1\nmetadata_hang_secs: 0",
        server.uri()
    )
    .unwrap();
    file
}

#[test]
fn test_invalid_arguments_print_usage() {
    for args in [
        &[][..],
        &["reboot"][..],
        &["startup", "shutdown"][..],
        &["--help"][..],
        &["STARTUP"][..],
    ] {
        let output = run(args, None);
        assert_eq!(output.status.code(), Some(1), "args: {:?}", args);
        assert_eq!(
            String::from_utf8_lossy(&output.stdout).trim(),
            USAGE,
            "args: {:?}",
            args
        );
    }
}

#[tokio::test]
async fn test_nothing_to_run_exits_zero() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/computeMetadata/v1/instance/attributes/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"foo":"bar"}"#))
        .mount(&mock_server)
        .await;

    let config = config_file(&mock_server);
    let output = tokio::task::spawn_blocking(move || run(&["startup"], Some(&config)))
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
}

#[tokio::test]
async fn test_metadata_failure_exits_one() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/computeMetadata/v1/instance/attributes/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = config_file(&mock_server);
    let output = tokio::task::spawn_blocking(move || run(&["shutdown"], Some(&config)))
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_bad_config_file_exits_one() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "metadata_hang_secs: [not, a, number]").unwrap();

    let output = run(&["specialize"], Some(&file));

    assert_eq!(output.status.code(), Some(1));
}
