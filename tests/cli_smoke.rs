use assert_cmd::Command;
use predicates::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn host() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("flex-confirm-mail-host")?;
    cmd.env_remove("FLEX_CONFIRM_MAIL_HOST_LOG_DIR");
    Ok(cmd)
}

fn envelope(payload: &[u8]) -> Vec<u8> {
    let mut bytes = (payload.len() as u32).to_le_bytes().to_vec();
    bytes.extend_from_slice(payload);
    bytes
}

#[test]
fn version_prints_only_the_version() -> TestResult {
    host()?
        .arg("--version")
        .assert()
        .success()
        .stdout("4.0.8\n")
        .stderr("");
    host()?.args(["-v", "-c", "fetch"]).assert().success().stdout("4.0.8\n");
    Ok(())
}

#[test]
fn direct_fetch_prints_file_contents() -> TestResult {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("domains.txt");
    std::fs::write(&file, "example.com\nexample.org")?;
    let params = serde_json::json!({ "path": file.to_string_lossy() }).to_string();

    host()?
        .args(["--command", "fetch", "--params", &params])
        .assert()
        .success()
        .stdout("example.com\nexample.org\n");
    Ok(())
}

#[test]
fn direct_fetch_expands_environment() -> TestResult {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("test.txt"), "from env")?;

    host()?
        .env("TEST_FETCH_DIR", dir.path())
        .args(["-c", "fetch", "-p", r#"{"path":"%TEST_FETCH_DIR%/test.txt"}"#])
        .assert()
        .success()
        .stdout("from env\n");
    Ok(())
}

#[test]
fn direct_fetch_missing_file_fails() -> TestResult {
    host()?
        .args(["-c", "fetch", "-p", r#"{"path":"/nonexistent/rules.txt"}"#])
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::starts_with("/nonexistent/rules.txt: "));
    Ok(())
}

#[test]
fn direct_fetch_without_params_is_usage_error() -> TestResult {
    host()?
        .args(["-c", "fetch"])
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains("usage:"));
    Ok(())
}

#[test]
fn direct_unknown_command_is_usage_error() -> TestResult {
    host()?
        .args(["-c", "ping"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown command: ping"));
    Ok(())
}

#[test]
fn stdio_unknown_command_is_echoed() -> TestResult {
    let dir = tempfile::tempdir()?;
    let request = envelope(br#"{"command":"hello","params":{"a":"b"}}"#);
    host()?
        .env("FLEX_CONFIRM_MAIL_HOST_LOG_DIR", dir.path())
        .write_stdin(request.clone())
        .assert()
        .success()
        .stdout(request);
    Ok(())
}

#[test]
fn stdio_fetch_round_trip() -> TestResult {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("terms.txt");
    std::fs::write(&file, "secret")?;
    let payload = serde_json::json!({
        "command": "fetch",
        "params": { "path": file.to_string_lossy() }
    })
    .to_string();
    let expected = envelope(br#"{"contents":"secret","error":""}"#);

    host()?
        .write_stdin(envelope(payload.as_bytes()))
        .assert()
        .success()
        .stdout(expected);
    Ok(())
}

#[test]
fn stdio_truncated_envelope_fails() -> TestResult {
    let mut request = 64u32.to_le_bytes().to_vec();
    request.extend_from_slice(b"{}");
    host()?
        .write_stdin(request)
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("truncated message"));
    Ok(())
}

#[test]
fn browser_arguments_are_ignored() -> TestResult {
    let request = envelope(br#"{"command":"noop"}"#);
    host()?
        .args(["/path/to/manifest.json", "flexible-confirm-mail@clear-code.com"])
        .write_stdin(request.clone())
        .assert()
        .success()
        .stdout(request);
    Ok(())
}
