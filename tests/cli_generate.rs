mod openai_stub;

use std::fs;

use openai_stub::{OpenAiStub, StubBehavior};
use predicates::prelude::*;

fn sitegen(stub: &OpenAiStub) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("sitegen");
    cmd.env("OPENAI_API_KEY", "sk-test")
        .env("SITEGEN_OPENAI_BASE_URL", &stub.base_url)
        .env("SITEGEN_OPENAI_MODEL", "stub-model")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn generate_writes_sites_and_history() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let out = temp.path().join("sites");
    let stub = OpenAiStub::spawn(StubBehavior::EchoSlots);

    sitegen(&stub)
        .args(["generate", "--topic", "Edge Computing", "--count", "2"])
        .args(["--style", "technical", "--concurrency", "1", "--seed", "3"])
        .arg("--out")
        .arg(&out)
        .arg("--data-dir")
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "generated 2/2 sites for \"Edge Computing\"",
        ));

    let pages = fs::read_dir(&out)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect::<Vec<_>>();
    assert_eq!(pages.len(), 2, "{pages:?}");
    assert!(pages.iter().all(|name| name.starts_with("site_") && name.ends_with(".html")));

    let history = sitegen(&stub)
        .args(["history", "--data-dir"])
        .arg(temp.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let history = String::from_utf8(history)?;
    let lines = history.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 1);
    let log: serde_json::Value = serde_json::from_str(lines[0])?;
    assert_eq!(log["topic"], "Edge Computing");
    assert_eq!(log["style"], "technical");
    assert_eq!(log["site_ids"].as_array().map(Vec::len), Some(2));

    let stats = sitegen(&stub)
        .args(["stats", "--data-dir"])
        .arg(temp.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stats: serde_json::Value = serde_json::from_slice(&stats)?;
    assert_eq!(stats["total_generations"], 1);
    assert_eq!(stats["total_sites_generated"], 2);
    assert_eq!(stats["by_style"]["technical"], 1);
    Ok(())
}

#[test]
fn invalid_page_count_exits_with_validation_code() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let stub = OpenAiStub::spawn(StubBehavior::EchoSlots);

    sitegen(&stub)
        .args(["generate", "--topic", "AI", "--count", "51", "--data-dir"])
        .arg(temp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "pages_count must be between 1 and 50 (got 51)",
        ));

    sitegen(&stub)
        .args(["generate", "--topic", "AI", "--style", "poetic", "--data-dir"])
        .arg(temp.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown style"));

    assert!(stub.requests().is_empty());
    assert!(!temp.path().join("generation_logs.jsonl").exists());
    Ok(())
}

#[test]
fn all_sites_failing_exits_nonzero() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let stub = OpenAiStub::spawn(StubBehavior::AlwaysStatus(401));

    sitegen(&stub)
        .args(["generate", "--topic", "AI", "--count", "2", "--max-attempts", "1"])
        .arg("--out")
        .arg(temp.path().join("sites"))
        .arg("--data-dir")
        .arg(temp.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed site 0 at title (auth_failure)"))
        .stdout(predicate::str::contains("generated 0/2 sites"));
    Ok(())
}

#[test]
fn missing_api_key_is_reported() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let stub = OpenAiStub::spawn(StubBehavior::EchoSlots);

    sitegen(&stub)
        .env_remove("OPENAI_API_KEY")
        .args(["generate", "--topic", "AI", "--data-dir"])
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("OPENAI_API_KEY is not set"));
    Ok(())
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let stub = OpenAiStub::spawn(StubBehavior::EchoSlots);

    sitegen(&stub)
        .env("RUST_LOG", "debug")
        .args(["stats", "--data-dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));

    sitegen(&stub)
        .env("RUST_LOG", "debug")
        .args(["--log-format", "json", "stats", "--data-dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("\"message\":\"parsed cli\""));
    Ok(())
}
