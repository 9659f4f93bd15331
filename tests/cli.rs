use std::path::Path;
use std::process::{Command, Output};

fn make_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(
        root.join("models.py"),
        "class User:\n    def __init__(self, name):\n        self.name = name\n",
    )
    .unwrap();
    std::fs::write(
        root.join("main.py"),
        "from models import User\n\n\ndef main():\n    return User(\"ada\")\n",
    )
    .unwrap();
    std::fs::write(root.join("README.md"), "# demo\n").unwrap();
    dir
}

fn ctxmap(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ctxmap"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "ctxmap failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn map_prints_chat_file_first() {
    let repo = make_repo();
    let out = stdout(&ctxmap(repo.path(), &["map", "--chat", "main.py"]));

    assert!(out.starts_with("main.py:\n(Rank value: "), "{out}");
    assert!(out.contains("models.py:"), "{out}");
}

#[test]
fn map_json_includes_report_on_request() {
    let repo = make_repo();
    let out = stdout(&ctxmap(repo.path(), &["--format", "json", "map", "--report"]));

    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(value["map"].as_str().unwrap().contains("class User"));
    assert_eq!(value["report"]["excluded"]["README.md"], "unsupported language");
    assert_eq!(value["report"]["totalFilesConsidered"], 3);
}

#[test]
fn map_respects_config_budget() {
    let repo = make_repo();
    std::fs::write(repo.path().join(".ctxmap.toml"), "[map]\nmax_map_tokens = 0\n").unwrap();

    let out = stdout(&ctxmap(repo.path(), &["map"]));
    assert_eq!(out.trim(), "");

    // The flag wins over the file.
    let out = stdout(&ctxmap(repo.path(), &["map", "--max-tokens", "1000"]));
    assert!(out.contains("models.py:"), "{out}");
}

#[test]
fn invalid_config_fails() {
    let repo = make_repo();
    std::fs::write(repo.path().join(".ctxmap.toml"), "[ranking]\ndamping = 1.5\n").unwrap();

    let output = ctxmap(repo.path(), &["map"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("damping"));
}

#[test]
fn find_renders_definitions() {
    let repo = make_repo();
    let out = stdout(&ctxmap(repo.path(), &["find", "User", "--references"]));

    assert!(out.contains("Symbol      : User (class)"), "{out}");
    assert!(out.contains("models.py:"), "{out}");
    assert!(out.contains("References  : 2"), "{out}");
}

#[test]
fn find_json_reports_locations() {
    let repo = make_repo();
    let out = stdout(&ctxmap(
        repo.path(),
        &["--format", "json", "find", "User", "--source-file", "main.py"],
    ));

    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["symbol"], "User");
    assert_eq!(value["sourceFile"], "main.py");
    assert_eq!(value["definitions"][0]["file"], "models.py");
    assert_eq!(value["definitions"][0]["line"], 1);
}

#[test]
fn find_honors_excludes() {
    let repo = make_repo();
    let out = stdout(&ctxmap(
        repo.path(),
        &["--format", "json", "find", "User", "--exclude", "models.py"],
    ));

    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["definitions"].as_array().unwrap().len(), 0);
    assert_eq!(value["references"][0]["file"], "main.py");
}

#[test]
fn invalid_ranking_weight_fails() {
    let repo = make_repo();
    std::fs::write(
        repo.path().join(".ctxmap.toml"),
        "[ranking]\nchat_seed_weight = -0.5\n",
    )
    .unwrap();

    let output = ctxmap(repo.path(), &["find", "User"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("chat_seed_weight"));
}

#[test]
fn find_many_symbols() {
    let repo = make_repo();
    let out = stdout(&ctxmap(repo.path(), &["find", "User,main,Ghost"]));

    assert!(out.contains("Symbols found (2/3):"), "{out}");
    assert!(out.contains("Symbols not found (1/3):"), "{out}");
}

#[test]
fn missing_symbol_is_reported_not_failed() {
    let repo = make_repo();
    let out = stdout(&ctxmap(repo.path(), &["find", "Ghost"]));
    assert_eq!(out.trim(), "Symbol 'Ghost' not found.");
}

#[test]
fn missing_path_fails() {
    let repo = make_repo();
    let output = ctxmap(repo.path(), &["map", "does-not-exist"]);
    assert!(!output.status.success());
}
