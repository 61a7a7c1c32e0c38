use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn tlc_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tlc");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    fs::write(
        root.join("facts.json"),
        r#"[
  {"id": "S1", "entity": "alice", "fetched_at": 100,
   "facts": [{"date": "2024-03-01", "description": "Group wins Best New Artist"}]},
  {"id": "S2", "entity": "alice", "fetched_at": 200,
   "facts": [{"date": "2023", "description": "Debut single released"},
             {"date": "2023-07", "description": "First fan meeting"}]},
  {"id": "B1", "entity": "bob",
   "facts": [{"date": "2020-01-15", "description": "Bob enlists"}]}
]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/tlc.sqlite"

[curation]
retry_delay_ms = 0

[oracle]
provider = "disabled"
"#,
        root.display()
    );

    let config_path = config_dir.join("tlc.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_tlc(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = tlc_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--progress")
        .arg("off")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run tlc binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn facts_path(config_path: &Path) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("facts.json")
        .to_str()
        .unwrap()
        .to_string()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_tlc(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/tlc.sqlite").exists());
}

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, first) = run_tlc(&config_path, &["init"]);
    let (_, stderr, second) = run_tlc(&config_path, &["init"]);
    assert!(first);
    assert!(second, "second init failed: {}", stderr);
}

#[test]
fn test_import_then_stats() {
    let (_tmp, config_path) = setup_test_env();
    run_tlc(&config_path, &["init"]);
    let facts = facts_path(&config_path);

    let (stdout, stderr, success) = run_tlc(&config_path, &["import", &facts]);
    assert!(success, "import failed: {}", stderr);
    assert!(stdout.contains("sources inserted: 3"));
    assert!(stdout.contains("facts: 4"));
    assert!(stdout.contains("ok"));

    let (stdout, _, success) = run_tlc(&config_path, &["import", &facts]);
    assert!(success);
    assert!(stdout.contains("sources inserted: 0"));
    assert!(stdout.contains("sources already present: 3"));

    let (stdout, stderr, success) = run_tlc(&config_path, &["stats"]);
    assert!(success, "stats failed: {}", stderr);
    assert!(stdout.contains("Entities:    2"));
    assert!(stdout.contains("Sources:     3 (3 pending)"));
    assert!(stdout.contains("alice"));
    assert!(stdout.contains("bob"));
}

#[test]
fn test_show_empty_entity() {
    let (_tmp, config_path) = setup_test_env();
    run_tlc(&config_path, &["init"]);

    let (stdout, stderr, success) = run_tlc(&config_path, &["show", "alice"]);
    assert!(success, "show failed: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["entity"], "alice");
    assert!(json["categories"].as_object().unwrap().is_empty());

    let (stdout, _, success) =
        run_tlc(&config_path, &["show", "alice", "--category", "Personal Life"]);
    assert!(success);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(json["categories"]["Personal Life"].as_object().unwrap().is_empty());
}

#[test]
fn test_show_unknown_category_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_tlc(&config_path, &["init"]);

    let (_, stderr, success) = run_tlc(&config_path, &["show", "alice", "--category", "Sports"]);
    assert!(!success);
    assert!(stderr.contains("unknown main category"));
}

#[test]
fn test_taxonomy_without_config() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (stdout, stderr, success) = run_tlc(&missing, &["taxonomy"]);
    assert!(success, "taxonomy failed: {}", stderr);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let map = json.as_object().unwrap();
    assert_eq!(map.len(), 5);
    assert!(json["Creative Works"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s == "Awards & Honors"));
}

#[test]
fn test_taxonomy_override_from_config() {
    let (_tmp, config_path) = setup_test_env();
    let mut content = fs::read_to_string(&config_path).unwrap();
    content.push_str("\n[taxonomy]\n\"Sports\" = [\"Matches\", \"Transfers\"]\n");
    fs::write(&config_path, content).unwrap();

    let (stdout, _, success) = run_tlc(&config_path, &["taxonomy"]);
    assert!(success);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 1);
}

#[test]
fn test_curate_refuses_disabled_oracle() {
    let (_tmp, config_path) = setup_test_env();
    run_tlc(&config_path, &["init"]);
    run_tlc(&config_path, &["import", &facts_path(&config_path)]);

    let (_, stderr, success) = run_tlc(&config_path, &["curate", "all"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);

    let (_, stderr, success) = run_tlc(&config_path, &["dedupe", "alice"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr: {}", stderr);

    // nothing was consumed
    let (stdout, _, _) = run_tlc(&config_path, &["stats"]);
    assert!(stdout.contains("(3 pending)"));
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let mut content = fs::read_to_string(&config_path).unwrap();
    content = content.replace("retry_delay_ms = 0", "retry_delay_ms = 0\nentity_concurrency = 0");
    fs::write(&config_path, content).unwrap();

    let (_, stderr, success) = run_tlc(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("entity_concurrency"));
}
