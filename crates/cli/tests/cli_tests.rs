// End-to-end tests for the `hermes` binary.
//
// Every test gets its own database and settings file in a temp dir, so
// nothing touches the user's real config or data directory.
//
// Run with: cargo test -p hermes-cli --test cli_tests

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn hermes(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_hermes"));
    cmd.current_dir(dir)
        .env("HERMES_DB", dir.join("orders.db"))
        .env("HERMES_CONFIG", dir.join("settings.json"))
        .env_remove("RUST_LOG");
    cmd
}

fn run(dir: &Path, args: &[&str]) -> Output {
    hermes(dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("hermes {args:?}: {e}"))
}

fn run_ok(dir: &Path, args: &[&str]) -> String {
    let output = run(dir, args);
    assert!(
        output.status.success(),
        "hermes {args:?} failed: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let stdout = run_ok(dir, args);
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be JSON ({e}):\n{stdout}"))
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().expect("process exited by signal")
}

fn order_count(dir: &Path) -> u64 {
    let stats = run_json(dir, &["stats", "--json"]);
    stats["total"].as_u64().unwrap()
}

const SAMPLE_CSV: &str = "\
Номер заказа,Дата заказа,Номер днища,Материал,Сварщик,Дата сварки
2024-101,2024-03-01,D-1,\"Acme, Inc.\",Ivanov,2024-03-02
2024-102,2024-03-05,D-2,09G2S,,
2024-103,2024-04-10,D-3,12X18H10T,Petrov,
";

// ===========================================================================
// Single records
// ===========================================================================

#[test]
fn add_show_edit() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();

    let added = run_json(
        dir,
        &[
            "add", "-n", "2024-117", "--date", "2024-05-02", "--material", "09G2S",
            "-e", "welder=Ivanov@2024-05-03", "--json",
        ],
    );
    let id = added["id"].as_str().unwrap().to_string();
    assert_eq!(added["orderNumber"], "2024-117");
    assert_eq!(added["executors"].as_array().unwrap().len(), 6);
    assert_eq!(added["executors"][0]["name"], "Ivanov");
    assert_eq!(added["status"], "active");

    let shown = run_json(dir, &["show", &id, "--json"]);
    assert_eq!(shown, added);

    let edited = run_json(dir, &["edit", &id, "--material", "Steel", "--json"]);
    assert_eq!(edited["material"], "Steel");
    assert_eq!(edited["orderNumber"], "2024-117");
    assert_eq!(edited["createdAt"], added["createdAt"]);

    let text = run_ok(dir, &["show", &id]);
    assert!(text.contains("Steel"));
    assert!(text.contains("Ivanov (2024-05-03)"));
}

#[test]
fn add_rejects_bad_input() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();

    // Missing date
    assert_eq!(exit_code(&run(dir, &["add", "-n", "2024-1"])), 5);
    // Bad characters in the order number
    assert_eq!(exit_code(&run(dir, &["add", "-n", "2024 1", "--date", "2024-01-01"])), 5);
    // Unknown executor role
    assert_eq!(
        exit_code(&run(dir, &["add", "-n", "2024-1", "--date", "2024-01-01", "-e", "painter=X"])),
        2
    );

    run_ok(dir, &["add", "-n", "2024-1", "--date", "2024-01-01"]);
    let dup = run(dir, &["add", "-n", "2024-1", "--date", "2024-01-02"]);
    assert_eq!(exit_code(&dup), 7);
    assert!(String::from_utf8_lossy(&dup.stderr).contains("hint:"));
    assert_eq!(order_count(dir), 1);
}

#[test]
fn missing_order_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let output = run(tmp.path(), &["show", "no-such-id"]);
    assert_eq!(exit_code(&output), 6);
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("error:"));
}

#[test]
fn soft_and_hard_delete() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let a = run_json(dir, &["add", "-n", "A-1", "--date", "2024-01-01", "--json"]);
    let b = run_json(dir, &["add", "-n", "A-2", "--date", "2024-01-01", "--json"]);
    let a_id = a["id"].as_str().unwrap();
    let b_id = b["id"].as_str().unwrap();

    run_ok(dir, &["delete", a_id, "--soft"]);
    let stats = run_json(dir, &["stats", "--json"]);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["deleted"], 1);

    let active = run_json(dir, &["list", "--active", "--json"]);
    assert_eq!(active["orders"].as_array().unwrap().len(), 1);

    run_ok(dir, &["delete", b_id]);
    assert_eq!(order_count(dir), 1);
}

#[test]
fn list_pages_and_search() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    for n in ["B-2", "A-1", "C-3"] {
        run_ok(dir, &["add", "-n", n, "--date", "2024-01-01", "--material", "Steel"]);
    }

    let page = run_json(dir, &["list", "--sort", "orderNumber", "--asc", "--limit", "2", "--json"]);
    let numbers: Vec<&str> = page["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["orderNumber"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, ["A-1", "B-2"]);
    assert_eq!(page["pagination"]["totalPages"], 2);
    assert_eq!(page["pagination"]["totalCount"], 3);

    assert_eq!(exit_code(&run(dir, &["list", "--sort", "price"])), 2);

    let found = run_json(dir, &["search", "b-2", "--json"]);
    assert_eq!(found["total"], 1);
    assert_eq!(found["results"][0]["orderNumber"], "B-2");

    assert_eq!(exit_code(&run(dir, &["search", "b"])), 2);
}

#[test]
fn clear_requires_yes() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    run_ok(dir, &["add", "-n", "A-1", "--date", "2024-01-01"]);

    assert_eq!(exit_code(&run(dir, &["clear"])), 2);
    assert_eq!(order_count(dir), 1);

    run_ok(dir, &["clear", "--yes"]);
    assert_eq!(order_count(dir), 0);
}

// ===========================================================================
// Import / export
// ===========================================================================

#[test]
fn import_export_reimport_skips_everything() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::write(dir.join("in.csv"), SAMPLE_CSV).unwrap();

    let report = run_json(dir, &["import", "in.csv", "--json"]);
    assert_eq!(report["summary"]["imported"], 3);
    assert_eq!(report["summary"]["total"], 3);

    run_ok(dir, &["export", "out.csv"]);
    let exported = std::fs::read_to_string(dir.join("out.csv")).unwrap();
    assert!(exported.starts_with("ID,Дата заказа,Номер заказа"));
    assert!(exported.contains("\"Acme, Inc.\""));

    let again = run_json(dir, &["import", "out.csv", "--json"]);
    assert_eq!(again["summary"]["imported"], 0);
    assert_eq!(again["summary"]["skipped"], 3);
    assert_eq!(again["summary"]["errors"], 0);
    assert_eq!(order_count(dir), 3);
}

#[test]
fn overwrite_keeps_ids() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::write(dir.join("in.csv"), SAMPLE_CSV).unwrap();
    run_ok(dir, &["import", "in.csv"]);
    let before = run_json(dir, &["search", "2024-101", "--json"]);

    std::fs::write(dir.join("update.csv"), "Order Number,Material\n2024-101,Titanium\n").unwrap();
    let report = run_json(dir, &["import", "update.csv", "--overwrite", "--json"]);
    assert_eq!(report["summary"]["updated"], 1);
    assert_eq!(report["outcomes"][0]["action"], "updated");
    assert_eq!(report["outcomes"][0]["orderNumber"], "2024-101");

    let after = run_json(dir, &["search", "2024-101", "--json"]);
    assert_eq!(after["results"][0]["id"], before["results"][0]["id"]);
    assert_eq!(after["results"][0]["createdAt"], before["results"][0]["createdAt"]);
    assert_eq!(after["results"][0]["material"], "Titanium");
}

#[test]
fn import_by_bottom_number() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::write(dir.join("in.csv"), SAMPLE_CSV).unwrap();
    run_ok(dir, &["import", "in.csv"]);

    std::fs::write(dir.join("b.csv"), "Номер заказа,Номер днища\nNEW-1,D-2\nNEW-2,D-9\n").unwrap();
    let report = run_json(dir, &["import", "b.csv", "--by", "bottom-number", "--json"]);
    assert_eq!(report["summary"]["skipped"], 1);
    assert_eq!(report["summary"]["imported"], 1);
}

#[test]
fn partial_import_exits_8() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::write(dir.join("in.csv"), "Order Number\nA-1\nnot valid!\nA-2\n").unwrap();

    let output = run(dir, &["import", "in.csv"]);
    assert_eq!(exit_code(&output), 8);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("imported: 2"), "{stdout}");
    assert!(String::from_utf8_lossy(&output.stderr).contains("line 3"));
    assert_eq!(order_count(dir), 2);
}

#[test]
fn header_only_csv_is_format_error() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::write(dir.join("empty.csv"), "Order Number,Material\n").unwrap();
    assert_eq!(exit_code(&run(dir, &["import", "empty.csv"])), 4);
    assert_eq!(exit_code(&run(dir, &["import", "missing.csv"])), 3);
}

#[test]
fn export_to_stdout_with_filter() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::write(dir.join("in.csv"), SAMPLE_CSV).unwrap();
    run_ok(dir, &["import", "in.csv"]);

    let out = run_ok(dir, &["export", "-", "--from", "2024-03-01", "--to", "2024-03-31", "--headers", "english"]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3, "{out}");
    assert!(lines[0].starts_with("ID,Date,Order Number"));
    assert!(!out.contains("2024-103"));
}

// ===========================================================================
// Backup / restore
// ===========================================================================

#[test]
fn backup_clear_restore() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::write(dir.join("in.csv"), SAMPLE_CSV).unwrap();
    run_ok(dir, &["import", "in.csv"]);
    let before = run_json(dir, &["list", "--sort", "id", "--asc", "--json"]);

    run_ok(dir, &["backup", "--out", "backups/"]);
    let backups: Vec<_> = std::fs::read_dir(dir.join("backups")).unwrap().collect();
    assert_eq!(backups.len(), 1);
    let backup_path = backups[0].as_ref().unwrap().path();
    let name = backup_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("orders_backup_") && name.ends_with(".json"), "{name}");

    run_ok(dir, &["clear", "--yes"]);
    assert_eq!(order_count(dir), 0);

    let report = run_json(dir, &["restore", backup_path.to_str().unwrap(), "--json"]);
    assert_eq!(report["summary"]["restored"], 3);
    assert_eq!(run_json(dir, &["list", "--sort", "id", "--asc", "--json"]), before);
}

#[test]
fn malformed_backup_leaves_store_untouched() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    run_ok(dir, &["add", "-n", "A-1", "--date", "2024-01-01"]);

    std::fs::write(dir.join("bad.json"), "{}").unwrap();
    assert_eq!(exit_code(&run(dir, &["restore", "bad.json"])), 4);
    std::fs::write(dir.join("bad2.json"), r#"{"data": {"id": "x"}}"#).unwrap();
    assert_eq!(exit_code(&run(dir, &["restore", "bad2.json"])), 4);

    assert_eq!(order_count(dir), 1);
}

#[test]
fn empty_backup_clears_store() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    run_ok(dir, &["add", "-n", "A-1", "--date", "2024-01-01"]);

    std::fs::write(dir.join("empty.json"), r#"{"version": 1, "data": []}"#).unwrap();
    run_ok(dir, &["restore", "empty.json"]);
    assert_eq!(order_count(dir), 0);
}

// ===========================================================================
// Settings
// ===========================================================================

#[test]
fn settings_file_is_created_and_honored() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    run_ok(dir, &["stats"]);
    assert!(dir.join("settings.json").exists());

    std::fs::write(
        dir.join("settings.json"),
        "{\n  // english exports\n  \"export.headers\": \"english\"\n}\n",
    )
    .unwrap();
    run_ok(dir, &["add", "-n", "A-1", "--date", "2024-01-01"]);
    let out = run_ok(dir, &["export", "-"]);
    assert!(out.starts_with("ID,Date,Order Number"), "{out}");
}

#[test]
fn no_overwrite_beats_settings() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    std::fs::write(dir.join("settings.json"), "{ \"import.overwrite\": true }\n").unwrap();
    std::fs::write(dir.join("in.csv"), SAMPLE_CSV).unwrap();
    run_ok(dir, &["import", "in.csv"]);

    let skipped = run_json(dir, &["import", "in.csv", "--no-overwrite", "--json"]);
    assert_eq!(skipped["summary"]["skipped"], 3);

    let updated = run_json(dir, &["import", "in.csv", "--json"]);
    assert_eq!(updated["summary"]["updated"], 3);
}
