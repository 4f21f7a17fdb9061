use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn spansync(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_spansync"));
    cmd.arg("--home")
        .arg(home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn init(home: &TempDir) {
    spansync(home.path()).arg("init").assert().success();
}

fn add(home: &TempDir, record_type: &str, fields: &[&str]) {
    let mut cmd = spansync(home.path());
    cmd.args(["record", "add", record_type]);
    for f in fields {
        cmd.args(["--field", f]);
    }
    cmd.assert().success();
}

fn collection_bytes(home: &TempDir) -> Vec<u8> {
    fs::read(home.path().join(".spansync/collection.yaml")).expect("read collection")
}

fn front(home: &TempDir, id: u64) -> String {
    let out = spansync(home.path())
        .args(["record", "list", "--json"])
        .output()
        .expect("run list");
    assert!(out.status.success());
    let records: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    records
        .as_array()
        .expect("array")
        .iter()
        .find(|r| r["id"] == id)
        .and_then(|r| r["fields"][0]["value"].as_str())
        .expect("record front")
        .to_owned()
}

/// Cloze record 1 and a Basic record 2 whose Front depends on it.
fn dependency_fixture() -> TempDir {
    let home = TempDir::new().expect("home");
    init(&home);
    add(&home, "Cloze", &["Text={{c1::one}} {{c2::two}}"]);
    add(&home, "Basic", &[r#"Front=<span class="sync" note="1"></span>"#]);
    home
}

// ---------------------------------------------------------------------------
// init / record
// ---------------------------------------------------------------------------

#[test]
fn init_is_idempotent() {
    let home = TempDir::new().expect("home");
    spansync(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("Initialized collection"))
        .stdout(contains("Basic (Front, Back)"));
    assert!(home.path().join(".spansync/collection.yaml").is_file());
    assert!(home.path().join(".spansync/templates").is_dir());

    spansync(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("already exists"));
}

#[test]
fn commands_require_init() {
    let home = TempDir::new().expect("home");
    spansync(home.path())
        .args(["record", "list"])
        .assert()
        .failure()
        .stderr(contains("spansync init"));
}

#[test]
fn record_add_list_and_show() {
    let home = TempDir::new().expect("home");
    init(&home);

    spansync(home.path())
        .args(["record", "add", "Basic", "--field", "Front=hello", "--field", "Back=world"])
        .assert()
        .success()
        .stdout(contains("Added record 1"));

    spansync(home.path())
        .args(["record", "list"])
        .assert()
        .success()
        .stdout(contains("hello"))
        .stdout(contains("Basic"));

    let out = spansync(home.path())
        .args(["record", "list", "--json"])
        .output()
        .expect("list");
    let records: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(records[0]["record_type"], "Basic");
    assert_eq!(records[0]["fields"][1]["name"], "Back");
    assert_eq!(records[0]["fields"][1]["value"], "world");

    spansync(home.path())
        .args(["record", "show", "1"])
        .assert()
        .success()
        .stdout(contains("Front"))
        .stdout(contains("    world"));
}

#[test]
fn record_add_rejects_unknown_field_and_type() {
    let home = TempDir::new().expect("home");
    init(&home);

    spansync(home.path())
        .args(["record", "add", "Basic", "--field", "Nope=x"])
        .assert()
        .failure()
        .stderr(contains("has no field 'Nope'"));
    spansync(home.path())
        .args(["record", "add", "EQ"])
        .assert()
        .failure()
        .stderr(contains("cannot add a 'EQ' record"));
    spansync(home.path())
        .args(["record", "show", "9"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// sync / diff
// ---------------------------------------------------------------------------

#[test]
fn sync_record_renders_dependency() {
    let home = dependency_fixture();

    spansync(home.path())
        .args(["sync", "2"])
        .assert()
        .success()
        .stdout(contains("1 changed"));
    assert_eq!(
        front(&home, 2),
        "<span class=\"sync\" note=\"1\">\n<div>one two</div>\n</span>"
    );

    spansync(home.path())
        .args(["sync", "2"])
        .assert()
        .success()
        .stdout(contains("0 changed"));
}

#[test]
fn dry_run_leaves_collection_untouched() {
    let home = dependency_fixture();
    let before = collection_bytes(&home);

    spansync(home.path())
        .args(["sync", "2", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("[dry-run]"))
        .stdout(contains("~  record 2"));
    assert_eq!(collection_bytes(&home), before);
}

#[test]
fn diff_shows_pending_render() {
    let home = dependency_fixture();
    let before = collection_bytes(&home);

    spansync(home.path())
        .args(["diff", "2"])
        .assert()
        .success()
        .stdout(contains("--- a/2/Front"))
        .stdout(contains("+++ b/2/Front"))
        .stdout(contains("+<div>one two</div>"));
    assert_eq!(collection_bytes(&home), before);

    spansync(home.path()).args(["sync", "2"]).assert().success();
    spansync(home.path())
        .args(["diff", "2"])
        .assert()
        .success()
        .stdout(contains("No differences for record 2."));
}

#[test]
fn sync_all_refreshes_every_dependent() {
    let home = dependency_fixture();
    add(&home, "Basic", &[r#"Front=<span class="sync" note="1"></span>"#]);
    add(&home, "Basic", &["Front=plain"]);

    spansync(home.path())
        .args(["sync", "--all"])
        .assert()
        .success()
        .stdout(contains("synced 2 records (2 changed"));
    assert!(front(&home, 3).contains("<div>one two</div>"));
}

#[test]
fn sync_field_out_of_range_fails() {
    let home = dependency_fixture();
    spansync(home.path())
        .args(["sync", "2", "--field", "5"])
        .assert()
        .failure()
        .stderr(contains("out of range"));
}

#[test]
fn sync_requires_target() {
    let home = dependency_fixture();
    spansync(home.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(contains("provide a record id or use --all"));
}

#[test]
fn user_template_overrides_default() {
    let home = dependency_fixture();
    fs::write(
        home.path().join(".spansync/templates/Cloze.html"),
        "<b>{{Text:cloze}}</b>",
    )
    .expect("write template");

    spansync(home.path()).args(["sync", "2"]).assert().success();
    assert_eq!(
        front(&home, 2),
        "<span class=\"sync\" note=\"1\">\n<b>one two</b></span>"
    );
}

#[test]
fn verbose_logs_writes() {
    let home = dependency_fixture();
    spansync(home.path())
        .args(["-v", "sync", "2"])
        .assert()
        .success()
        .stderr(contains("updated record 2"));
}

// ---------------------------------------------------------------------------
// Peer markers
// ---------------------------------------------------------------------------

fn peer_fixture() -> TempDir {
    let home = TempDir::new().expect("home");
    init(&home);
    add(&home, "Basic", &[r#"Front=<span class="sync" sid="s1">Original</span>"#]);
    add(&home, "Basic", &[r#"Front=<span class="sync" sid="s1">Edited</span>"#]);
    home
}

#[test]
fn prefer_upload_pushes_to_peers() {
    let home = peer_fixture();
    spansync(home.path())
        .args(["sync", "2", "--prefer", "upload"])
        .assert()
        .success();
    assert_eq!(front(&home, 1), r#"<span class="sync" sid="s1">Edited</span>"#);
}

#[test]
fn prompt_answer_decides_conflict() {
    let home = peer_fixture();
    let mut cmd = spansync(home.path());
    cmd.args(["sync", "2"]);
    assert_cmd::Command::from_std(cmd)
        .write_stdin("d\n")
        .assert()
        .success()
        .stderr(contains("Markers with sid"));
    assert_eq!(front(&home, 2), r#"<span class="sync" sid="s1">Original</span>"#);
    assert_eq!(front(&home, 1), r#"<span class="sync" sid="s1">Original</span>"#);
}

#[test]
fn coherent_peers_never_prompt() {
    let home = TempDir::new().expect("home");
    init(&home);
    add(&home, "Basic", &[r#"Front=<span class="sync" sid="s1">Same</span>"#]);
    add(&home, "Basic", &[r#"Front=<span class="sync" sid="s1">Same</span>"#]);

    spansync(home.path())
        .args(["sync", "2"])
        .assert()
        .success()
        .stderr(contains("Markers with sid").not());
}

#[test]
fn diff_with_upload_lists_peer() {
    let home = peer_fixture();
    spansync(home.path())
        .args(["diff", "2", "--prefer", "upload"])
        .assert()
        .success()
        .stdout(contains("--- a/1/Front"))
        .stdout(contains("+<span class=\"sync\" sid=\"s1\">Edited</span>"));
}
