//! Tests for the `yalc` binary

use super::common::{read, yalc_command, TestContext};
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    let output = yalc_command().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["publish", "push", "add", "link", "retreat", "installations", "where"] {
        assert!(stdout.contains(command), "missing {} in help", command);
    }
}

#[test]
fn test_dir_prints_store_folder() {
    let ctx = TestContext::new();
    ctx.yalc(ctx.temp.path())
        .arg("dir")
        .assert()
        .success()
        .stdout(predicate::str::contains(ctx.store.to_string_lossy().as_ref()));
}

#[test]
fn test_publish_add_check_remove() {
    let ctx = TestContext::new();
    let lib = ctx.library("my-lib", "1.0.0");
    let app = ctx.app("app", None);

    ctx.yalc(&lib)
        .arg("publish")
        .assert()
        .success()
        .stdout(predicate::str::contains("Published my-lib@1.0.0"));
    assert!(ctx.store.join("packages/my-lib/1.0.0/index.js").exists());

    ctx.yalc(&app).args(["add", "my-lib"]).assert().success();
    assert!(read(&app.join("package.json")).contains("\"my-lib\": \"file:.yalc/my-lib\""));
    assert!(app.join("node_modules/my-lib/index.js").exists());

    ctx.yalc(&app)
        .arg("check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("my-lib"));

    ctx.yalc(&app)
        .args(["installations", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installations of package my-lib"));

    ctx.yalc(&app).args(["remove", "--all"]).assert().success();
    assert!(!read(&app.join("package.json")).contains("my-lib"));
    assert!(!app.join("yalc.lock").exists());

    ctx.yalc(&app).arg("check").assert().success();
}

#[test]
fn test_publish_changed_skips_second_run() {
    let ctx = TestContext::new();
    let lib = ctx.library("my-lib", "1.0.0");

    ctx.yalc(&lib).args(["publish", "--changed"]).assert().success();
    ctx.yalc(&lib)
        .args(["publish", "--changed"])
        .assert()
        .success()
        .stderr(predicate::str::contains("has not changed"));
}

#[test]
fn test_publish_sig_suffixes_version() {
    let ctx = TestContext::new();
    let lib = ctx.library("my-lib", "1.0.0");

    ctx.yalc(&lib)
        .args(["publish", "--sig"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Published my-lib@1\.0\.0\+[0-9a-f]{8}").unwrap());
}

#[test]
fn test_retreat_and_restore() {
    let ctx = TestContext::new();
    let lib = ctx.library("my-lib", "1.0.0");
    let app = ctx.app("app", Some(("my-lib", "^0.1.0")));

    ctx.yalc(&lib).arg("publish").assert().success();
    ctx.yalc(&app).args(["add", "my-lib"]).assert().success();

    ctx.yalc(&app).args(["retreat", "my-lib"]).assert().success();
    assert!(read(&app.join("package.json")).contains("\"my-lib\": \"^0.1.0\""));
    assert!(app.join("yalc.lock").exists());
    assert!(!app.join("node_modules/my-lib").exists());

    ctx.yalc(&app).arg("restore").assert().success();
    assert!(read(&app.join("package.json")).contains("\"my-lib\": \"file:.yalc/my-lib\""));
    assert!(app.join("node_modules/my-lib/index.js").exists());
}

#[test]
fn test_list_json_and_where() {
    let ctx = TestContext::new();
    let lib = ctx.library("my-lib", "1.0.0");
    let app = ctx.app("consumer-app", None);

    ctx.yalc(&lib).arg("publish").assert().success();
    ctx.yalc(&app).args(["add", "my-lib"]).assert().success();

    ctx.yalc(&app)
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"my-lib\""))
        .stdout(predicate::str::contains("usedInProjects"));

    ctx.yalc(&app)
        .args(["where", "my-lib"])
        .assert()
        .success()
        .stdout(predicate::str::contains("consumer-app"));
}

#[test]
fn test_info_unknown_package() {
    let ctx = TestContext::new();
    ctx.yalc(ctx.temp.path())
        .args(["info", "nope"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Package 'nope' not found in store"));
}

#[test]
fn test_clean_dry_run_keeps_unused() {
    let ctx = TestContext::new();
    let lib = ctx.library("my-lib", "1.0.0");
    ctx.yalc(&lib).arg("publish").assert().success();

    ctx.yalc(&lib)
        .args(["clean", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("my-lib@1.0.0"));
    assert!(ctx.store.join("packages/my-lib/1.0.0").exists());

    ctx.yalc(&lib).arg("clean").assert().success();
    assert!(!ctx.store.join("packages/my-lib").exists());
}

#[test]
fn test_add_missing_package_warns() {
    let ctx = TestContext::new();
    let app = ctx.app("app", None);

    ctx.yalc(&app)
        .args(["add", "ghost"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Could not find package `ghost`"));
    assert!(!app.join("yalc.lock").exists());
}

#[test]
fn test_quiet_mutes_progress() {
    let ctx = TestContext::new();
    let lib = ctx.library("my-lib", "1.0.0");

    ctx.yalc(&lib)
        .args(["--quiet", "publish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("published in store").not());
}
