use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn khata_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("khata"))
}

/// Each test gets its own HOME so settings and data never leak between runs.
fn cmd_with_home(home: &tempfile::TempDir) -> Command {
    let mut cmd = khata_cmd();
    cmd.env("HOME", home.path());
    cmd
}

#[test]
fn help_lists_command_groups() {
    let home = tempfile::tempdir().expect("tempdir");
    let mut cmd = cmd_with_home(&home);
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("accounts"))
        .stdout(predicate::str::contains("loans"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("report"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn init_creates_data_dir() {
    let home = tempfile::tempdir().expect("tempdir");
    let data_dir = home.path().join("books");
    let mut cmd = cmd_with_home(&home);
    cmd.args(["init", "--data-dir", data_dir.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Initialized khata data"));
    assert!(data_dir.join("khata.db").exists());
}

#[test]
fn init_is_idempotent() {
    let home = tempfile::tempdir().expect("tempdir");
    let data_dir = home.path().join("books");
    for _ in 0..2 {
        let mut cmd = cmd_with_home(&home);
        cmd.args(["init", "--data-dir", data_dir.to_str().unwrap()]);
        cmd.assert().success();
    }
}

#[test]
fn data_commands_require_login() {
    let home = tempfile::tempdir().expect("tempdir");
    let data_dir = home.path().join("books");
    let mut cmd = cmd_with_home(&home);
    cmd.args(["init", "--data-dir", data_dir.to_str().unwrap()]);
    cmd.assert().success();

    for args in [
        vec!["accounts", "list"],
        vec!["tx", "list"],
        vec!["loans", "list"],
        vec!["report", "dashboard"],
        vec!["patterns", "list"],
        vec!["doctor"],
        vec!["reset", "--yes"],
    ] {
        let mut cmd = cmd_with_home(&home);
        cmd.args(&args);
        cmd.assert()
            .failure()
            .stderr(predicate::str::contains("Not logged in"));
    }
}

#[test]
fn unknown_subcommand_fails() {
    let home = tempfile::tempdir().expect("tempdir");
    let mut cmd = cmd_with_home(&home);
    cmd.arg("frobnicate");
    cmd.assert().failure();
}
