use std::time::{SystemTime, UNIX_EPOCH};

use assert_cmd::Command;
use predicates::str::contains;

fn temp_script(name: &str, contents: &str) -> std::path::PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should move forward")
        .as_nanos();
    let root = std::env::temp_dir().join(format!("sequin-cli-{unique}"));
    std::fs::create_dir_all(&root).expect("failed to create temp root");

    let path = root.join(name);
    std::fs::write(&path, contents).expect("failed to write script");
    path
}

#[test]
fn help_flag_prints_usage() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sequin"));
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("Scripting toolchain"))
        .stdout(contains("check"))
        .stdout(contains("run"));
}

#[test]
fn check_prints_the_program_listing() {
    let input = temp_script("demo.sqn", "var a\nstart:\nset a 7\nprint a\ngoto start\n");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sequin"));
    cmd.arg("check")
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("var a"))
        .stdout(contains("start:"))
        .stdout(contains("print a"));
}

#[test]
fn check_rejects_invalid_scripts() {
    let input = temp_script("broken.sqn", "frobnicate 1\n");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sequin"));
    cmd.arg("check")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("unknown command"));
}

#[test]
fn run_executes_the_demo_print_command() {
    let input = temp_script("hello.sqn", "print \"hello\" 40 + 2\n");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sequin"));
    cmd.arg("run")
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("hello 42"));
}

#[test]
fn run_can_start_from_a_label() {
    let input = temp_script(
        "entry.sqn",
        "exit\nextra:\nprint \"from extra\"\n",
    );

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sequin"));
    cmd.arg("run")
        .arg(&input)
        .arg("--entry")
        .arg("extra")
        .assert()
        .success()
        .stdout(contains("from extra"));
}
