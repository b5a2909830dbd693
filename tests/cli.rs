use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

fn msh(history: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_msh"));
    cmd.arg("--history-file").arg(history).env_remove("RUST_LOG");
    cmd
}

fn run_script(history: &Path, script: &str) -> Output {
    let mut child = msh(history)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn run_command(history: &Path, line: &str) -> Output {
    msh(history)
        .arg("-c")
        .arg(line)
        .stdin(Stdio::null())
        .output()
        .unwrap()
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn pipeline_with_redirection_from_script() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history");
    let count = dir.path().join("count");

    let script = format!("echo hi | wc -l > {}\nexit 3\n", count.display());
    let output = run_script(&history, &script);

    assert_eq!(output.status.code(), Some(3));
    assert_eq!(fs::read_to_string(&count).unwrap().trim(), "1");
    assert!(text(&output.stdout).contains("wc exit status = 0"));
    // no prompt when stdin is not a terminal
    assert!(!text(&output.stdout).contains("msh> "));
}

#[test]
fn errors_do_not_stop_the_script() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history");
    let marker = dir.path().join("marker");

    let script = format!(
        "ls |\nno-such-program-xyz\n< {missing} cat\necho done > {marker}\n",
        missing = dir.path().join("missing").display(),
        marker = marker.display(),
    );
    let output = run_script(&history, &script);

    let stderr = text(&output.stderr);
    assert!(stderr.contains("invalid pipe"), "{stderr}");
    assert!(stderr.contains("no-such-program-xyz: command not found"), "{stderr}");
    assert!(stderr.contains("missing: No such file or directory"), "{stderr}");
    assert_eq!(fs::read_to_string(&marker).unwrap(), "done\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn history_persists_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history");
    let out = dir.path().join("out");

    let first = run_command(&history, &format!("echo one>{}", out.display()));
    assert!(first.status.success());

    let listing = run_command(&history, "history");
    assert_eq!(
        text(&listing.stdout),
        format!("0: echo one > {}\n", out.display())
    );

    let recalled = run_command(&history, "! 0");
    assert!(text(&recalled.stdout).starts_with(&format!("echo one > {}\n", out.display())));
    assert_eq!(fs::read_to_string(&out).unwrap(), "one\n");

    let log = fs::read_to_string(&history).unwrap();
    assert_eq!(log.lines().count(), 3);
    assert_eq!(log.lines().nth(1), Some("history"));
}

#[test]
fn exit_status_of_single_command() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history");

    assert_eq!(run_command(&history, "exit 7").status.code(), Some(7));
    assert_eq!(run_command(&history, "true").status.code(), Some(0));
    assert_eq!(run_command(&history, "false").status.code(), Some(1));
    assert_eq!(run_command(&history, "ls >").status.code(), Some(1));
}

#[test]
fn builtins_reject_redirection() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("history");
    let target = dir.path().join("somewhere");

    let output = run_command(&history, &format!("pwd > {}", target.display()));
    assert_eq!(
        text(&output.stderr).trim(),
        "pwd: I/O redirection not permitted for builtin commands"
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(!target.exists());
}
