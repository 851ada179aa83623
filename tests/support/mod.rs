use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Record that the training heuristic scores 5 (`Alto`).
pub const HIGH_RISK_INPUT: &str = r#"{"latitud": -13.45, "longitud": -71.95, "hora": 23, "dia_semana": 6, "mes": 5, "tipo_delito": 0}"#;

/// Command for the built binary, isolated to `workdir`.
///
/// Logs and user settings resolve under `workdir/home` so tests never touch
/// the real config directory.
pub fn crime_risk(workdir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_crime-risk"));
    cmd.current_dir(workdir)
        .env("CRIME_RISK_CONFIG_HOME", workdir.join("home"))
        .env("RUST_LOG", "warn");
    cmd
}

/// Run with `args`, feeding `stdin` and capturing output.
pub fn run(workdir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = crime_risk(workdir)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn crime-risk");
    child
        .stdin
        .take()
        .expect("stdin pipe")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for crime-risk")
}

/// Parse stdout as exactly one JSON line.
pub fn json_line(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    let line = lines.next().expect("one line of output");
    assert!(lines.next().is_none(), "unexpected extra output: {stdout}");
    serde_json::from_str(line).expect("stdout is JSON")
}
