mod support;

use support::{HIGH_RISK_INPUT, json_line, run};
use tempfile::tempdir;

fn train_small(workdir: &std::path::Path) -> std::process::Output {
    run(workdir, &["train", "--samples", "400", "--trees", "20"], "")
}

fn accuracy_line(stdout: &str) -> String {
    stdout
        .lines()
        .find(|line| line.starts_with("Model accuracy:"))
        .expect("accuracy line")
        .to_string()
}

#[test]
fn train_writes_model_and_reports_accuracy() {
    let dir = tempdir().unwrap();
    let output = train_small(dir.path());
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(accuracy_line(&stdout).ends_with('%'));
    assert!(dir.path().join("model.json").is_file());
}

#[test]
fn train_is_deterministic_for_a_fixed_seed() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let a = train_small(first.path());
    let b = train_small(second.path());
    let a_out = String::from_utf8_lossy(&a.stdout);
    let b_out = String::from_utf8_lossy(&b.stdout);
    assert_eq!(accuracy_line(&a_out), accuracy_line(&b_out));
    let model_a = std::fs::read(first.path().join("model.json")).unwrap();
    let model_b = std::fs::read(second.path().join("model.json")).unwrap();
    assert_eq!(model_a, model_b);
}

#[test]
fn predict_after_train_returns_probabilities() {
    let dir = tempdir().unwrap();
    assert!(run(dir.path(), &["train"], "").status.success());

    let output = run(dir.path(), &["predict"], HIGH_RISK_INPUT);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let value = json_line(&output);
    assert_eq!(value["nivel_riesgo"], 2);
    assert_eq!(value["nivel_riesgo_texto"], "Alto");
    let proba: Vec<f64> = ["bajo", "medio", "alto"]
        .iter()
        .map(|key| value["probabilidades"][key].as_f64().unwrap())
        .collect();
    assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    let best = proba
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &p)| if p > best.1 { (i, p) } else { best })
        .0;
    assert_eq!(value["nivel_riesgo"].as_u64(), Some(best as u64));
}

#[test]
fn predict_without_model_reports_error() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["predict"], HIGH_RISK_INPUT);
    assert_eq!(output.status.code(), Some(1));
    let value = json_line(&output);
    assert!(value["error"].as_str().unwrap().contains("model.json"));
}

#[test]
fn predict_with_malformed_json_exits_one() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["predict"], "{\"latitud\": ");
    assert_eq!(output.status.code(), Some(1));
    let value = json_line(&output);
    assert!(value["error"].as_str().unwrap().starts_with("Failed to parse JSON"));
}

#[test]
fn predict_with_empty_stdin_exits_one() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["predict"], "");
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(json_line(&output)["error"], "No input data received");
}

#[test]
fn predict_with_whitespace_stdin_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["predict"], "  \n");
    assert_eq!(output.status.code(), Some(1));
    let value = json_line(&output);
    assert!(value["error"].as_str().unwrap().starts_with("Failed to parse JSON"));
}

#[test]
fn predict_with_missing_feature_exits_one() {
    let dir = tempdir().unwrap();
    assert!(train_small(dir.path()).status.success());
    let output = run(dir.path(), &["predict"], r#"{"latitud": -13.45, "hora": 23}"#);
    assert_eq!(output.status.code(), Some(1));
    let message = json_line(&output)["error"].as_str().unwrap().to_string();
    assert!(message.starts_with("Prediction failed"), "{message}");
}

#[test]
fn no_command_prints_usage() {
    let dir = tempdir().unwrap();
    for args in [&[][..], &["serve"][..]] {
        let output = run(dir.path(), args, "");
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("Usage:"));
    }
}

#[test]
fn local_settings_file_sets_model_path() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("crime-risk.toml"),
        "model_path = \"artifacts/forest.json\"\nn_samples = 300\nn_trees = 10\n",
    )
    .unwrap();
    assert!(run(dir.path(), &["train"], "").status.success());
    assert!(dir.path().join("artifacts/forest.json").is_file());

    let output = run(dir.path(), &["predict"], HIGH_RISK_INPUT);
    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(json_line(&output).get("nivel_riesgo").is_some());
}

fn log_files(workdir: &std::path::Path) -> Vec<String> {
    let logs = workdir.join("home").join(".crime-risk").join("logs");
    let Ok(entries) = std::fs::read_dir(logs) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn each_command_writes_its_own_log_file() {
    let dir = tempdir().unwrap();
    assert!(train_small(dir.path()).status.success());
    run(dir.path(), &["predict"], HIGH_RISK_INPUT);
    let names = log_files(dir.path());
    assert!(names.iter().any(|name| name.starts_with("crime-risk_train_")), "{names:?}");
    assert!(names.iter().any(|name| name.starts_with("crime-risk_predict_")), "{names:?}");
    assert!(names.iter().all(|name| name.ends_with(".log")));
}

#[test]
fn usage_does_not_start_logging() {
    let dir = tempdir().unwrap();
    let output = run(dir.path(), &["--help"], "");
    assert!(output.status.success());
    assert!(log_files(dir.path()).is_empty());
}
