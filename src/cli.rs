//! Command-line parsing for the `crime-risk` binary.

use std::path::PathBuf;

use crate::config::TrainSettings;

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Train(TrainArgs),
    Predict(PredictArgs),
    /// No command, an unknown command, or `--help`.
    Usage,
}

impl Command {
    /// Label used to tag this run's log file. `None` for commands that do no
    /// work worth logging.
    pub fn log_label(&self) -> Option<&'static str> {
        match self {
            Command::Train(_) => Some("train"),
            Command::Predict(_) => Some("predict"),
            Command::Usage => None,
        }
    }
}

/// Flags accepted by `train`. Unset flags defer to the settings file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainArgs {
    pub config: Option<PathBuf>,
    pub model_out: Option<PathBuf>,
    pub seed: Option<u64>,
    pub n_samples: Option<usize>,
    pub n_trees: Option<usize>,
    pub max_depth: Option<usize>,
}

impl TrainArgs {
    /// Layer these flags over file/default settings.
    pub fn apply(&self, mut settings: TrainSettings) -> TrainSettings {
        if let Some(path) = &self.model_out {
            settings.model_path = path.clone();
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(n) = self.n_samples {
            settings.n_samples = n;
        }
        if let Some(n) = self.n_trees {
            settings.n_trees = n;
        }
        if let Some(depth) = self.max_depth {
            settings.max_depth = Some(depth);
        }
        settings.normalized()
    }
}

/// Flags accepted by `predict`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictArgs {
    pub config: Option<PathBuf>,
    pub model: Option<PathBuf>,
}

impl PredictArgs {
    pub fn apply(&self, mut settings: TrainSettings) -> TrainSettings {
        if let Some(path) = &self.model {
            settings.model_path = path.clone();
        }
        settings.normalized()
    }
}

/// Parse arguments after the program name.
pub fn parse_args(args: Vec<String>) -> Result<Command, String> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(Command::Usage);
    };
    match command.as_str() {
        "train" => parse_train(rest).map(|args| args.map_or(Command::Usage, Command::Train)),
        "predict" => parse_predict(rest).map(|args| args.map_or(Command::Usage, Command::Predict)),
        _ => Ok(Command::Usage),
    }
}

fn parse_train(args: &[String]) -> Result<Option<TrainArgs>, String> {
    let mut out = TrainArgs::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Ok(None),
            "--config" => out.config = Some(PathBuf::from(value(args, &mut idx, "--config")?)),
            "--out" => out.model_out = Some(PathBuf::from(value(args, &mut idx, "--out")?)),
            "--seed" => out.seed = Some(parse_number(args, &mut idx, "--seed")?),
            "--samples" => out.n_samples = Some(parse_number(args, &mut idx, "--samples")?),
            "--trees" => out.n_trees = Some(parse_number(args, &mut idx, "--trees")?),
            "--max-depth" => out.max_depth = Some(parse_number(args, &mut idx, "--max-depth")?),
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", usage())),
        }
        idx += 1;
    }
    Ok(Some(out))
}

fn parse_predict(args: &[String]) -> Result<Option<PredictArgs>, String> {
    let mut out = PredictArgs::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Ok(None),
            "--config" => out.config = Some(PathBuf::from(value(args, &mut idx, "--config")?)),
            "--model" => out.model = Some(PathBuf::from(value(args, &mut idx, "--model")?)),
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", usage())),
        }
        idx += 1;
    }
    Ok(Some(out))
}

fn value<'a>(args: &'a [String], idx: &mut usize, flag: &str) -> Result<&'a str, String> {
    *idx += 1;
    args.get(*idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_number<T: std::str::FromStr>(
    args: &[String],
    idx: &mut usize,
    flag: &str,
) -> Result<T, String> {
    let raw = value(args, idx, flag)?;
    raw.parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {raw}"))
}

/// Usage text printed for `--help` and unrecognized commands.
pub fn usage() -> String {
    [
        "crime-risk",
        "",
        "Trains a random forest on synthetic Cusco crime data and predicts risk levels.",
        "",
        "Usage:",
        "  crime-risk train [options]",
        "  crime-risk predict [--model <file>] [--config <file>] < record.json",
        "",
        "Train options:",
        "  --out <file>         Model output path (default: model.json).",
        "  --seed <n>           Seed for data generation, split, and forest (default: 42).",
        "  --samples <n>        Synthetic records to generate (default: 1000).",
        "  --trees <n>          Trees in the forest (default: 100).",
        "  --max-depth <n>      Depth limit per tree, 0 for none (default: 10).",
        "  --config <file>      Settings file (default: crime-risk.toml if present).",
        "",
        "Predict reads one JSON object with keys latitud, longitud, hora, dia_semana,",
        "mes, tipo_delito from stdin and prints the predicted risk level as JSON.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn only_working_commands_get_a_log_label() {
        assert_eq!(parse_args(args(&["train"])).unwrap().log_label(), Some("train"));
        assert_eq!(parse_args(args(&["predict"])).unwrap().log_label(), Some("predict"));
        assert_eq!(Command::Usage.log_label(), None);
    }

    #[test]
    fn missing_or_unknown_command_is_usage() {
        assert_eq!(parse_args(args(&[])).unwrap(), Command::Usage);
        assert_eq!(parse_args(args(&["serve"])).unwrap(), Command::Usage);
        assert_eq!(parse_args(args(&["train", "--help"])).unwrap(), Command::Usage);
    }

    #[test]
    fn parses_train_flags() {
        let cmd = parse_args(args(&[
            "train", "--out", "m.json", "--seed", "7", "--trees", "10", "--max-depth", "0",
        ]))
        .unwrap();
        let Command::Train(train) = cmd else {
            panic!("expected train");
        };
        assert_eq!(train.model_out, Some(PathBuf::from("m.json")));
        assert_eq!(train.seed, Some(7));
        assert_eq!(train.n_trees, Some(10));
        let settings = train.apply(TrainSettings::default());
        assert_eq!(settings.model_path, PathBuf::from("m.json"));
        assert_eq!(settings.n_trees, 10);
        assert_eq!(settings.max_depth, None);
        assert_eq!(settings.n_samples, 1000);
    }

    #[test]
    fn parses_predict_flags() {
        let cmd = parse_args(args(&["predict", "--model", "other.json"])).unwrap();
        assert_eq!(
            cmd,
            Command::Predict(PredictArgs {
                config: None,
                model: Some(PathBuf::from("other.json")),
            })
        );
    }

    #[test]
    fn rejects_bad_flags() {
        assert!(parse_args(args(&["train", "--seed"])).is_err());
        assert!(parse_args(args(&["train", "--seed", "abc"])).is_err());
        assert!(parse_args(args(&["predict", "--verbose"])).is_err());
    }
}
