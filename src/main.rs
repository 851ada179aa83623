//! Entry point for the `crime-risk` command-line tool.

use std::io::{Read, Write};
use std::process::ExitCode;

use crime_risk::cli::{self, Command, PredictArgs, TrainArgs};
use crime_risk::config;
use crime_risk::dataset::RiskLevel;
use crime_risk::logging;
use crime_risk::predictor::{self, PredictError, PredictResponse};
use crime_risk::trainer::{self, TrainReport};

fn main() -> ExitCode {
    let command = match cli::parse_args(std::env::args().skip(1).collect()) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(label) = command.log_label()
        && let Err(err) = logging::init(label)
    {
        eprintln!("Logging disabled: {err}");
    }

    match command {
        Command::Usage => {
            println!("{}", cli::usage());
            ExitCode::SUCCESS
        }
        Command::Train(args) => match run_train(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{err}");
                ExitCode::FAILURE
            }
        },
        Command::Predict(args) => run_predict(&args),
    }
}

fn run_train(args: &TrainArgs) -> Result<(), String> {
    let settings = config::load_settings(args.config.as_deref()).map_err(|err| err.to_string())?;
    let settings = args.apply(settings);
    println!("Generating synthetic data...");
    println!("Training random forest...");
    let report = trainer::train(&settings).map_err(|err| err.to_string())?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &TrainReport) {
    println!("Model accuracy: {:.2}%", report.accuracy * 100.0);
    println!(
        "train rows: {}  test rows: {}",
        report.train_rows, report.test_rows
    );
    for (idx, stats) in report.per_class.iter().enumerate() {
        let name = RiskLevel::from_index(idx).map_or("?", RiskLevel::label);
        println!(
            "class {idx} {name:<6}  precision={:.3}  recall={:.3}  support={}",
            stats.precision, stats.recall, stats.support
        );
    }
    println!("confusion matrix (rows=true, cols=pred):");
    for truth in 0..report.confusion.n_classes {
        let mut row = String::new();
        for pred in 0..report.confusion.n_classes {
            row.push_str(&format!("{:6}", report.confusion.get(truth, pred)));
        }
        println!("{row}");
    }
    println!("Model saved to {}", report.model_path.display());
    println!("fingerprint: {}", report.fingerprint);
}

fn run_predict(args: &PredictArgs) -> ExitCode {
    let response = match read_request(args) {
        Ok((model_path, raw)) => predictor::respond(&model_path, &raw),
        Err(response) => response,
    };
    let mut stdout = std::io::stdout().lock();
    if writeln!(stdout, "{}", response.to_json_line()).is_err() {
        return ExitCode::FAILURE;
    }
    ExitCode::from(response.exit_code())
}

fn read_request(args: &PredictArgs) -> Result<(std::path::PathBuf, String), PredictResponse> {
    let settings = config::load_settings(args.config.as_deref())
        .map_err(|err| error_response(format!("Prediction failed: {err}")))?;
    let settings = args.apply(settings);
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .map_err(|err| error_response(format!("{}: {err}", PredictError::NoInput)))?;
    Ok((settings.model_path, raw))
}

fn error_response(error: String) -> PredictResponse {
    PredictResponse::Error(predictor::ErrorResponse { error })
}
