//! jobbroker: validate a broker config and initialize its modules.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Load runtime settings
//!   4. Resolve effective log level (CLI `-v` flags > env > settings)
//!   5. Init logger once
//!   6. Load the broker config against the built-in modules
//!   7. Print a JSON summary and exit with the outcome

use std::process::ExitCode;

use jobbroker::error::AppError;
use jobbroker::{JobBroker, LoadOutcome, logger, settings};
use tracing::info;

/// Exit status when the broker config was rejected.
const EXIT_REJECTED: u8 = 2;

struct CliArgs {
    log_level: Option<&'static str>,
    debug: bool,
    settings_path: Option<String>,
    config_path: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_REJECTED),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the broker config loaded.
async fn run() -> Result<bool, AppError> {
    // Load .env if present; ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args()?;

    let settings = settings::load(args.settings_path.as_deref())?;

    let debug_mode = args.debug || settings.debug;
    let effective_log_level = args.log_level.unwrap_or(settings.log_level.as_str());
    logger::init(logger::LogSetup {
        level: effective_log_level,
        prefer_level: args.log_level.is_some(),
        trace_broker: debug_mode,
        log_file: settings.log_file.as_deref(),
    })?;

    let config_path = args
        .config_path
        .ok_or_else(|| AppError::Settings("missing <BROKER_CONFIG> argument (see --help)".into()))?;

    info!(
        config = %config_path,
        debug = debug_mode,
        log_level = %effective_log_level,
        "loading broker config"
    );

    let broker = JobBroker::with_builtins(debug_mode);
    let outcome = broker
        .load_async(config_path)
        .await
        .map_err(|e| AppError::Load(e.to_string()))?;

    let loaded = outcome.0.is_success();
    println!("{}", summary(&outcome));
    Ok(loaded)
}

fn summary((result, loaded): &LoadOutcome) -> serde_json::Value {
    let mut out = serde_json::json!({
        "errorCode": result.error_code,
        "code": result.error_code.code(),
    });
    if let Some(message) = &result.message {
        out["message"] = message.as_str().into();
    }
    if let Some(loaded) = loaded {
        out["brokerId"] = loaded.id().to_string().into();
        out["jobTypes"] = loaded.job_types().collect::<Vec<_>>().into();
    }
    out
}

fn parse_cli_args() -> Result<CliArgs, AppError> {
    let mut verbosity = 0u8;
    let mut debug = false;
    let mut settings_path = None;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            config_path = iter.next().or(config_path);
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: jobbroker [OPTIONS] <BROKER_CONFIG>");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -d, --debug                Trace every pipeline step");
                println!(
                    "  -s, --settings <PATH>      Runtime settings file (default: {})",
                    settings::DEFAULT_SETTINGS_PATH
                );
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-d" | "--debug" => debug = true,
            "-s" | "--settings" => {
                let path = iter.next().ok_or_else(|| {
                    AppError::Settings("-s/--settings requires a path argument".into())
                })?;
                settings_path = Some(path);
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            a if a.starts_with('-') && a.len() > 1 => {
                return Err(AppError::Settings(format!("unknown option: {a}")));
            }
            _ => config_path = Some(arg),
        }
    }

    Ok(CliArgs {
        log_level: logger::level_for_verbosity(verbosity),
        debug,
        settings_path,
        config_path,
    })
}
