//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `mandalart_core` linkage.
//! - Start the core runtime from an optional JSON config and report its state.
//!
//! Usage: `mandalart_cli [CONFIG]`

use clap::Parser;
use mandalart_core::db::migrations::current_user_version;
use mandalart_core::{AppConfig, CoreRuntime};
use std::path::PathBuf;
use std::process::ExitCode;

/// Starts the mandalart core once and reports its state.
#[derive(Debug, Parser)]
#[command(name = "mandalart_cli", version)]
struct CliArgs {
    /// JSON config file; built-in defaults when omitted.
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    println!("mandalart_core ping={}", mandalart_core::ping());
    println!("mandalart_core version={}", mandalart_core::core_version());

    let config = match &args.config {
        Some(path) => match AppConfig::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("mandalart_cli config error: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };

    let runtime = match CoreRuntime::start(config) {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("mandalart_cli startup error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let routing = &runtime.config().routing;
    println!(
        "mandalart_core locales={} default_locale={}",
        routing.supported_locales.join(","),
        routing.default_locale
    );
    match current_user_version(runtime.connection()) {
        Ok(version) => println!("mandalart_core schema_version={version}"),
        Err(err) => {
            eprintln!("mandalart_cli schema error: {err}");
            runtime.shutdown();
            return ExitCode::FAILURE;
        }
    }

    runtime.shutdown();
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn config_path_is_optional() {
        let args = CliArgs::try_parse_from(["mandalart_cli"]).unwrap();
        assert_eq!(args.config, None);

        let args = CliArgs::try_parse_from(["mandalart_cli", "conf/app.json"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("conf/app.json")));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(CliArgs::try_parse_from(["mandalart_cli", "--verbose"]).is_err());
    }
}
