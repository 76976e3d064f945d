mod cli;
mod config_loader;
mod generate_config;
mod password;

use clap::Parser;
use cli::Cli;
use pgupsert_core::{render_snapshot, Configuration, Orchestrator, PgUpsertError, QueryExecutor, RunOutcome, SilentPrompter, TerminalPrompter};
use pgupsert_driver_postgres::{connect, ConnectParams};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.generate_config {
        generate_config::run(&cli);
        return ExitCode::from(0u8);
    }

    init_logging(&cli);

    match run(&cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            log::error!("{err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<i32, PgUpsertError> {
    let raw = config_loader::build_raw_configuration(cli)?;
    let config = Configuration::build(raw)?;

    let password = password::resolve()?;
    let params = ConnectParams {
        host: &config.host,
        port: config.port,
        user: &config.user,
        password: &password,
        database: &config.database,
    };

    let mut executor = connect(&params)?;
    let interactive = config.interactive;

    let outcome = {
        let mut orchestrator = Orchestrator::new(&mut executor, config);
        if interactive {
            let stdin = std::io::stdin();
            let mut prompter = TerminalPrompter::new(stdin.lock(), std::io::stderr());
            orchestrator.run(&mut prompter)
        } else {
            orchestrator.run(&mut SilentPrompter)
        }
    };
    let _ = executor.close();

    let exit_code = outcome.exit_code();

    let snapshot = match &outcome {
        RunOutcome::Committed { snapshot } => Some(snapshot),
        RunOutcome::RolledBackQaFailed { snapshot } => Some(snapshot),
        RunOutcome::RolledBackCancelled { snapshot } => Some(snapshot),
        RunOutcome::RolledBackError { .. } => None,
    };

    if let Some(snapshot) = snapshot {
        eprintln!("{}", render_snapshot(snapshot));
    }

    if let RunOutcome::RolledBackError { source } = outcome {
        return Err(source);
    }

    Ok(exit_code)
}

fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_millis();

    if let Some(path) = &cli.logfile {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("warning: could not open logfile {}: {e}", path.display());
            }
        }
    }

    builder.init();
}
