use census_report::{
    CliArgs, Command, LoggingConfig, ReportError, init_logging, load_config,
    render_group_listing, run_groups, run_report,
};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let _guard = match init_logging(LoggingConfig::from_env()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let cli = CliArgs::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.code();
            tracing::error!(
                code = code.code(),
                category = code.category(),
                error = %err,
                "command failed"
            );
            eprintln!("error: {err}");
            for hint in err.suggestions() {
                eprintln!("  hint: {hint}");
            }
            ExitCode::from(u8::try_from(code.code()).unwrap_or(1))
        }
    }
}

fn run(cli: CliArgs) -> Result<(), ReportError> {
    match cli.command {
        Command::Groups { json } => {
            let config = load_config(&cli.inputs, None)?;
            let summaries = run_groups(&config)?;
            let listing =
                render_group_listing(&summaries, json).map_err(|err| ReportError::InvalidConfig {
                    message: format!("failed to render group listing: {err}"),
                })?;
            print!("{listing}");
        }
        Command::Report { groups } => {
            let config = load_config(&cli.inputs, groups)?;
            let manifest = run_report(&config)?;
            for path in manifest.written_paths() {
                println!("{path}");
            }
            for failure in manifest.failures() {
                if let census_report::export::ArtifactOutcome::Failed { placeholder } =
                    &failure.outcome
                {
                    println!("{}: {placeholder}", failure.format);
                }
            }
        }
    }
    Ok(())
}
