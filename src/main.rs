// Command-line entry point for depreader.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use depreader::application::{Extractor, ReadDependencies};
use depreader::config::{Cli, Config, Engine};
use depreader::error::Error;
use depreader::infrastructure::{ScipProvider, SynProvider};
use depreader::ports::json_lines::JsonLinesSink;
use depreader::ports::ProgramModelProvider;
use depreader::telemetry;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("depreader: {}", err);
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let config = Config::resolve(cli)?;
    telemetry::init(&config.log_filter)?;

    let policy = config.policy();
    let provider: Box<dyn ProgramModelProvider> = match config.engine {
        Engine::Syn => {
            Box::new(SynProvider::new(config.jobs).with_initializer(policy.initializer()))
        }
        Engine::Scip => Box::new(
            ScipProvider::new(config.language)
                .with_index(config.index.clone())
                .with_cache(config.use_cache),
        ),
    };
    info!(engine = ?config.engine, language = %config.language, "reading dependencies");

    let extractor = Extractor::new(policy).with_ordering(config.ordering);
    let mut sink = JsonLinesSink::new(io::stdout().lock());
    let summary = ReadDependencies {
        provider: provider.as_ref(),
        extractor: &extractor,
    }
    .run(&config.search_dir, &mut sink)?;

    info!(
        emitted = summary.emitted,
        visited = summary.edges_visited,
        "done"
    );
    Ok(())
}
