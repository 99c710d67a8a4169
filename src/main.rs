//! CLI tool to validate and resolve rewrite rule files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rewrite_conf::{Compiler, CompilerConfig, Diagnostic, Lexer, Reporter};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rewrite-conf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directive that `source => target` rules expand into
    #[arg(long, global = true, default_value = rewrite_conf::config::DEFAULT_PASSTHROUGH_DIRECTIVE)]
    passthrough: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that rule files compile
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the resolved configuration as JSON
    Resolve {
        file: PathBuf,
        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Dump the token stream of a rule file
    Tokens { file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Prints diagnostics straight to stderr.
struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&mut self, diagnostic: &Diagnostic) {
        eprint!("{diagnostic}");
    }
}

fn compiler_for(cli: &Cli, path: &Path) -> Compiler<StderrReporter> {
    Compiler::new(
        CompilerConfig::new()
            .with_source_name(path.display().to_string())
            .with_passthrough_directive(cli.passthrough.clone()),
    )
    .with_reporter(StderrReporter)
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    match &cli.command {
        Commands::Check { files } => {
            let mut ok = true;
            for path in files {
                let content = read(path)?;
                match compiler_for(cli, path).compile(&content) {
                    Ok(config) => {
                        let locations: usize = config.values().map(|d| d.locations.len()).sum();
                        eprintln!(
                            "{}: valid ({} domain(s), {locations} location(s))",
                            path.display(),
                            config.len()
                        );
                    }
                    Err(_) => ok = false,
                }
            }
            Ok(ok)
        }
        Commands::Resolve { file, pretty } => {
            let content = read(file)?;
            match compiler_for(cli, file).compile(&content) {
                Ok(config) => {
                    let json = if *pretty {
                        serde_json::to_string_pretty(&config)?
                    } else {
                        serde_json::to_string(&config)?
                    };
                    println!("{json}");
                    Ok(true)
                }
                Err(_) => Ok(false),
            }
        }
        Commands::Tokens { file } => {
            let content = read(file)?;
            for token in Lexer::new(&content) {
                match token {
                    Ok(token) => println!(
                        "{}:{}\t{}\t{:?}",
                        token.span.start.line, token.span.start.column, token.kind, token.value
                    ),
                    Err(e) => {
                        StderrReporter
                            .report(&e.diagnostic.with_source_name(file.display().to_string()));
                        return Ok(false);
                    }
                }
            }
            Ok(true)
        }
    }
}
