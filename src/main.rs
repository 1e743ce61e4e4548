//! RepoQ command-line entry point

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repoq::cli::{self, Cli, EXIT_ERROR};

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("repoq={}", cli.log_level)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let code = match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", console::style("error:").red().bold(), e);
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}
