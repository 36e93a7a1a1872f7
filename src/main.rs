use clap::Parser;
use lftrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
