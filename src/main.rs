use std::io::Write;

use anyhow::Result;
use clap::Parser;

use syntax_buffer::cli::{self, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .filter_level(cli.verbose.log_level_filter())
        .target(env_logger::fmt::Target::Stderr)
        .init();

    cli::run(cli.command)
}
