use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Terminal coloring
    #[arg(short = 'c', long, value_parser = ["on", "off"])]
    pub color: Option<String>,

    /// Print a per-test summary to stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Override the job's iteration count
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32))]
    pub iters: Option<u32>,

    /// Path to the job document (JSON), or '-' to read it from stdin
    pub path: PathBuf,
}
