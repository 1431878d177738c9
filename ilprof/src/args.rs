use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ilprof::utils::parse_address;

#[derive(Debug, Parser)]
pub struct Opt {
    /// Config file, defaults to Ilprof.toml in the current directory
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log at debug level, unless LOG_LEVEL says otherwise
    #[clap(short, long, global = true)]
    pub verbose: bool,
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the instruction-level report of a root method from recorded samples
    Report {
        /// Process the samples were taken from
        #[clap(short, long)]
        pid: u32,
        /// Method whose call tree is reported
        #[clap(short, long)]
        root: String,
        /// Recorded samples, one JSON event per line
        #[clap(short, long)]
        input: PathBuf,
        /// Call-tree levels rendered below the root
        #[clap(short, long)]
        depth: Option<usize>,
        /// Write the report to this file
        #[clap(short, long)]
        output: Option<PathBuf>,
        /// Export the report as `<output_dir>/<name>-ilp.txt`
        #[clap(short, long, conflicts_with = "output")]
        name: Option<String>,
    },
    /// Disassemble a live address range
    Disasm {
        #[clap(short, long)]
        pid: u32,
        #[clap(value_parser = parse_address)]
        first: u64,
        #[clap(value_parser = parse_address)]
        last: u64,
    },
    /// Print symbols
    Symbols {
        paths: Vec<String>,
    },
    /// Check whether a process can be profiled
    Check {
        #[clap(short, long)]
        pid: u32,
    },
}
