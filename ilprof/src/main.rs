use std::fs;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ilprof::{
    config::ProfilerConfig,
    disasm::{Disassemble, ProcessDisassembler},
    preflight,
    report::Exporter,
    symbolication::{dump_elf::dump_elf, ElfSymbolResolver, SymbolResolver},
    trace_source::JsonTraceSource,
    Collector,
};
use tokio::sync::mpsc;
use tracing::Level;

use crate::args::{Commands, Opt};

mod args;

fn init_logger(verbose: bool) {
    let default = if verbose { Level::DEBUG } else { Level::INFO };
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|l| l.parse().ok())
        .unwrap_or(default);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    init_logger(opt.verbose);

    let config = match &opt.config {
        Some(path) => ProfilerConfig::from_path(path)?,
        None => ProfilerConfig::new()?,
    };

    match opt.command {
        Commands::Report {
            pid,
            root,
            input,
            depth,
            output,
            name,
        } => {
            let resolver: Arc<dyn SymbolResolver> = Arc::new(ElfSymbolResolver::new(pid));
            let (tx, rx) = mpsc::channel(config.collector.channel_capacity.max(1));

            let mut collector = Collector::begin(&root, pid, rx, Some(resolver))?;
            collector.start();
            let sent = JsonTraceSource::new(&input).forward(tx).await?;
            tracing::debug!("replayed {sent} events from {}", input.display());
            collector.drain().await;
            collector.stop().await;

            let mut disasm = ProcessDisassembler::attach(pid);
            let max_depth = depth.unwrap_or(config.report.max_recursion_depth);
            let report = match collector.render(&mut disasm, max_depth) {
                Ok(report) => report,
                Err(e) => {
                    let e = anyhow::Error::from(e);
                    tracing::error!("{e:#}");
                    format!("{e:#}\n")
                }
            };

            if let Some(output) = output {
                fs::write(&output, &report).with_context(|| format!("unable to write {}", output.display()))?;
            } else if let Some(name) = name {
                Exporter::new(&config.report.output_dir).export(&name, &report)?;
            } else {
                io::stdout().write_all(report.as_bytes())?;
            }
        }
        Commands::Disasm { pid, first, last } => {
            let mut disasm = ProcessDisassembler::attach(pid);
            let instructions = disasm
                .instructions(first, last)
                .with_context(|| format!("unable to disassemble {first:#x}..={last:#x} in {pid}"))?;
            let mut stdout = io::stdout().lock();
            for (address, text) in instructions {
                writeln!(stdout, "{address:016x} {text}")?;
            }
        }
        Commands::Symbols { paths } => {
            let mut stdout = io::stdout().lock();
            for p in &paths {
                dump_elf(p, &mut stdout)?;
            }
        }
        Commands::Check { pid } => {
            let errors = preflight::validate(pid);
            for e in &errors {
                println!("{e}");
            }
            if errors.iter().any(|e| e.is_critical) {
                bail!("process {pid} cannot be profiled");
            }
            println!("process {pid} ok");
        }
    }

    Ok(())
}
