use std::env::args;
use std::hint::black_box;
use std::process;

use anyhow::{bail, Context, Result};
use ilprof::{disasm::ProcessDisassembler, Collector};
use ilprof_common::{RawFrame, SampleEvent};
use tokio::sync::mpsc;

const SAMPLES: u64 = 10;

#[inline(never)]
fn hot_loop(n: u64) -> u64 {
    (0..n).fold(0, |acc, i| black_box(acc ^ i.wrapping_mul(31)))
}

/// Samples of this very process, as an unwinder would report them
fn own_events(pid: u32, leaf: &str) -> Vec<SampleEvent> {
    let hot = hot_loop as usize as u64;
    let main = main as usize as u64;
    (0..SAMPLES)
        .map(|_| SampleEvent::new(pid, vec![RawFrame::new(hot, leaf), RawFrame::new(main, "ilprof_tests::main")]))
        .collect()
}

async fn profile_self(root: &str, leaf: &str) -> Result<String> {
    let pid = process::id();
    black_box(hot_loop(1000));

    let (tx, rx) = mpsc::channel(16);
    let mut collector = Collector::begin(root, pid, rx, None)?;
    collector.start();
    for e in own_events(pid, leaf) {
        tx.send(e).await.context("collector went away")?;
    }
    drop(tx);
    collector.drain().await;
    collector.stop().await;

    let mut disasm = ProcessDisassembler::attach(pid);
    Ok(collector.render(&mut disasm, 5)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let Some(test) = args().nth(1) else { bail!("no input") };
    let report = match test.as_str() {
        "hotloop" => profile_self("hot_loop", "ilprof_tests::hot_loop").await?,
        "nomatch" => profile_self("cold_path", "ilprof_tests::hot_loop").await?,
        _ => bail!("unknown scenario {test}"),
    };
    print!("{report}");
    Ok(())
}
