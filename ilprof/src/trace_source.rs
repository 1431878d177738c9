use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use ilprof_common::SampleEvent;
use tokio::sync::mpsc;

/// Recorded sample events, one JSON object per line:
/// `{"pid": 1234, "frames": [{"address": 4096, "name": "Bench.Run", "module": "/usr/bin/bench"}]}`
/// with frames innermost first. Blank lines and lines starting with `#` are skipped.
pub struct JsonTraceSource {
    path: PathBuf,
}

impl JsonTraceSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }

    pub fn events(&self) -> Result<Vec<SampleEvent>> {
        let file = File::open(&self.path).with_context(|| format!("unable to open {}", self.path.display()))?;
        parse_events(BufReader::new(file)).with_context(|| format!("invalid trace {}", self.path.display()))
    }

    /// Sends every recorded event into `tx`, closing the stream when done.
    pub async fn forward(&self, tx: mpsc::Sender<SampleEvent>) -> Result<usize> {
        let events = self.events()?;
        let count = events.len();
        for event in events {
            tx.send(event).await.context("sample consumer went away")?;
        }
        Ok(count)
    }
}

pub fn parse_events(reader: impl BufRead) -> Result<Vec<SampleEvent>> {
    let mut events = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.context("unable to read line")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(line).with_context(|| format!("line {}", i + 1))?;
        events.push(event);
    }
    Ok(events)
}
