use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ilprof_common::SampleEvent;
use thiserror::Error;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{
    disasm::Disassemble,
    profile::ProfileData,
    report::RenderError,
    stack::capture_stack,
    symbolication::SymbolResolver,
};

pub const NO_SAMPLES_MESSAGE: &str = "Failed to collect any CPU samples.";

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("no tokio runtime to run the sample consumer on")]
    NoRuntime(#[from] TryCurrentError),
}

/// Counters reported by the consumer task when it exits
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerStats {
    /// events delivered by the stream
    pub received: u64,
    /// events from the target process inside the measured window
    pub processed: u64,
    /// events that reached the root method
    pub attributed: u64,
}

/// One measurement of one root method in one process.
///
/// Events are consumed on a background task for as long as the stream is open;
/// only those arriving between [`Collector::start`] and [`Collector::stop`] are attributed.
pub struct Collector {
    pid: u32,
    profile: Arc<ProfileData>,
    started: Arc<AtomicBool>,
    data_collected: Arc<AtomicBool>,
    stop_tx: watch::Sender<()>,
    consumer: Option<JoinHandle<ConsumerStats>>,
    stats: ConsumerStats,
}

impl Collector {
    /// Attaches to `events`, consuming them on the current tokio runtime
    pub fn begin(
        root_method: &str,
        pid: u32,
        events: mpsc::Receiver<SampleEvent>,
        resolver: Option<Arc<dyn SymbolResolver>>,
    ) -> Result<Self, CollectorError> {
        let runtime = Handle::try_current()?;
        let profile = Arc::new(ProfileData::new(root_method));
        let started = Arc::new(AtomicBool::new(false));
        let data_collected = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = watch::channel(());

        let consumer = runtime.spawn(consume(
            events,
            stop_rx,
            pid,
            Arc::clone(&profile),
            Arc::clone(&started),
            Arc::clone(&data_collected),
            resolver,
        ));

        tracing::info!("collecting samples of `{root_method}` in process {pid}");
        Ok(Self {
            pid,
            profile,
            started,
            data_collected,
            stop_tx,
            consumer: Some(consumer),
            stats: ConsumerStats::default(),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn profile(&self) -> &ProfileData {
        &self.profile
    }

    /// Samples arriving from now on are attributed
    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
        tracing::debug!("measurement started");
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// true once any event was delivered, whatever its process or timing
    pub fn data_collected(&self) -> bool {
        self.data_collected.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// Waits until the stream is closed by its sender and every queued event was consumed
    pub async fn drain(&mut self) {
        self.join().await;
    }

    /// Ends the measured window and detaches from the stream. Events still queued are dropped.
    pub async fn stop(&mut self) {
        self.started.store(false, Ordering::Release);
        let _ = self.stop_tx.send(());
        self.join().await;
    }

    async fn join(&mut self) {
        let Some(consumer) = self.consumer.take() else { return };
        match consumer.await {
            Ok(stats) => {
                tracing::info!(
                    "Processed: {} samples, {} in {}, {} attributed",
                    stats.received,
                    stats.processed,
                    self.pid,
                    stats.attributed
                );
                self.stats = stats;
            }
            Err(e) => tracing::error!("sample consumer failed: {e}"),
        }
    }

    /// Produces the report for everything collected so far. Call after [`Collector::stop`].
    pub fn render<D: Disassemble>(&self, disasm: &mut D, max_depth: usize) -> Result<String, RenderError> {
        let mut out = String::new();
        if !self.data_collected() {
            let _ = writeln!(out, "{NO_SAMPLES_MESSAGE}");
            return Ok(out);
        }

        self.profile.build_report(&mut out, disasm, max_depth)?;
        Ok(out)
    }
}

async fn consume(
    mut events: mpsc::Receiver<SampleEvent>,
    mut stop_rx: watch::Receiver<()>,
    pid: u32,
    profile: Arc<ProfileData>,
    started: Arc<AtomicBool>,
    data_collected: Arc<AtomicBool>,
    resolver: Option<Arc<dyn SymbolResolver>>,
) -> ConsumerStats {
    let mut stats = ConsumerStats::default();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                stats.received += 1;
                data_collected.store(true, Ordering::Release);

                if event.pid != pid || !started.load(Ordering::Acquire) {
                    continue;
                }
                stats.processed += 1;

                let stack = capture_stack(&event.frames, resolver.as_ref());
                if profile.add_stack(&stack) {
                    stats.attributed += 1;
                }
            },
            _ = stop_rx.changed() => {
                break;
            },
        }
    }

    stats
}
