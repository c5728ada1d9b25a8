//! gpflume - feed stdin records through the gpfdist ingestion adapter
//!
//! Demo/operational harness: each stdin line is admitted as one record,
//! framed with the configured delimiter, and drained by a stdout-writing
//! listener. SIGINT/SIGTERM trigger the adapter's graceful shutdown
//! protocol.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};

use gpflume_core::ring::Pop;
use gpflume_core::RingBuffer;
use gpflume_gpfdist::adapter::{GpfdistAdapter, Payload};
use gpflume_gpfdist::config::GpfdistConfig;
use gpflume_gpfdist::listener::{Listener, ListenerFactory};

#[derive(Parser)]
#[command(name = "gpflume")]
#[command(about = "Stream stdin records through the gpfdist ingestion adapter")]
#[command(version)]
struct Cli {
    /// Listener port (cosmetic for the stdout listener)
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Delimiter appended to every record
    #[arg(long, default_value = "\n")]
    delimiter: String,

    /// Push records without any delimiter
    #[arg(long)]
    no_delimiter: bool,

    /// Frame slots in the shared buffer
    #[arg(long, default_value_t = 8192)]
    buffer_slots: usize,

    /// Log ingest rates every Nth record (0 disables)
    #[arg(long, default_value_t = 0)]
    rate_interval: u64,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(long)]
    quiet: bool,
}

/// Listener that drains the buffer to stdout on a worker thread.
struct StdoutListener {
    port: u16,
    drain: Option<JoinHandle<()>>,
}

impl Listener for StdoutListener {
    fn local_port(&self) -> u16 {
        self.port
    }

    fn stop(&mut self) -> io::Result<()> {
        // The drain thread exits once the buffer terminates
        if let Some(handle) = self.drain.take() {
            handle
                .join()
                .map_err(|_| io::Error::other("stdout drain thread panicked"))?;
        }
        Ok(())
    }
}

struct StdoutFactory;

impl ListenerFactory for StdoutFactory {
    fn open(
        &self,
        buffer: Arc<RingBuffer>,
        config: &GpfdistConfig,
    ) -> io::Result<Box<dyn Listener>> {
        let port = config.port;
        let drain = std::thread::Builder::new()
            .name("stdout-drain".into())
            .spawn(move || {
                let stdout = io::stdout();
                loop {
                    match buffer.pop_timeout(Duration::from_millis(100)) {
                        Pop::Frame(frame) => {
                            let mut out = stdout.lock();
                            if out.write_all(&frame).and_then(|()| out.flush()).is_err() {
                                log::warn!("stdout closed, abandoning drain");
                                return;
                            }
                        }
                        Pop::Idle => continue,
                        Pop::Closed => return,
                    }
                }
            })?;
        Ok(Box::new(StdoutListener {
            port,
            drain: Some(drain),
        }))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    gpflume_core::init_logging(cli.quiet, cli.debug);

    let shutdown = Arc::new(AtomicBool::new(false));
    for sig in [SIGINT, SIGTERM] {
        signal_hook::flag::register(sig, shutdown.clone())
            .context("cannot register signal handler")?;
    }

    let config = GpfdistConfig {
        port: cli.port,
        delimiter: if cli.no_delimiter {
            None
        } else {
            Some(cli.delimiter.clone())
        },
        buffer_slots: cli.buffer_slots,
        rate_interval: cli.rate_interval,
        ..Default::default()
    };

    let adapter = GpfdistAdapter::new(config, Box::new(StdoutFactory));
    adapter.start().context("adapter start failed")?;
    log::info!("ingesting from stdin, Ctrl-C for graceful shutdown");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if shutdown.load(Ordering::Relaxed) {
            log::info!("shutdown requested");
            break;
        }
        let line = match line {
            Ok(line) => line,
            // Signal during a blocking read
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("stdin read failed"),
        };
        if let Err(e) = adapter.handle(Payload::Text(line)) {
            log::error!("record rejected: {e}");
            break;
        }
    }

    adapter.stop().context("adapter stop failed")?;
    Ok(())
}
