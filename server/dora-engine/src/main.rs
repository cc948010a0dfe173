//! Binary entrypoint: read one ScanInput JSON object from stdin, write DoraMetrics to stdout.
//!
//! Invalid input produces an ErrorOutput line on stdout and exit code 1.
//! Matching policy comes from DORA_EXACT_MATCH / DORA_RELEASE_ORDER.
//! Diagnostics go to stderr (RUST_LOG, default `warn`).

use dora_engine::types::{ErrorOutput, ScanInput};
use dora_engine::{Config, Engine, EngineError};
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(io::stderr)
    .with_target(false)
    .init();

  if let Err(e) = run_binary() {
    let err = ErrorOutput::from(&e);
    let mut out = io::stdout().lock();
    let _ = serde_json::to_writer(&mut out, &err);
    let _ = writeln!(out);
    let _ = writeln!(io::stderr(), "dora-engine error: {}", e);
    std::process::exit(1);
  }
}

fn run_binary() -> Result<(), EngineError> {
  let mut raw = String::new();
  io::stdin().lock().read_to_string(&mut raw)?;
  let input: ScanInput = serde_json::from_str(raw.trim())?;
  input.time_window.validate()?;

  let config = Config::from_env()?;
  let metrics = Engine::new(config).compute(&input.events, &input.time_window);

  let mut out = io::stdout().lock();
  serde_json::to_writer(&mut out, &metrics)?;
  writeln!(out)?;
  Ok(())
}
