//! CLI argument definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::Parser;

/// Loads a DAG document, schedules its tasks, and runs them to completion.
#[derive(Parser, Debug)]
#[command(name = "dagrunner")]
#[command(version)]
#[command(about = "Runs a declaratively described DAG of tasks on a managed worker pool")]
#[command(
    long_about = "dagrunner reads a YAML or JSON document describing a DAG of tasks, verifies it \
is acyclic, and executes it layer by layer on a worker pool, honoring each task's declared \
stages and completion callback."
)]
pub struct Cli {
    /// Path to the DAG document (YAML or JSON, detected from the file extension; falls back
    /// to attempting YAML then JSON if the extension is unrecognized).
    pub document: PathBuf,

    /// Number of worker threads. Defaults to the host's available parallelism.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Enable debug-level logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Restrict logging to warnings and above.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,
}
