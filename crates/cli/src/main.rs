//! # dagrunner - DAG task scheduler CLI
//!
//! Loads a DAG document, schedules it on a worker pool, and drives it to completion.

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

use std::path::Path;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use dagrunner_core::Error as CoreError;
use dagrunner_engine::{DagProcessor, TaskScheduler, VertexStatus};
use dagrunner_loader::DagSpecLoader;
use dagrunner_registry::DynamicLibraryRegistry;
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    init_tracing_from_cli(&cli);

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => {
            error!("one or more vertices did not complete successfully");
            std::process::exit(1);
        }
        Err(error) => {
            error!(%error, "failed to process DAG document");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    let document = read_document(&cli.document)?;

    let registry = DynamicLibraryRegistry::new();
    let loader = DagSpecLoader::new(&registry);
    let mut dag = loader
        .load(&document)
        .with_context(|| format!("loading DAG document '{}'", cli.document.display()))?;
    info!(title = dag.title(), vertices = dag.vertex_count(), "loaded DAG");

    let pool_size = cli
        .workers
        .unwrap_or_else(|| thread::available_parallelism().map_or(1, |count| count.get()));
    let scheduler = TaskScheduler::new(pool_size);

    let outcome = thread::scope(|scope| {
        scope.spawn(|| scheduler.startup());
        let processor = DagProcessor::new(&scheduler);
        let outcome = processor.process(&mut dag);
        scheduler.shutdown();
        outcome
    })
    .context("running the DAG processor")?;

    if !outcome {
        return Ok(false);
    }

    let every_vertex_passed = (0..dag.vertex_count()).all(|index| {
        dag.vertex(index)
            .is_some_and(|vertex| vertex.status() == VertexStatus::Passed)
    });
    Ok(every_vertex_passed)
}

fn read_document(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| CoreError::file_read_failed(path, source))
        .with_context(|| format!("reading document '{}'", path.display()))?;

    let looks_like_json = path.extension().is_some_and(|extension| extension == "json");
    if looks_like_json {
        return serde_json::from_str::<Value>(&text)
            .map_err(CoreError::json_parse_failed)
            .with_context(|| format!("parsing '{}' as JSON", path.display()));
    }

    serde_yaml::from_str::<Value>(&text)
        .map_err(CoreError::yaml_parse_failed)
        .or_else(|_| serde_json::from_str::<Value>(&text).map_err(CoreError::json_parse_failed))
        .with_context(|| format!("parsing '{}' as YAML or JSON", path.display()))
}

fn init_tracing_from_cli(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
