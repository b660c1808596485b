// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, opens the workspace, hands off to
// a Layer 2 use case and prints its result as JSON on stdout.
// Logs go to stderr through tracing, so stdout stays machine
// readable.
//
// `train` is the only long-running command: it spins up a tokio
// runtime, prints every progress event as one JSON line, cancels
// the run on Ctrl-C and fails when the run ends with an error
// event.

pub mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use commands::{Commands, ProcessArgs, TrainArgs};
use crate::application::{
    compare_use_case::CompareUseCase,
    prepare_use_case::PrepareUseCase,
    process_use_case::ProcessUseCase,
    train_use_case::TrainUseCase,
};
use crate::domain::network_config::NetworkConfig;
use crate::domain::options::ProcessingOptions;
use crate::infra::artifacts::Workspace;

#[derive(Parser, Debug)]
#[command(
    name = "tabular-trainer",
    version = "0.1.0",
    about = "Preprocess tabular train/val/test partitions and train a feed-forward classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding dataset.csv and every generated artifact
    #[arg(long, global = true, default_value = "workspace")]
    pub workspace: PathBuf,
}

impl Cli {
    /// Route to the use case; never computes anything itself
    pub fn run(self) -> Result<()> {
        let ws = Workspace::open(&self.workspace)
            .with_context(|| format!("Cannot open workspace '{}'", self.workspace.display()))?;
        let prepare = PrepareUseCase::new(ws.clone());

        match self.command {
            Commands::Split(args)       => print_json(&prepare.split(args.into())?),
            Commands::SelectLabel(args) => print_json(&prepare.select_label(&args.label_column)?),
            Commands::DropColumns(args) => print_json(&prepare.drop_columns(&args.columns)?),
            Commands::Summary           => print_json(&prepare.summary()?),
            Commands::ValueCounts(args) => print_json(&prepare.value_counts(&args.column)?),
            Commands::Process(args)     => {
                let options = processing_options(&args)?;
                print_json(&ProcessUseCase::new(ws, options).execute()?)
            }
            Commands::SaveModel(args) => {
                let config: NetworkConfig = read_json_file(&args.config)?;
                prepare.save_model(&config)?;
                print_json(&config)
            }
            Commands::Train(args) => run_train(ws, args),
            Commands::Compare     => print_json(&CompareUseCase::new(ws).execute()?),
        }
    }
}

fn processing_options(args: &ProcessArgs) -> Result<ProcessingOptions> {
    match &args.options {
        Some(path) => read_json_file(path),
        None => Ok(args.into()),
    }
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("'{}' is not valid JSON for this command", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ─── train ────────────────────────────────────────────────────────────────────

fn run_train(ws: Workspace, args: TrainArgs) -> Result<()> {
    // Validation, config checks and the lock all happen before the runtime starts
    let job = TrainUseCase::new(ws, args.into()).prepare()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot start the tokio runtime")?;

    runtime.block_on(async move {
        let mut handle = job.spawn();
        let mut interrupted = false;

        loop {
            tokio::select! {
                event = handle.events.recv() => {
                    let Some(event) = event else { break };
                    println!("{}", serde_json::to_string(&event)?);
                }
                signal = tokio::signal::ctrl_c(), if !interrupted => {
                    signal.context("Cannot listen for Ctrl-C")?;
                    tracing::warn!("Interrupt received, stopping after the current epoch");
                    handle.cancel.cancel();
                    interrupted = true;
                }
            }
        }

        let run = handle.task.await.context("Training task did not finish cleanly")?;
        tracing::info!("Run ended in state {:?} after {} epochs", run.state(), run.history().len());
        if let Some(report) = run.test_report() {
            tracing::info!("Test loss {:.4}, accuracy {:.4}", report.loss, report.accuracy);
        }

        match run.failure() {
            Some(error) => Err(anyhow::anyhow!("Training failed: {error}")),
            None => Ok(()),
        }
    })
}
