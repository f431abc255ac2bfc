// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parsing is done by clap;
// all work is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`  — trains the joint pose/match model
//   2. `report` — surface-normal accuracy from label grids

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ReportArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "joint-pose-match",
    version = "0.1.0",
    about = "Train a joint relative-pose / patch-matching network, or report surface-normal accuracy."
)]
pub struct Cli {
    /// The subcommand to run (train or report)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)  => run_train(args),
            Commands::Report(args) => run_report(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training from manifest: {}", args.json_path);

    let use_case = TrainUseCase::new(args.into());
    let summary = use_case.execute()?;

    match summary.best_iteration {
        Some(it) => println!(
            "Training complete. Final loss {:.4}. Best validation loss {:.4} at iteration {}.",
            summary.final_loss, summary.best_loss, it
        ),
        None => println!(
            "Training complete. Final loss {:.4}. No validation pass was run.",
            summary.final_loss
        ),
    }
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<()> {
    use crate::application::report_use_case::ReportUseCase;

    let use_case = ReportUseCase::new(args.predicted, args.truth, args.mask, args.num_classes);
    let report = use_case.execute()?;

    println!("Unbinned accuracy: {:.4}", report.unbinned);
    println!("Binned accuracy:   {:.4}", report.binned);
    Ok(())
}
