// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// Business logic is delegated to Layer 2 (application); the
// HTTP surface lives in `server`.
//
// Three commands are supported:
//   1. `serve`    — load the model once and serve /predict
//   2. `classify` — run the same pipeline on a local image
//   3. `convert`  — re-save .pth weights as a burn record

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use commands::{ClassifyArgs, Commands, ConvertArgs, ServeArgs};

use crate::application::predict_use_case::PredictUseCase;
use crate::infra::weights::WeightStore;
use crate::ml::{
    inferencer::{InferDevice, InferBackend, Inferencer, InferencerOptions},
    model::build_model,
};
use crate::server::{run_server, ServerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "lesion-classifier",
    version,
    about = "Classify skin-lesion images as melanocytic or other with EfficientNet-B0."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Serve(args)    => run_serve(args),
            Commands::Classify(args) => run_classify(args),
            Commands::Convert(args)  => run_convert(args),
        }
    }
}

/// Load the model, then start the async runtime and serve until ctrl+c.
fn run_serve(args: ServeArgs) -> Result<()> {
    let config = ServerConfig::from(&args);
    let options: InferencerOptions = args.weights.into();

    // The model is ready before the listener accepts any traffic.
    let inferencer = Inferencer::load(&options)?;
    let predictor  = PredictUseCase::new(Arc::new(inferencer));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot start the tokio runtime")?;
    runtime.block_on(run_server(config, predictor))
}

fn run_classify(args: ClassifyArgs) -> Result<()> {
    let options: InferencerOptions = args.weights.into();
    let inferencer = Inferencer::load(&options)?;
    let predictor  = PredictUseCase::new(Arc::new(inferencer));

    let prediction = predictor.predict_file(&args.image)?;
    println!("\nClass:           {}", prediction.label);
    println!("Confidence:      {}", prediction.formatted_confidence());
    println!("Raw probability: {}", prediction.raw_probability);
    Ok(())
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let device = InferDevice::default();
    let model  = build_model::<InferBackend>(&device);
    let model  = WeightStore::new(&args.input).load(model, &device)?;
    let written = WeightStore::new(&args.output).save(&model)?;

    tracing::info!("Converted '{}' → '{}'", args.input.display(), written.display());
    println!("Weights written to {}", written.display());
    Ok(())
}
