//! 保存済みモデルで画像を分類する

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use burn_ndarray::{NdArray, NdArrayDevice};
use burn_wgpu::{Wgpu, WgpuDevice};
use clap::Parser;

use traffic_lib::logging::{init_logging, LogConfig};
use traffic_lib::ml::Classifier;
use traffic_lib::model::print_metadata_info;

/// Classify traffic sign images with a model saved by `traffic`
#[derive(Parser, Debug)]
#[command(name = "classify", version, about, long_about = None)]
struct Cli {
    /// Model file written by `traffic <data_directory> <output_model_path>`
    model_path: PathBuf,

    /// Images to classify
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Run on the GPU (WGPU) instead of the CPU
    #[arg(long, default_value = "false")]
    gpu: bool,

    /// Print model metadata and enable debug logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

fn classify<B: Backend>(cli: &Cli, device: &B::Device) -> Result<()> {
    let classifier = Classifier::<B>::load(&cli.model_path, device)
        .with_context(|| format!("failed to load model {}", cli.model_path.display()))?;

    if cli.verbose {
        print_metadata_info(classifier.metadata());
    }

    let predictions = classifier
        .classify_batch(cli.images.as_slice())
        .context("failed to classify images")?;

    for (path, prediction) in cli.images.iter().zip(predictions) {
        println!(
            "{}: category {} ({:.1}%)",
            path.display(),
            prediction.category,
            prediction.confidence * 100.0
        );
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogConfig::from_flags(cli.verbose, false))?;

    if cli.gpu {
        classify::<Wgpu>(&cli, &WgpuDevice::default())
    } else {
        classify::<NdArray>(&cli, &NdArrayDevice::default())
    }
}
