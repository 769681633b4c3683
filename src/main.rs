//! 交通標識分類器の学習CLI
//!
//! ```text
//! traffic <data_directory> [output_model_path]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn_autodiff::Autodiff;
use burn_ndarray::{NdArray, NdArrayDevice};
use burn_wgpu::{Wgpu, WgpuDevice};
use clap::Parser;
use tracing::info;

use traffic_lib::logging::{init_logging, LogConfig};
use traffic_lib::model::{AppConfig, DecodePolicy, DeviceType};
use traffic_lib::{run, RunReport};

/// Train a convolutional network on a directory of traffic sign images
#[derive(Parser, Debug)]
#[command(name = "traffic", version, about, long_about = None)]
struct Cli {
    /// Directory containing one sub-directory per category, named 0, 1, 2, ...
    data_directory: PathBuf,

    /// Save the trained model to this file
    output_model_path: Option<PathBuf>,

    /// JSON configuration file (defaults are used for missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for the train/test split and shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Number of training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Train on the GPU (WGPU) instead of the CPU
    #[arg(long, default_value = "false")]
    gpu: bool,

    /// Fail on files that cannot be decoded instead of skipping them
    #[arg(long, default_value = "false")]
    strict: bool,

    /// Enable debug logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, default_value = "false")]
    quiet: bool,
}

impl Cli {
    /// 設定ファイルを読み込み、コマンドライン引数で上書きする
    fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => AppConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.training.seed = Some(seed);
        }
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if self.gpu {
            config.set_device_type(DeviceType::Wgpu);
        }
        if self.strict {
            config.decode_policy = DecodePolicy::Abort;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogConfig::from_flags(cli.verbose, cli.quiet))?;

    let config = cli.app_config()?;
    info!("Device: {}", config.device_type);

    let output = cli.output_model_path.as_deref();
    let report: RunReport = match config.device_type {
        DeviceType::Cpu => {
            let device = NdArrayDevice::default();
            run::<Autodiff<NdArray>>(&config, &cli.data_directory, output, &device)
                .map(|output| output.report)
        }
        DeviceType::Wgpu => {
            let device = WgpuDevice::default();
            run::<Autodiff<Wgpu>>(&config, &cli.data_directory, output, &device)
                .map(|output| output.report)
        }
    }
    .with_context(|| format!("training on {} failed", cli.data_directory.display()))?;

    println!(
        "Test loss: {:.4} - accuracy: {:.4}",
        report.evaluation.loss, report.evaluation.accuracy
    );

    if let Some(path) = &report.saved_to {
        println!("Model saved to {}.", path.display());
    }

    Ok(())
}
