//! 読み込み → 分割 → モデル構築 → 学習 → 評価 → 保存 を順に実行する

use std::path::{Path, PathBuf};

use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use tracing::info;

use crate::data::{load_data, train_test_split};
use crate::error::Result;
use crate::ml::{evaluate, train, EpochSummary, Evaluation, TrafficNet};
use crate::model::{save_model, AppConfig, ModelMetadata};

/// 実行結果
#[derive(Debug, Clone)]
pub struct RunReport {
    /// 読み込んだ画像数
    pub loaded: usize,
    /// デコードできずスキップした数
    pub skipped: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub history: Vec<EpochSummary>,
    pub evaluation: Evaluation,
    pub metadata: ModelMetadata,
    pub saved_to: Option<PathBuf>,
}

/// 学習済みモデルと実行結果
pub struct PipelineOutput<B: AutodiffBackend> {
    pub model: TrafficNet<B::InnerBackend>,
    pub report: RunReport,
}

/// 学習パイプライン全体を実行
pub fn run<B: AutodiffBackend>(
    config: &AppConfig,
    data_dir: &Path,
    output_model_path: Option<&Path>,
    device: &B::Device,
) -> Result<PipelineOutput<B>> {
    config.validate()?;

    let loaded = load_data(data_dir, &config.loader_settings())?;
    let (total, skipped) = (loaded.len(), loaded.skipped);

    let split = train_test_split(
        loaded.samples,
        config.training.test_fraction,
        config.training.seed,
    )?;
    info!(
        "Split {} images into {} for training and {} for testing",
        total,
        split.train.len(),
        split.test.len()
    );

    let model = config.model_config().init::<B>(device)?;
    let outcome = train(model, &split.train, &config.training, device)?;

    let model = outcome.model.valid();
    let evaluation = evaluate(&model, &split.test, config.training.batch_size, device)?;

    let metadata = ModelMetadata::new(config, evaluation.loss, evaluation.accuracy);

    let saved_to = match output_model_path {
        Some(path) => {
            save_model(path, &model, &metadata)?;
            Some(path.to_path_buf())
        }
        None => None,
    };

    Ok(PipelineOutput {
        model,
        report: RunReport {
            loaded: total,
            skipped,
            train_size: split.train.len(),
            test_size: split.test.len(),
            history: outcome.history,
            evaluation,
            metadata,
            saved_to,
        },
    })
}
