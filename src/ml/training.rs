//! モデル学習と評価
//!
//! 学習データに対して固定エポック数だけAdamで最適化し、
//! 学習後にテストデータで損失と正解率を計算します。

use burn::{
    data::dataloader::DataLoaderBuilder,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Int, Tensor,
    },
};
use tracing::{debug, info};

use crate::data::{LabeledImage, TrafficBatcher, TrafficDataset};
use crate::error::{Result, TrafficError};
use crate::ml::TrafficNet;
use crate::model::config::TrainingSettings;

/// Adamのepsilon（Kerasのデフォルト値）
pub const ADAM_EPSILON: f32 = 1e-7;

/// 1エポック分の学習結果
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    /// 1始まり
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
}

/// 学習結果
pub struct TrainOutcome<B: AutodiffBackend> {
    pub model: TrafficNet<B>,
    pub history: Vec<EpochSummary>,
}

/// テストデータでの評価結果
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub loss: f64,
    pub accuracy: f64,
    pub samples: usize,
}

/// サンプルの画像サイズ (幅, 高さ) を取得し、すべて同じであることを確認
fn image_dims(samples: &[LabeledImage]) -> Result<(usize, usize)> {
    let first = samples
        .first()
        .ok_or_else(|| TrafficError::Model("no samples to process".to_string()))?;
    let dims = (first.image.width, first.image.height);

    if let Some(odd) = samples
        .iter()
        .find(|s| (s.image.width, s.image.height) != dims)
    {
        return Err(TrafficError::Model(format!(
            "image {} is {}x{}, expected {}x{}",
            odd.path.display(),
            odd.image.width,
            odd.image.height,
            dims.0,
            dims.1
        )));
    }

    Ok((dims.0 as usize, dims.1 as usize))
}

/// バッチ内の正解数
fn count_correct<B: Backend>(output: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let [batch_size, _] = output.dims();
    let predictions = output.argmax(1).reshape([batch_size]);
    let correct: i64 = predictions.equal(targets).int().sum().into_scalar().elem();
    correct as usize
}

/// モデル学習を実行
///
/// 各エポックの先頭でデータをシャッフルします。`settings.seed` があればその値を使います。
pub fn train<B: AutodiffBackend>(
    mut model: TrafficNet<B>,
    samples: &[LabeledImage],
    settings: &TrainingSettings,
    device: &B::Device,
) -> Result<TrainOutcome<B>> {
    let (width, height) = image_dims(samples)?;

    let shuffle_seed = settings.seed.unwrap_or_else(rand::random);
    let batcher = TrafficBatcher::<B>::new(device.clone(), width, height);
    let dataloader = DataLoaderBuilder::new(batcher)
        .batch_size(settings.batch_size)
        .shuffle(shuffle_seed)
        .num_workers(0)
        .build(TrafficDataset::from_samples(samples));

    let mut optim = AdamConfig::new()
        .with_epsilon(ADAM_EPSILON)
        .init::<B, TrafficNet<B>>();

    info!(
        "Training on {} images: {} epochs, batch size {}, learning rate {}",
        samples.len(),
        settings.epochs,
        settings.batch_size,
        settings.learning_rate
    );

    let mut history = Vec::with_capacity(settings.epochs);

    for epoch in 1..=settings.epochs {
        let mut total_loss = 0.0;
        let mut correct = 0usize;
        let mut total = 0usize;

        for (batch_idx, batch) in dataloader.iter().enumerate() {
            let batch_size = batch.targets.dims()[0];
            let item = model.forward_classification(batch.images, batch.targets);

            let loss_value: f64 = item.loss.clone().into_scalar().elem();
            correct += count_correct(item.output, item.targets);
            total += batch_size;
            total_loss += loss_value * batch_size as f64;

            let grads = item.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(settings.learning_rate, model, grads);

            debug!("  batch {}: loss = {:.4}", batch_idx + 1, loss_value);
        }

        let summary = EpochSummary {
            epoch,
            loss: total_loss / total.max(1) as f64,
            accuracy: correct as f64 / total.max(1) as f64,
        };

        info!(
            "Epoch {}/{} - loss: {:.4} - accuracy: {:.4}",
            epoch, settings.epochs, summary.loss, summary.accuracy
        );
        history.push(summary);
    }

    Ok(TrainOutcome { model, history })
}

/// テストデータでモデルを評価（パラメータは更新しない）
///
/// 推論用（非Autodiff）のモデルを渡してください。ドロップアウトは無効になります。
pub fn evaluate<B: Backend>(
    model: &TrafficNet<B>,
    samples: &[LabeledImage],
    batch_size: usize,
    device: &B::Device,
) -> Result<Evaluation> {
    let (width, height) = image_dims(samples)?;

    let batcher = TrafficBatcher::<B>::new(device.clone(), width, height);
    let dataloader = DataLoaderBuilder::new(batcher)
        .batch_size(batch_size)
        .num_workers(0)
        .build(TrafficDataset::from_samples(samples));

    let mut total_loss = 0.0;
    let mut correct = 0usize;
    let mut total = 0usize;

    for batch in dataloader.iter() {
        let n = batch.targets.dims()[0];
        let item = model.forward_classification(batch.images, batch.targets);

        let loss_value: f64 = item.loss.into_scalar().elem();
        total_loss += loss_value * n as f64;
        correct += count_correct(item.output, item.targets);
        total += n;
    }

    let evaluation = Evaluation {
        loss: total_loss / total.max(1) as f64,
        accuracy: correct as f64 / total.max(1) as f64,
        samples: total,
    };

    info!(
        "Evaluation on {} images - loss: {:.4} - accuracy: {:.4}",
        evaluation.samples, evaluation.loss, evaluation.accuracy
    );

    Ok(evaluation)
}
