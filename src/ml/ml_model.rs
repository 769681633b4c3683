//! 機械学習モデルの共通定義
//!
//! 交通標識分類用のCNNモデルと関連する設定を提供します。

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
    },
    tensor::{activation::softmax, backend::Backend, Int, Tensor},
    train::ClassificationOutput,
};
use tracing::debug;

// derive(Config) の展開が std の Result を使うので、エイリアスはimportしない
use crate::error::TrafficError;

/// 各ブロックのフィルタ数
pub const CONV_FILTERS: [usize; 3] = [32, 64, 128];

/// 全結合隠れ層のユニット数
pub const HIDDEN_UNITS: usize = 512;

/// 3ブロックを通過できる最小の入力サイズ
pub const MIN_IMAGE_SIZE: usize = 22;

/// Conv(3x3, padding無し) + MaxPool(2x2, stride 2) を3回通した後の1辺の長さ
///
/// 30 -> 28 -> 14 -> 12 -> 6 -> 4 -> 2
pub fn feature_map_side(input: usize) -> usize {
    (0..CONV_FILTERS.len()).fold(input, |side, _| side.saturating_sub(2) / 2)
}

/// モデル設定
#[derive(Config, Debug)]
pub struct TrafficNetConfig {
    /// 分類カテゴリ数
    pub num_classes: usize,
    /// ドロップアウト率
    #[config(default = 0.5)]
    pub dropout: f64,
    /// 入力画像の幅
    #[config(default = 30)]
    pub image_width: usize,
    /// 入力画像の高さ
    #[config(default = 30)]
    pub image_height: usize,
}

impl TrafficNetConfig {
    /// Flatten後の特徴次元
    pub fn flattened_features(&self) -> crate::error::Result<usize> {
        let w = feature_map_side(self.image_width);
        let h = feature_map_side(self.image_height);

        if w == 0 || h == 0 {
            return Err(TrafficError::Config(format!(
                "input size {}x{} is too small (minimum {}x{})",
                self.image_width, self.image_height, MIN_IMAGE_SIZE, MIN_IMAGE_SIZE
            )));
        }

        Ok(CONV_FILTERS[2] * w * h)
    }

    /// モデルを初期化
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> crate::error::Result<TrafficNet<B>> {
        if self.num_classes == 0 {
            return Err(TrafficError::Config("num_classes must be at least 1".to_string()));
        }
        let d = self.flattened_features()?;

        debug!(
            "[Model] input {}x{}, flatten {}, fc1 {} -> {}, fc2 {} -> {}",
            self.image_width, self.image_height, d, d, HIDDEN_UNITS, HIDDEN_UNITS, self.num_classes
        );

        let [f1, f2, f3] = CONV_FILTERS;
        let pool = || MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Ok(TrafficNet {
            conv1: Conv2dConfig::new([3, f1], [3, 3]).init(device),
            pool1: pool(),
            conv2: Conv2dConfig::new([f1, f2], [3, 3]).init(device),
            pool2: pool(),
            conv3: Conv2dConfig::new([f2, f3], [3, 3]).init(device),
            pool3: pool(),
            fc1: LinearConfig::new(d, HIDDEN_UNITS).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            fc2: LinearConfig::new(HIDDEN_UNITS, self.num_classes).init(device),
            activation: Relu::new(),
        })
    }
}

/// 交通標識分類用CNNモデル
///
/// # アーキテクチャ
/// - {Conv 3x3 (no padding) + ReLU + MaxPool 2x2} x 3層 (32, 64, 128 filters)
/// - Flatten
/// - FC: d -> 512 + ReLU
/// - Dropout 0.5
/// - FC: 512 -> num_classes
/// - Softmax (分類時)
#[derive(Module, Debug)]
pub struct TrafficNet<B: Backend> {
    conv1: Conv2d<B>,
    pool1: MaxPool2d,
    conv2: Conv2d<B>,
    pool2: MaxPool2d,
    conv3: Conv2d<B>,
    pool3: MaxPool2d,

    fc1: Linear<B>,
    dropout: Dropout,
    fc2: Linear<B>,

    activation: Relu,
}

impl<B: Backend> TrafficNet<B> {
    /// 順伝播
    ///
    /// - `images`: [batch_size, 3, height, width]
    /// - 戻り値: クラスごとのロジット [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.pool1.forward(self.activation.forward(self.conv1.forward(images)));
        let x = self.pool2.forward(self.activation.forward(self.conv2.forward(x)));
        let x = self.pool3.forward(self.activation.forward(self.conv3.forward(x)));

        let [_, c, h, w] = x.dims();
        let x = x.reshape([batch_size, c * h * w]);

        let x = self.activation.forward(self.fc1.forward(x));
        // 学習時（Autodiffバックエンド）のみ有効
        let x = self.dropout.forward(x);

        self.fc2.forward(x)
    }

    /// 確率分布を返す（各行の和が1）
    pub fn forward_softmax(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }

    /// 予測を実行
    ///
    /// 戻り値は (予測クラスID [batch_size, 1], 確率 [batch_size, num_classes])
    pub fn predict(&self, images: Tensor<B, 4>) -> (Tensor<B, 2, Int>, Tensor<B, 2>) {
        let probs = self.forward_softmax(images);
        let predictions = probs.clone().argmax(1);
        (predictions, probs)
    }

    /// 順伝播と損失計算
    ///
    /// ロジットに対するクロスエントロピー（softmax + categorical cross-entropy と等価）
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }
}
