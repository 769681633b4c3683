//! アプリケーション設定管理モジュール
//!
//! 画像サイズ・カテゴリ数・エポック数などをJSON形式で保存・読み込みします。
//! 設定ファイルを指定しない場合はすべてデフォルト値で動作します。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, TrafficError};
use crate::ml::TrafficNetConfig;

/// 計算デバイスの種類
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DeviceType {
    /// NdArray (CPU) バックエンド
    #[default]
    Cpu,
    /// WGPU (GPU) バックエンド
    Wgpu,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Cpu => write!(f, "CPU (NdArray)"),
            DeviceType::Wgpu => write!(f, "WGPU (GPU)"),
        }
    }
}

/// デコードできないファイルの扱い
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// 警告を出してスキップ
    #[default]
    Skip,
    /// エラーとして中断
    Abort,
}

/// モデル設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// 分類カテゴリ数
    pub num_categories: usize,
    /// 入力画像の幅
    pub image_width: usize,
    /// 入力画像の高さ
    pub image_height: usize,
    /// ドロップアウト率
    pub dropout: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            num_categories: 43,
            image_width: 30,
            image_height: 30,
            dropout: 0.5,
        }
    }
}

/// トレーニング設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    /// エポック数
    pub epochs: usize,
    /// バッチサイズ
    pub batch_size: usize,
    /// 学習率
    pub learning_rate: f64,
    /// テストデータの割合
    pub test_fraction: f64,
    /// ランダムシード（未指定なら毎回異なる分割）
    pub seed: Option<u64>,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            learning_rate: 1e-3,
            test_fraction: 0.4,
            seed: None,
        }
    }
}

/// データ読み込み設定
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderSettings {
    pub num_categories: usize,
    pub image_width: u32,
    pub image_height: u32,
    pub decode_policy: DecodePolicy,
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 計算デバイスの種類
    pub device_type: DeviceType,
    /// モデル設定
    pub model: ModelSettings,
    /// トレーニング設定
    pub training: TrainingSettings,
    /// デコード失敗時の扱い
    pub decode_policy: DecodePolicy,
}

impl AppConfig {
    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| TrafficError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 値の範囲チェック
    pub fn validate(&self) -> Result<()> {
        let model = &self.model;
        let training = &self.training;

        if model.num_categories == 0 {
            return Err(TrafficError::Config("num_categories must be at least 1".to_string()));
        }
        if model.image_width == 0 || model.image_height == 0 {
            return Err(TrafficError::Config(format!(
                "image size must be non-zero (got {}x{})",
                model.image_width, model.image_height
            )));
        }
        // 畳み込み3ブロックを通過できるサイズか
        self.model_config().flattened_features()?;
        if !(0.0..1.0).contains(&model.dropout) {
            return Err(TrafficError::Config(format!(
                "dropout must be in [0, 1) (got {})",
                model.dropout
            )));
        }
        if training.epochs == 0 {
            return Err(TrafficError::Config("epochs must be at least 1".to_string()));
        }
        if training.batch_size == 0 {
            return Err(TrafficError::Config("batch_size must be at least 1".to_string()));
        }
        if !(training.learning_rate > 0.0) {
            return Err(TrafficError::Config(format!(
                "learning_rate must be positive (got {})",
                training.learning_rate
            )));
        }
        if !(training.test_fraction > 0.0 && training.test_fraction < 1.0) {
            return Err(TrafficError::Config(format!(
                "test_fraction must be in (0, 1) (got {})",
                training.test_fraction
            )));
        }
        Ok(())
    }

    /// ローダー用の設定を取り出す
    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            num_categories: self.model.num_categories,
            image_width: self.model.image_width as u32,
            image_height: self.model.image_height as u32,
            decode_policy: self.decode_policy,
        }
    }

    /// CNNの設定を作成
    pub fn model_config(&self) -> TrafficNetConfig {
        TrafficNetConfig::new(self.model.num_categories)
            .with_dropout(self.model.dropout)
            .with_image_width(self.model.image_width)
            .with_image_height(self.model.image_height)
    }

    /// 計算デバイスを設定
    pub fn set_device_type(&mut self, device_type: DeviceType) {
        self.device_type = device_type;
    }
}
