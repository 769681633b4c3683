//! モデルメタデータの定義
//!
//! tar.gz形式でモデルと関連するメタデータを保存・読み込みします。

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrafficError};
use crate::ml::TrafficNetConfig;
use crate::model::config::AppConfig;

/// モデルメタデータ
///
/// tar.gz形式で保存される情報：
/// - metadata.json: このメタデータ（JSON形式）
/// - model.bin: モデルの重み（バイナリ）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// 分類カテゴリ数（出力層のユニット数）
    pub num_categories: usize,

    /// モデル入力の幅（ピクセル）
    pub image_width: u32,

    /// モデル入力の高さ（ピクセル）
    pub image_height: u32,

    /// ドロップアウト率
    pub dropout: f64,

    /// 学習エポック数
    pub epochs: usize,

    /// テストデータの割合
    pub test_fraction: f64,

    /// 分割に使ったシード（未指定なら null）
    pub seed: Option<u64>,

    /// テストデータでの損失
    pub test_loss: f64,

    /// テストデータでの正解率
    pub test_accuracy: f64,

    /// モデルの学習時刻（RFC 3339形式）
    pub trained_at: String,
}

impl ModelMetadata {
    /// 設定と評価結果から作成
    pub fn new(config: &AppConfig, test_loss: f64, test_accuracy: f64) -> Self {
        let trained_at = chrono::Local::now().to_rfc3339();

        Self {
            num_categories: config.model.num_categories,
            image_width: config.model.image_width as u32,
            image_height: config.model.image_height as u32,
            dropout: config.model.dropout,
            epochs: config.training.epochs,
            test_fraction: config.training.test_fraction,
            seed: config.training.seed,
            test_loss,
            test_accuracy,
            trained_at,
        }
    }

    /// メタデータからモデル設定を復元
    pub fn model_config(&self) -> TrafficNetConfig {
        TrafficNetConfig::new(self.num_categories)
            .with_dropout(self.dropout)
            .with_image_width(self.image_width as usize)
            .with_image_height(self.image_height as usize)
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            TrafficError::Persist(format!("Failed to deserialize metadata from JSON: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_copies_config() {
        let mut config = AppConfig::default();
        config.training.seed = Some(9);

        let metadata = ModelMetadata::new(&config, 0.25, 0.93);

        assert_eq!(metadata.num_categories, 43);
        assert_eq!((metadata.image_width, metadata.image_height), (30, 30));
        assert_eq!(metadata.seed, Some(9));
        assert_eq!(metadata.test_accuracy, 0.93);
        assert!(chrono::DateTime::parse_from_rfc3339(&metadata.trained_at).is_ok());
    }

    #[test]
    fn test_model_config_matches_metadata() {
        let metadata = ModelMetadata::new(&AppConfig::default(), 0.0, 0.0);
        let config = metadata.model_config();

        assert_eq!(config.num_classes, 43);
        assert_eq!(config.image_width, 30);
        assert_eq!(config.dropout, 0.5);
    }

    #[test]
    fn test_invalid_json_is_persist_error() {
        let err = ModelMetadata::from_json_string("{ not json").unwrap_err();
        assert!(matches!(err, TrafficError::Persist(_)));
    }
}
