//! エラー型の定義
//!
//! ライブラリ側は `TrafficError` を返し、バイナリ側で `anyhow` に変換します。

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrafficError {
    /// データディレクトリまたはカテゴリディレクトリが存在しない
    #[error("directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// ディレクトリ・ファイルの読み込みに失敗
    #[error("failed to read {}: {source}", path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 画像としてデコードできない
    #[error("failed to decode image {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// カテゴリディレクトリ名が不正（整数でない・範囲外）
    #[error("invalid category directory '{name}': {reason}")]
    InvalidCategory { name: String, reason: String },

    /// 画像が1枚も読み込めなかった
    #[error("no images found under {}", .0.display())]
    EmptyDataset(PathBuf),

    /// 学習/テスト分割が成立しない
    #[error("invalid split: {0}")]
    InvalidSplit(String),

    /// 設定値の不正
    #[error("configuration error: {0}")]
    Config(String),

    /// モデル構築・推論時のエラー
    #[error("model error: {0}")]
    Model(String),

    /// モデル保存・読み込み時のエラー
    #[error("persistence error: {0}")]
    Persist(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrafficError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_path() {
        let err = TrafficError::MissingDirectory(PathBuf::from("gtsrb/7"));
        assert_eq!(err.to_string(), "directory does not exist: gtsrb/7");

        let err = TrafficError::InvalidCategory {
            name: "stop".to_string(),
            reason: "not an integer".to_string(),
        };
        assert!(err.to_string().contains("'stop'"));
    }

    #[test]
    fn test_unreadable_file_keeps_source() {
        use std::error::Error as _;

        let err = TrafficError::UnreadableFile {
            path: PathBuf::from("a.ppm"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
    }
}
