//! 交通標識画像の分類器
//!
//! カテゴリ番号ごとのディレクトリに分けられた画像を読み込み、CNNを学習・評価します。

pub mod error;
pub mod logging;
pub mod data;
pub mod ml;
pub mod model;
pub mod pipeline;

pub use error::{Result, TrafficError};
pub use pipeline::{run, PipelineOutput, RunReport};
