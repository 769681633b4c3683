//! モデルとメタデータの永続化
//!
//! Tar.gz形式でモデルとメタデータを1ファイルに統合して保存・読み込みします。
//!
//! ファイル構成（tar.gz内部）:
//! - metadata.json   - メタデータ（カテゴリ数、画像サイズ、評価結果など）
//! - model.bin       - モデルの重み（バイナリ）
//!
//! 書き込みはアトミックではないため、途中で失敗すると壊れたファイルが残ることがあります。

use std::fs::File;
use std::io::Read;
use std::path::Path;

use burn::{
    module::Module,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::backend::Backend,
};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder};
use tracing::{debug, info};

use crate::error::{Result, TrafficError};
use crate::ml::TrafficNet;
use crate::model::model_metadata::ModelMetadata;

const METADATA_ENTRY: &str = "metadata.json";
const MODEL_ENTRY: &str = "model.bin";

fn persist_err(context: &str, path: &Path, e: impl std::fmt::Display) -> TrafficError {
    TrafficError::Persist(format!("{} {}: {}", context, path.display(), e))
}

/// モデルの重みをバイト列に変換
pub fn model_to_bytes<B: Backend>(model: &TrafficNet<B>) -> Result<Vec<u8>> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    Recorder::<B>::record(&recorder, model.clone().into_record(), ())
        .map_err(|e| TrafficError::Persist(format!("failed to serialize weights: {:?}", e)))
}

/// 学習済みモデルを保存
pub fn save_model<B: Backend>(
    output_path: &Path,
    model: &TrafficNet<B>,
    metadata: &ModelMetadata,
) -> Result<()> {
    let model_binary = model_to_bytes(model)?;
    debug!("Model weights: {} bytes", model_binary.len());

    save_model_with_metadata(output_path, metadata, &model_binary)?;
    info!("Saved model to {}", output_path.display());

    Ok(())
}

/// メタデータと共にモデルをTar.gz形式で保存
///
/// 拡張子は変更せず、指定されたパスにそのまま書き込みます。
pub fn save_model_with_metadata(
    output_path: &Path,
    metadata: &ModelMetadata,
    model_binary: &[u8],
) -> Result<()> {
    // 親ディレクトリが存在しない場合は作成
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| persist_err("Failed to create parent directory", parent, e))?;
    }

    let tar_gz_file = File::create(output_path)
        .map_err(|e| persist_err("Failed to create model file", output_path, e))?;

    let encoder = GzEncoder::new(tar_gz_file, Compression::default());
    let mut tar_builder = Builder::new(encoder);

    let json_str = metadata.to_json_string()?;
    append_entry(&mut tar_builder, METADATA_ENTRY, json_str.as_bytes())
        .map_err(|e| persist_err("Failed to add metadata.json to", output_path, e))?;
    append_entry(&mut tar_builder, MODEL_ENTRY, model_binary)
        .map_err(|e| persist_err("Failed to add model.bin to", output_path, e))?;

    // tarとgzipの両方を閉じる
    tar_builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|e| persist_err("Failed to finalize", output_path, e))?;

    Ok(())
}

fn append_entry<W: std::io::Write>(
    builder: &mut Builder<W>,
    name: &str,
    data: &[u8],
) -> std::io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_path(name)?;
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, data)
}

/// Tar.gzからモデルメタデータを読み込む
pub fn load_metadata(tar_gz_path: &Path) -> Result<ModelMetadata> {
    load_model_with_metadata(tar_gz_path).map(|(metadata, _)| metadata)
}

/// Tar.gzからモデルバイナリを読み込む
pub fn load_model_binary(tar_gz_path: &Path) -> Result<Vec<u8>> {
    load_model_with_metadata(tar_gz_path).map(|(_, binary)| binary)
}

/// メタデータとモデルバイナリを共に読み込む
pub fn load_model_with_metadata(tar_gz_path: &Path) -> Result<(ModelMetadata, Vec<u8>)> {
    let tar_gz_file = File::open(tar_gz_path).map_err(|source| TrafficError::UnreadableFile {
        path: tar_gz_path.to_path_buf(),
        source,
    })?;

    let decoder = GzDecoder::new(tar_gz_file);
    let mut archive = Archive::new(decoder);

    let mut metadata_opt: Option<ModelMetadata> = None;
    let mut model_binary_opt: Option<Vec<u8>> = None;

    let read_err = |e| persist_err("Failed to read", tar_gz_path, e);

    for entry in archive.entries().map_err(read_err)? {
        let mut entry = entry.map_err(read_err)?;
        let name = entry
            .path()
            .map_err(read_err)?
            .to_string_lossy()
            .to_string();

        match name.as_str() {
            METADATA_ENTRY => {
                let mut json_str = String::new();
                entry.read_to_string(&mut json_str).map_err(read_err)?;
                metadata_opt = Some(ModelMetadata::from_json_string(&json_str)?);
            }
            MODEL_ENTRY => {
                let mut buffer = Vec::new();
                entry.read_to_end(&mut buffer).map_err(read_err)?;
                model_binary_opt = Some(buffer);
            }
            _ => {}
        }
    }

    match (metadata_opt, model_binary_opt) {
        (Some(metadata), Some(binary)) => Ok((metadata, binary)),
        (None, _) => Err(persist_err("metadata.json not found in", tar_gz_path, "missing entry")),
        (_, None) => Err(persist_err("model.bin not found in", tar_gz_path, "missing entry")),
    }
}

/// メタデータをコンソールに表示
pub fn print_metadata_info(metadata: &ModelMetadata) {
    println!("=== Model metadata ===");
    println!("Categories: {}", metadata.num_categories);
    println!("Input size: {}x{}", metadata.image_width, metadata.image_height);
    println!("Epochs: {}", metadata.epochs);
    println!(
        "Test loss: {:.4} - accuracy: {:.4}",
        metadata.test_loss, metadata.test_accuracy
    );
    println!("Trained at: {}", metadata.trained_at);
    println!("======================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::AppConfig;

    fn metadata() -> ModelMetadata {
        ModelMetadata::new(&AppConfig::default(), 0.5, 0.75)
    }

    #[test]
    fn test_writes_exactly_the_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.h5");

        save_model_with_metadata(&path, &metadata(), &[1, 2, 3, 4]).unwrap();

        assert!(path.is_file());
        let (loaded, binary) = load_model_with_metadata(&path).unwrap();
        assert_eq!(loaded, metadata_with_time(&loaded));
        assert_eq!(binary, vec![1, 2, 3, 4]);
    }

    fn metadata_with_time(loaded: &ModelMetadata) -> ModelMetadata {
        ModelMetadata {
            trained_at: loaded.trained_at.clone(),
            ..metadata()
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_metadata(&dir.path().join("missing.tar.gz")).unwrap_err();
        assert!(matches!(err, TrafficError::UnreadableFile { .. }));
    }

    #[test]
    fn test_not_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        std::fs::write(&path, b"plain bytes").unwrap();

        assert!(matches!(
            load_model_binary(&path),
            Err(TrafficError::Persist(_))
        ));
    }
}
