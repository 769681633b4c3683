//! データセット読み込み
//!
//! `data_dir/<カテゴリ番号>/` 以下の画像をすべて読み込み、固定サイズにリサイズします。
//!
//! ```text
//! data_dir/
//! ├── 0/
//! │   ├── 00000_00000.ppm
//! │   └── ...
//! ├── 1/
//! └── 42/
//! ```

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::ImageReader;
use tracing::{debug, info, warn};

use crate::error::{Result, TrafficError};
use crate::model::config::{DecodePolicy, LoaderSettings};

/// リサイズ済みのRGB画像
///
/// データは (C, H, W) の順で平坦化し、`[0, 1]` に正規化しています。
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl TrafficImage {
    pub const CHANNELS: usize = 3;

    /// RGB8画像から変換
    pub fn from_rgb(img: &image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let (w, h) = (width as usize, height as usize);
        let mut data = vec![0.0f32; Self::CHANNELS * h * w];

        for (x, y, pixel) in img.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for channel in 0..Self::CHANNELS {
                data[channel * h * w + y * w + x] = pixel[channel] as f32 / 255.0;
            }
        }

        Self {
            width,
            height,
            data,
        }
    }

    /// (幅, 高さ, チャネル数)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.width as usize, self.height as usize, Self::CHANNELS)
    }
}

/// ラベル付き画像
#[derive(Debug, Clone)]
pub struct LabeledImage {
    pub image: TrafficImage,
    pub label: usize,
    pub path: PathBuf,
}

/// 読み込み結果
#[derive(Debug, Default)]
pub struct LoadedData {
    pub samples: Vec<LabeledImage>,
    /// デコードできずスキップしたファイル数
    pub skipped: usize,
}

impl LoadedData {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 画像とラベルの並列リストに分解
    pub fn into_images_and_labels(self) -> (Vec<TrafficImage>, Vec<usize>) {
        self.samples
            .into_iter()
            .map(|sample| (sample.image, sample.label))
            .unzip()
    }
}

/// 画像ファイルを読み込んで指定サイズにリサイズ
pub fn decode_and_resize(path: &Path, width: u32, height: u32) -> Result<TrafficImage> {
    let unreadable = |source| TrafficError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    };

    // 拡張子ではなく中身でフォーマットを判定する
    let reader = ImageReader::open(path)
        .map_err(unreadable)?
        .with_guessed_format()
        .map_err(unreadable)?;

    // 途中で切れたファイルはデコーダがIoError(UnexpectedEof)として返すので、
    // decode() の失敗はすべて Decode として扱う
    let img = reader.decode().map_err(|e| TrafficError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let resized = img
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgb8();

    Ok(TrafficImage::from_rgb(&resized))
}

/// データディレクトリから全カテゴリの画像を読み込む
///
/// カテゴリは `0..num_categories` の順、各カテゴリ内はファイル名順に並びます。
pub fn load_data(data_dir: &Path, settings: &LoaderSettings) -> Result<LoadedData> {
    if !data_dir.is_dir() {
        return Err(TrafficError::MissingDirectory(data_dir.to_path_buf()));
    }

    validate_category_dirs(data_dir, settings.num_categories)?;

    let mut loaded = LoadedData::default();

    for category in 0..settings.num_categories {
        let category_dir = data_dir.join(category.to_string());
        if !category_dir.is_dir() {
            return Err(TrafficError::MissingDirectory(category_dir));
        }

        info!("Loading category directory {}", category_dir.display());

        let files = list_files(&category_dir)?;
        let before = loaded.samples.len();

        for path in files {
            match decode_and_resize(&path, settings.image_width, settings.image_height) {
                Ok(image) => loaded.samples.push(LabeledImage {
                    image,
                    label: category,
                    path,
                }),
                Err(err @ TrafficError::Decode { .. })
                    if settings.decode_policy == DecodePolicy::Skip =>
                {
                    warn!("Skipping file: {}", err);
                    loaded.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        debug!(
            "Category {}: {} images",
            category,
            loaded.samples.len() - before
        );
    }

    if loaded.is_empty() {
        return Err(TrafficError::EmptyDataset(data_dir.to_path_buf()));
    }

    info!(
        "Loaded {} images from {} categories ({} skipped)",
        loaded.len(),
        settings.num_categories,
        loaded.skipped
    );

    Ok(loaded)
}

/// ルート直下のディレクトリ名がすべて範囲内の整数であることを確認
fn validate_category_dirs(data_dir: &Path, num_categories: usize) -> Result<()> {
    for entry in read_dir_sorted(data_dir)? {
        if !entry.is_dir() {
            continue;
        }

        let name = entry
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name.starts_with('.') {
            continue;
        }

        let category: usize = name.parse().map_err(|_| TrafficError::InvalidCategory {
            name: name.clone(),
            reason: "not a non-negative integer".to_string(),
        })?;

        // "07" のような表記は "7" のディレクトリとして扱えない
        if category.to_string() != name {
            return Err(TrafficError::InvalidCategory {
                name,
                reason: format!("expected the directory to be named '{}'", category),
            });
        }

        if category >= num_categories {
            return Err(TrafficError::InvalidCategory {
                name,
                reason: format!("category must be below {}", num_categories),
            });
        }
    }

    Ok(())
}

/// カテゴリディレクトリ内のファイル一覧（隠しファイルを除く）
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(read_dir_sorted(dir)?
        .into_iter()
        .filter(|path| path.is_file())
        .filter(|path| {
            !path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true)
        })
        .collect())
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let unreadable = |source| TrafficError::UnreadableFile {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        paths.push(entry.path());
    }
    paths.sort();

    Ok(paths)
}
