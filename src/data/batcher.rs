//! Burn向けのDatasetとBatcher

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    tensor::{backend::Backend, Int, Tensor},
};

use crate::data::loader::LabeledImage;

/// データセットアイテム（正規化済みピクセルとラベル）
#[derive(Clone, Debug)]
pub struct ImageItem {
    pub pixels: Vec<f32>,
    pub label: usize,
}

/// メモリ上の画像をそのまま保持するデータセット
pub struct TrafficDataset {
    items: Vec<ImageItem>,
}

impl TrafficDataset {
    pub fn from_samples(samples: &[LabeledImage]) -> Self {
        let items = samples
            .iter()
            .map(|sample| ImageItem {
                pixels: sample.image.data.clone(),
                label: sample.label,
            })
            .collect();
        Self { items }
    }
}

impl Dataset<ImageItem> for TrafficDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// バッチャー
#[derive(Clone)]
pub struct TrafficBatcher<B: Backend> {
    device: B::Device,
    width: usize,
    height: usize,
}

impl<B: Backend> TrafficBatcher<B> {
    pub fn new(device: B::Device, width: usize, height: usize) -> Self {
        Self {
            device,
            width,
            height,
        }
    }
}

impl<B: Backend> Batcher<B, ImageItem, TrafficBatch<B>> for TrafficBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>, _device: &B::Device) -> TrafficBatch<B> {
        let batch_size = items.len();
        let mut all_pixels = Vec::with_capacity(batch_size * 3 * self.width * self.height);
        let mut targets_vec = Vec::with_capacity(batch_size);

        for item in items {
            all_pixels.extend_from_slice(&item.pixels);
            targets_vec.push(item.label as i64);
        }

        // 1回の転送でバッチ全体をデバイスへ
        let images = Tensor::<B, 1>::from_floats(all_pixels.as_slice(), &self.device)
            .reshape([batch_size, 3, self.height, self.width]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets_vec.as_slice(), &self.device);

        TrafficBatch { images, targets }
    }
}

/// バッチデータ
#[derive(Clone, Debug)]
pub struct TrafficBatch<B: Backend> {
    /// [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}
