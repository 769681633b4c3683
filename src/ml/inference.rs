//! モデル推論機能

use std::path::Path;

use burn::{
    module::Module,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::{backend::Backend, Tensor},
};

use crate::data::decode_and_resize;
use crate::error::{Result, TrafficError};
use crate::ml::TrafficNet;
use crate::model::{load_model_with_metadata, ModelMetadata};

/// 1枚の画像に対する予測
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub category: usize,
    pub confidence: f32,
}

/// 保存済みモデルから画像を分類する
pub struct Classifier<B: Backend> {
    model: TrafficNet<B>,
    metadata: ModelMetadata,
    device: B::Device,
}

impl<B: Backend> Classifier<B> {
    /// 学習済みモデルから作成
    pub fn new(model: TrafficNet<B>, metadata: ModelMetadata, device: B::Device) -> Self {
        Self {
            model,
            metadata,
            device,
        }
    }

    /// モデルファイルを読み込む
    pub fn load<P: AsRef<Path>>(model_path: P, device: &B::Device) -> Result<Self> {
        let (metadata, model_binary) = load_model_with_metadata(model_path.as_ref())?;

        let model = metadata.model_config().init::<B>(device)?;

        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        let record = Recorder::<B>::load(&recorder, model_binary, device)
            .map_err(|e| TrafficError::Persist(format!("failed to load weights: {:?}", e)))?;
        let model = model.load_record(record);

        Ok(Self::new(model, metadata, device.clone()))
    }

    /// 単一画像を分類
    pub fn classify_image<P: AsRef<Path>>(&self, image_path: P) -> Result<Prediction> {
        let (w, h) = (self.metadata.image_width, self.metadata.image_height);
        let image = decode_and_resize(image_path.as_ref(), w, h)?;

        let tensor = Tensor::<B, 1>::from_floats(image.data.as_slice(), &self.device)
            .reshape([1, 3, h as usize, w as usize]);

        let probs: Vec<f32> = self
            .model
            .forward_softmax(tensor)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| TrafficError::Model(format!("failed to read output: {:?}", e)))?;

        probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(category, &confidence)| Prediction {
                category,
                confidence,
            })
            .ok_or_else(|| TrafficError::Model("model produced no output".to_string()))
    }

    /// 複数画像をまとめて分類
    pub fn classify_batch(&self, image_paths: &[impl AsRef<Path>]) -> Result<Vec<Prediction>> {
        image_paths
            .iter()
            .map(|path| self.classify_image(path))
            .collect()
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}
