pub mod loader;
pub mod split;
pub mod batcher;

pub use loader::{decode_and_resize, load_data, LabeledImage, LoadedData, TrafficImage};
pub use split::{test_count, train_test_split, DatasetSplit};
pub use batcher::{ImageItem, TrafficBatch, TrafficBatcher, TrafficDataset};
