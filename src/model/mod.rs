pub mod model_metadata;
pub mod model_storage;
pub mod config;

pub use model_metadata::ModelMetadata;
pub use model_storage::{
    load_metadata, load_model_binary, load_model_with_metadata, model_to_bytes,
    print_metadata_info, save_model, save_model_with_metadata,
};
pub use config::{AppConfig, DecodePolicy, DeviceType, LoaderSettings, ModelSettings, TrainingSettings};
