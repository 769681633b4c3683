pub mod ml_model;
pub mod training;
pub mod inference;

pub use ml_model::{feature_map_side, TrafficNet, TrafficNetConfig, MIN_IMAGE_SIZE};
pub use training::{evaluate, train, EpochSummary, Evaluation, TrainOutcome};
pub use inference::{Classifier, Prediction};
