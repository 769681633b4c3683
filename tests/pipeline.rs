//! 小さな合成データセットでの学習・評価・保存・再読み込み

use std::path::{Path, PathBuf};

use burn_autodiff::Autodiff;
use burn_ndarray::{NdArray, NdArrayDevice};
use image::{Rgb, RgbImage};

use traffic_lib::data::{load_data, train_test_split};
use traffic_lib::ml::Classifier;
use traffic_lib::model::{load_metadata, AppConfig};
use traffic_lib::run;

const CATEGORIES: usize = 3;
const PER_CATEGORY: usize = 6;

fn make_dataset(root: &Path) {
    for category in 0..CATEGORIES {
        let dir = root.join(category.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..PER_CATEGORY {
            let mut color = [20u8, 20, 20];
            color[category] = 200 + i as u8 * 5;
            RgbImage::from_pixel(24 + i as u32, 28, Rgb(color))
                .save(dir.join(format!("{:05}.png", i)))
                .unwrap();
        }
    }
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.model.num_categories = CATEGORIES;
    config.model.image_width = 22;
    config.model.image_height = 22;
    config.training.epochs = 2;
    config.training.batch_size = 4;
    config.training.seed = Some(7);
    config
}

#[test]
fn train_evaluate_save_and_reload() {
    let data = tempfile::tempdir().unwrap();
    make_dataset(data.path());
    let out = tempfile::tempdir().unwrap();
    let model_path = out.path().join("model.h5");

    let device = NdArrayDevice::default();
    let output = run::<Autodiff<NdArray>>(&config(), data.path(), Some(&model_path), &device)
        .unwrap();
    let report = &output.report;

    assert_eq!(report.loaded, CATEGORIES * PER_CATEGORY);
    assert_eq!(report.skipped, 0);
    // 18 * 0.4 = 7.2 -> 8
    assert_eq!(report.test_size, 8);
    assert_eq!(report.train_size, 10);
    assert_eq!(report.history.len(), 2);
    assert_eq!(report.evaluation.samples, 8);
    assert_eq!(report.saved_to.as_deref(), Some(model_path.as_path()));

    let metadata = load_metadata(&model_path).unwrap();
    assert_eq!(metadata.num_categories, CATEGORIES);
    assert_eq!(metadata.trained_at, report.metadata.trained_at);
    assert_eq!(metadata.seed, Some(7));
    assert!((metadata.test_accuracy - report.evaluation.accuracy).abs() < 1e-9);

    let image = data.path().join("1").join("00003.png");
    let loaded = Classifier::<NdArray>::load(&model_path, &device).unwrap();
    let in_memory = Classifier::new(output.model, report.metadata.clone(), device);

    let a = loaded.classify_image(&image).unwrap();
    let b = in_memory.classify_image(&image).unwrap();

    assert!(a.category < CATEGORIES);
    assert!(a.confidence > 0.0 && a.confidence <= 1.0);
    assert_eq!(a.category, b.category);
    assert!((a.confidence - b.confidence).abs() < 1e-5);

    let images = [
        data.path().join("0").join("00000.png"),
        image.clone(),
        data.path().join("2").join("00005.png"),
    ];
    let batch = loaded.classify_batch(&images[..]).unwrap();
    assert_eq!(batch.len(), images.len());
    assert_eq!(batch[1].category, a.category);
    assert!((batch[1].confidence - a.confidence).abs() < 1e-6);
    assert!(batch.iter().all(|p| p.category < CATEGORIES));

    let missing = [data.path().join("0").join("missing.png")];
    assert!(loaded.classify_batch(&missing[..]).is_err());
}

#[test]
fn no_output_path_saves_nothing() {
    let data = tempfile::tempdir().unwrap();
    make_dataset(data.path());

    let device = NdArrayDevice::default();
    let mut config = config();
    config.training.epochs = 1;
    let output = run::<Autodiff<NdArray>>(&config, data.path(), None, &device).unwrap();

    assert!(output.report.saved_to.is_none());
}

#[test]
fn seeded_split_is_reproducible() {
    let data = tempfile::tempdir().unwrap();
    make_dataset(data.path());
    let settings = config().loader_settings();

    let partition = |seed| -> (Vec<PathBuf>, Vec<PathBuf>) {
        let loaded = load_data(data.path(), &settings).unwrap();
        let split = train_test_split(loaded.samples, 0.4, Some(seed)).unwrap();
        (
            split.train.into_iter().map(|s| s.path).collect(),
            split.test.into_iter().map(|s| s.path).collect(),
        )
    };

    assert_eq!(partition(11), partition(11));
}
