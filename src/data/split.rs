//! 学習用/テスト用へのランダム分割

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Result, TrafficError};

/// 分割結果
#[derive(Debug, Clone)]
pub struct DatasetSplit<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
}

/// テストデータの件数（scikit-learnと同じく `ceil(total * test_fraction)`）
///
/// 浮動小数点の積をそのまま切り上げるため、`100 * 0.07 = 7.000000000000001` は 8 になります。
pub fn test_count(total: usize, test_fraction: f64) -> usize {
    let raw = total as f64 * test_fraction;
    (raw.ceil().max(0.0) as usize).min(total)
}

/// データをシャッフルして学習用とテスト用に分割
///
/// `seed` が `None` の場合はエントロピーから初期化するため、実行ごとに分割が変わります。
pub fn train_test_split<T>(
    mut items: Vec<T>,
    test_fraction: f64,
    seed: Option<u64>,
) -> Result<DatasetSplit<T>> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrafficError::Config(format!(
            "test_fraction must be in (0, 1) (got {})",
            test_fraction
        )));
    }

    let total = items.len();
    let n_test = test_count(total, test_fraction);
    let n_train = total - n_test;

    if n_test == 0 || n_train == 0 {
        return Err(TrafficError::InvalidSplit(format!(
            "{} samples with test_fraction {} leaves {} for training and {} for testing",
            total, test_fraction, n_train, n_test
        )));
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    items.shuffle(&mut rng);

    let train = items.split_off(n_test);
    let test = items;

    Ok(DatasetSplit { train, test })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sizes_follow_fraction() {
        let split = train_test_split((0..100).collect::<Vec<_>>(), 0.4, Some(1)).unwrap();
        assert_eq!(split.test.len(), 40);
        assert_eq!(split.train.len(), 60);

        let split = train_test_split((0..7).collect::<Vec<_>>(), 0.4, Some(1)).unwrap();
        // 7 * 0.4 = 2.8 -> 3
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 4);
    }

    #[test]
    fn test_count_is_within_one_of_floor() {
        for total in 2..200 {
            for fraction in [0.1, 0.25, 0.4, 0.7] {
                let n = test_count(total, fraction);
                let floor = (total as f64 * fraction).floor() as usize;
                assert!(n == floor || n == floor + 1, "total={} fraction={}", total, fraction);
            }
        }
        assert_eq!(test_count(10, 0.7), 7);
    }

    #[test]
    fn test_count_rounds_float_product_up() {
        // scikit-learn: ceil(100 * 0.07) == ceil(7.000000000000001) == 8
        assert_eq!(test_count(100, 0.07), 8);
        assert_eq!(test_count(100, 0.55), 56);
        assert_eq!(test_count(100, 0.4), 40);
    }

    #[test]
    fn test_splits_are_disjoint_and_complete() {
        let split = train_test_split((0..53).collect::<Vec<u32>>(), 0.4, None).unwrap();

        let train: HashSet<_> = split.train.iter().copied().collect();
        let test: HashSet<_> = split.test.iter().copied().collect();

        assert!(train.is_disjoint(&test));
        let union: HashSet<_> = train.union(&test).copied().collect();
        assert_eq!(union, (0..53).collect::<HashSet<_>>());
    }

    #[test]
    fn test_same_seed_same_partition() {
        let a = train_test_split((0..50).collect::<Vec<_>>(), 0.4, Some(42)).unwrap();
        let b = train_test_split((0..50).collect::<Vec<_>>(), 0.4, Some(42)).unwrap();
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);

        let c = train_test_split((0..50).collect::<Vec<_>>(), 0.4, Some(43)).unwrap();
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_rejects_invalid_fraction() {
        assert!(matches!(
            train_test_split(vec![1, 2, 3], 0.0, None),
            Err(TrafficError::Config(_))
        ));
        assert!(matches!(
            train_test_split(vec![1, 2, 3], 1.0, None),
            Err(TrafficError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_too_few_samples() {
        assert!(matches!(
            train_test_split(vec![1], 0.4, Some(0)),
            Err(TrafficError::InvalidSplit(_))
        ));
    }
}
