//! Properties of the two IoU modes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use hand_seg::metric::{ConfusionMatrix, LabelBatch, MeanIoU, batch_mean_iou, class_iou};

const TOLERANCE: f64 = 1e-5;

fn miou(predicted: &[i64], truth: &[i64], dims: [usize; 3], num_classes: usize) -> f64 {
    batch_mean_iou(
        &LabelBatch::new(predicted, dims).unwrap(),
        &LabelBatch::new(truth, dims).unwrap(),
        num_classes,
    )
    .unwrap()
}

/// Three 1x2 samples with two classes: perfect, disjoint, and perfect but
/// missing class 1.
fn three_samples() -> (Vec<Vec<i64>>, Vec<Vec<i64>>) {
    let predicted = vec![vec![0, 1], vec![0, 0], vec![0, 0]];
    let truth = vec![vec![0, 1], vec![1, 1], vec![0, 0]];
    (predicted, truth)
}

fn flatten(samples: &[&Vec<i64>]) -> Vec<i64> {
    samples.iter().flat_map(|s| s.iter().copied()).collect()
}

#[test]
fn test_single_class_sample_scores_absent_classes_zero() {
    let labels = [0, 0, 0, 0];
    let ious = class_iou(&labels, &labels, 3).unwrap();

    assert!((ious[0] - 1.0).abs() < TOLERANCE);
    assert!(ious[1].abs() < TOLERANCE);
    assert!(ious[2].abs() < TOLERANCE);
    assert!((miou(&labels, &labels, [1, 2, 2], 3) - 1.0 / 3.0).abs() < TOLERANCE);
}

#[test]
fn test_partial_overlap_scores_one_third() {
    let predicted = [0, 1, 1, 0];
    let truth = [1, 0, 1, 0];

    assert!((miou(&predicted, &truth, [1, 2, 2], 2) - 1.0 / 3.0).abs() < TOLERANCE);
}

#[test]
fn test_result_is_finite_for_arbitrary_labels() {
    let predicted = [-3, 0, 1, 2, 99, 1];
    let truth = [0, 0, 7, 2, 1, -1];

    let value = miou(&predicted, &truth, [2, 1, 3], 3);
    assert!(value.is_finite());
    assert!((0.0..=1.0).contains(&value));
}

#[test]
fn test_sample_order_does_not_matter() {
    let (predicted, truth) = three_samples();
    let orders = [[0, 1, 2], [2, 0, 1], [1, 2, 0], [2, 1, 0]];

    let reference = miou(
        &flatten(&[&predicted[0], &predicted[1], &predicted[2]]),
        &flatten(&[&truth[0], &truth[1], &truth[2]]),
        [3, 1, 2],
        2,
    );

    for order in orders {
        let pred = flatten(&order.map(|i| &predicted[i]));
        let gt = flatten(&order.map(|i| &truth[i]));
        assert!((miou(&pred, &gt, [3, 1, 2], 2) - reference).abs() < 1e-12);
    }
}

#[test]
fn test_batch_partitioning_changes_the_pass_mean() {
    let (predicted, truth) = three_samples();

    // one batch of three samples: (1 + 0 + 0.5) / 3
    let whole = miou(
        &flatten(&[&predicted[0], &predicted[1], &predicted[2]]),
        &flatten(&[&truth[0], &truth[1], &truth[2]]),
        [3, 1, 2],
        2,
    );
    assert!((whole - 0.5).abs() < TOLERANCE);

    // batches {0} and {1, 2}: (1 + 0.25) / 2
    let mut split = MeanIoU::new();
    split.update(miou(&predicted[0], &truth[0], [1, 1, 2], 2));
    split.update(miou(
        &flatten(&[&predicted[1], &predicted[2]]),
        &flatten(&[&truth[1], &truth[2]]),
        [2, 1, 2],
        2,
    ));

    assert!((split.value() - 0.625).abs() < TOLERANCE);
    assert!((split.value() - whole).abs() > 0.1);
}

#[test]
fn test_global_mode_weights_by_pixels() {
    // a large perfectly predicted sample and a small completely wrong one
    let big_truth = vec![0i64; 16];
    let small_truth = vec![1i64; 2];
    let small_pred = vec![0i64; 2];

    let mut per_sample = MeanIoU::new();
    per_sample.update(miou(&big_truth, &big_truth, [1, 4, 4], 2));
    per_sample.update(miou(&small_pred, &small_truth, [1, 1, 2], 2));

    let mut hist = ConfusionMatrix::new(2).unwrap();
    hist.update(&big_truth, &big_truth).unwrap();
    hist.update(&small_truth, &small_pred).unwrap();

    // per sample: (0.5 + 0) / 2; global: (16/18 + 0) / 2
    assert!((per_sample.value() - 0.25).abs() < TOLERANCE);
    assert!((hist.mean_iou().unwrap() - 16.0 / 36.0).abs() < 1e-12);
}
