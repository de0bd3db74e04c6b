//! Per-sample intersection-over-union.
//!
//! Every sample is scored on its own: each class gets
//! `intersection / (union + IOU_EPSILON)` and the sample score is the mean
//! over *all* classes, including classes that appear in neither the
//! prediction nor the ground truth. Such a class scores ~0 and pulls the
//! sample mean down. A batch score is the mean of its sample scores, and an
//! evaluation pass averages batch scores without weighting them by size.
//!
//! Labels outside `[0, num_classes)` are ignored: they add to no class's
//! intersection or union.

use crate::error::{Error, Result};

use super::{LabelBatch, class_index};

/// Added to every union so absent classes score 0 instead of NaN.
pub const IOU_EPSILON: f64 = 1e-6;

/// IoU of every class for a single sample.
pub fn class_iou(predicted: &[i64], ground_truth: &[i64], num_classes: usize) -> Result<Vec<f64>> {
    if num_classes == 0 {
        return Err(Error::InvalidClassCount(num_classes));
    }

    if predicted.len() != ground_truth.len() {
        return Err(Error::ShapeMismatch {
            expected: vec![ground_truth.len()],
            found: vec![predicted.len()],
        });
    }

    let mut intersection = vec![0u64; num_classes];
    let mut predicted_count = vec![0u64; num_classes];
    let mut truth_count = vec![0u64; num_classes];

    for (&pred, &truth) in predicted.iter().zip(ground_truth) {
        let pred = class_index(pred, num_classes);
        let truth = class_index(truth, num_classes);

        if let Some(p) = pred {
            predicted_count[p] += 1;
        }
        if let Some(t) = truth {
            truth_count[t] += 1;
        }
        if let (Some(p), Some(t)) = (pred, truth) {
            if p == t {
                intersection[p] += 1;
            }
        }
    }

    let ious = (0..num_classes)
        .map(|c| {
            let inter = intersection[c] as f64;
            let union = (predicted_count[c] + truth_count[c] - intersection[c]) as f64;
            inter / (union + IOU_EPSILON)
        })
        .collect();

    Ok(ious)
}

/// Mean of [class_iou] over all classes.
pub fn sample_mean_iou(predicted: &[i64], ground_truth: &[i64], num_classes: usize) -> Result<f64> {
    let ious = class_iou(predicted, ground_truth, num_classes)?;
    Ok(ious.iter().sum::<f64>() / num_classes as f64)
}

/// Mean of the per-sample mean IoU over every sample of the batch.
///
/// An empty batch scores `0.0`.
pub fn batch_mean_iou(
    predicted: &LabelBatch<'_>,
    ground_truth: &LabelBatch<'_>,
    num_classes: usize,
) -> Result<f64> {
    if num_classes == 0 {
        return Err(Error::InvalidClassCount(num_classes));
    }

    if predicted.dims() != ground_truth.dims() {
        return Err(Error::ShapeMismatch {
            expected: ground_truth.dims().to_vec(),
            found: predicted.dims().to_vec(),
        });
    }

    let batch_size = predicted.batch_size();
    if batch_size == 0 {
        return Ok(0.0);
    }

    let mut total = 0.0;
    for (pred, truth) in predicted.samples().zip(ground_truth.samples()) {
        total += sample_mean_iou(pred, truth, num_classes)?;
    }

    Ok(total / batch_size as f64)
}

/// Running mean of batch scores over an evaluation pass.
///
/// Every batch counts once regardless of its size, so a short final batch
/// weighs as much as a full one.
#[derive(Debug, Default, Clone)]
pub struct MeanIoU {
    sum: f64,
    batches: usize,
}

impl MeanIoU {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, batch_value: f64) {
        self.sum += batch_value;
        self.batches += 1;
    }

    pub fn value(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.sum / self.batches as f64
        }
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.batches = 0;
    }
}
