//! Dataset-wide IoU from an accumulated confusion matrix.
//!
//! Unlike [batch_mean_iou](super::batch_mean_iou), every pixel of every
//! sample weighs the same here, so the two modes disagree whenever samples
//! differ in size or class distribution.

use crate::error::{Error, Result};

use super::class_index;

/// `num_classes x num_classes` pixel counts, rows indexed by ground truth
/// and columns by prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    num_classes: usize,
    counts: Vec<u64>,
}

impl ConfusionMatrix {
    pub fn new(num_classes: usize) -> Result<Self> {
        if num_classes == 0 {
            return Err(Error::InvalidClassCount(num_classes));
        }

        Ok(Self {
            num_classes,
            counts: vec![0; num_classes * num_classes],
        })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Adds one count per `(ground truth, prediction)` pixel pair.
    ///
    /// Pairs with either label outside `[0, num_classes)` are skipped.
    pub fn update(&mut self, ground_truth: &[i64], predicted: &[i64]) -> Result<()> {
        if ground_truth.len() != predicted.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![ground_truth.len()],
                found: vec![predicted.len()],
            });
        }

        for (&truth, &pred) in ground_truth.iter().zip(predicted) {
            let truth = class_index(truth, self.num_classes);
            let pred = class_index(pred, self.num_classes);

            if let (Some(t), Some(p)) = (truth, pred) {
                self.counts[t * self.num_classes + p] += 1;
            }
        }

        Ok(())
    }

    pub fn merge(&mut self, other: &ConfusionMatrix) -> Result<()> {
        if other.num_classes != self.num_classes {
            return Err(Error::ShapeMismatch {
                expected: vec![self.num_classes, self.num_classes],
                found: vec![other.num_classes, other.num_classes],
            });
        }

        for (count, extra) in self.counts.iter_mut().zip(&other.counts) {
            *count += extra;
        }

        Ok(())
    }

    pub fn get(&self, truth: usize, pred: usize) -> u64 {
        self.counts[truth * self.num_classes + pred]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `diag / (row + col - diag)` per class, `None` for a class that never
    /// occurs in either the ground truth or the predictions.
    pub fn per_class_iou(&self) -> Vec<Option<f64>> {
        (0..self.num_classes)
            .map(|c| {
                let diag = self.get(c, c);
                let row: u64 = (0..self.num_classes).map(|p| self.get(c, p)).sum();
                let col: u64 = (0..self.num_classes).map(|t| self.get(t, c)).sum();
                let union = row + col - diag;

                (union > 0).then(|| diag as f64 / union as f64)
            })
            .collect()
    }

    /// Mean over the classes that occurred at least once.
    pub fn mean_iou(&self) -> Option<f64> {
        let seen: Vec<f64> = self.per_class_iou().into_iter().flatten().collect();
        if seen.is_empty() {
            None
        } else {
            Some(seen.iter().sum::<f64>() / seen.len() as f64)
        }
    }

    pub fn pixel_accuracy(&self) -> Option<f64> {
        let total = self.total();
        let correct: u64 = (0..self.num_classes).map(|c| self.get(c, c)).sum();

        (total > 0).then(|| correct as f64 / total as f64)
    }
}
