use std::fmt;

use burn::prelude::*;
use tracing::debug;

use crate::dataset::HandSegBatch;
use crate::error::Result;
use crate::metric::{ConfusionMatrix, LabelBatch, MeanIoU, batch_mean_iou, labels_to_host};
use crate::model::SegmentationModel;

use super::predict_labels;

/// Scores of one evaluation pass, in both IoU modes.
#[derive(Debug, Clone)]
pub struct EvalReport {
    /// Unweighted mean over batches of the per-sample mean IoU.
    pub per_sample_miou: f64,
    /// IoU per class from the pass-wide confusion matrix.
    pub class_iou: Vec<Option<f64>>,
    pub global_miou: Option<f64>,
    pub pixel_accuracy: Option<f64>,
    pub batches: usize,
    pub samples: usize,
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "per-sample mIoU: {:.4} ({} batches, {} samples)",
            self.per_sample_miou, self.batches, self.samples
        )?;

        match self.global_miou {
            Some(miou) => writeln!(f, "global mIoU: {miou:.4}")?,
            None => writeln!(f, "global mIoU: n/a")?,
        }

        for (class, iou) in self.class_iou.iter().enumerate() {
            match iou {
                Some(iou) => writeln!(f, "  class {class}: {iou:.4}")?,
                None => writeln!(f, "  class {class}: n/a")?,
            }
        }

        match self.pixel_accuracy {
            Some(accuracy) => write!(f, "pixel accuracy: {accuracy:.4}"),
            None => write!(f, "pixel accuracy: n/a"),
        }
    }
}

/// Runs `model` over every batch and scores its predictions.
pub fn evaluate<B, M, I>(model: &M, batches: I) -> Result<EvalReport>
where
    B: Backend,
    M: SegmentationModel<B>,
    I: IntoIterator<Item = HandSegBatch<B>>,
{
    let num_classes = model.num_classes();
    let mut miou = MeanIoU::new();
    let mut confusion = ConfusionMatrix::new(num_classes)?;
    let mut samples = 0;

    for batch in batches {
        let (predicted, dims) = labels_to_host(predict_labels(model, batch.depth));
        let (truth, truth_dims) = labels_to_host(batch.masks.squeeze::<3>(1));

        let predicted = LabelBatch::new(&predicted, dims)?;
        let truth = LabelBatch::new(&truth, truth_dims)?;

        let value = batch_mean_iou(&predicted, &truth, num_classes)?;
        miou.update(value);
        confusion.update(truth.labels(), predicted.labels())?;
        samples += predicted.batch_size();

        debug!(batch = miou.batches(), miou = value, "Evaluated batch");
    }

    Ok(EvalReport {
        per_sample_miou: miou.value(),
        class_iou: confusion.per_class_iou(),
        global_miou: confusion.mean_iou(),
        pixel_accuracy: confusion.pixel_accuracy(),
        batches: miou.batches(),
        samples,
    })
}
