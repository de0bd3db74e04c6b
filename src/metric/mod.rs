mod confusion;
mod iou;

pub use confusion::ConfusionMatrix;
pub use iou::{IOU_EPSILON, MeanIoU, batch_mean_iou, class_iou, sample_mean_iou};

use burn::prelude::*;

use crate::error::{Error, Result};

/// Borrowed `[batch, height, width]` view over integer class labels.
#[derive(Clone, Copy, Debug)]
pub struct LabelBatch<'a> {
    labels: &'a [i64],
    dims: [usize; 3],
}

impl<'a> LabelBatch<'a> {
    pub fn new(labels: &'a [i64], dims: [usize; 3]) -> Result<Self> {
        let expected = dims.iter().product::<usize>();
        if labels.len() != expected {
            return Err(Error::ShapeMismatch {
                expected: dims.to_vec(),
                found: vec![labels.len()],
            });
        }

        Ok(Self { labels, dims })
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn batch_size(&self) -> usize {
        self.dims[0]
    }

    pub fn pixels_per_sample(&self) -> usize {
        self.dims[1] * self.dims[2]
    }

    pub fn labels(&self) -> &'a [i64] {
        self.labels
    }

    pub fn samples(&self) -> impl Iterator<Item = &'a [i64]> {
        let labels = self.labels;
        let pixels = self.pixels_per_sample();
        (0..self.batch_size()).map(move |b| &labels[b * pixels..(b + 1) * pixels])
    }
}

/// Copies an integer label tensor to the host.
pub fn labels_to_host<B: Backend>(labels: Tensor<B, 3, Int>) -> (Vec<i64>, [usize; 3]) {
    let dims = labels.dims();
    let data = labels.into_data();
    let values = data.iter::<i64>().collect();

    (values, dims)
}

pub(crate) fn class_index(label: i64, num_classes: usize) -> Option<usize> {
    usize::try_from(label).ok().filter(|&class| class < num_classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn label_batch_rejects_wrong_length() {
        let labels = [0, 1, 2];
        assert!(matches!(
            LabelBatch::new(&labels, [1, 2, 2]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn label_batch_splits_samples() {
        let labels = [0, 1, 2, 3, 4, 5, 6, 7];
        let batch = LabelBatch::new(&labels, [2, 2, 2]).unwrap();
        let samples: Vec<_> = batch.samples().collect();

        assert_eq!(samples, vec![&labels[..4], &labels[4..]]);
    }

    #[test]
    fn labels_to_host_keeps_layout() {
        let device = Default::default();
        let tensor = Tensor::<NdArray, 3, Int>::from_data(
            TensorData::new(vec![0i64, 1, 2, 0, 2, 1], Shape::new([1, 2, 3]))
                .convert::<<NdArray as Backend>::IntElem>(),
            &device,
        );

        let (labels, dims) = labels_to_host(tensor);
        assert_eq!(dims, [1, 2, 3]);
        assert_eq!(labels, vec![0, 1, 2, 0, 2, 1]);
    }

    #[test]
    fn class_index_filters_range() {
        assert_eq!(class_index(2, 3), Some(2));
        assert_eq!(class_index(3, 3), None);
        assert_eq!(class_index(-1, 3), None);
    }
}
