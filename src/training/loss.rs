//! Pixel-wise cross-entropy for dense segmentation.
//!
//! Adapted from burn's `CrossEntropyLoss`
//! (https://github.com/tracel-ai/burn/blob/v0.16.0/crates/burn-core/src/nn/loss/cross_entropy.rs):
//! every pixel is treated as one classification sample, targets come as an
//! integer label map and pixels carrying an ignored label do not contribute.

use burn::{
    module::{Content, DisplaySettings, ModuleDisplay},
    prelude::*,
    tensor::activation::log_softmax,
};

/// Configuration to create a [PixelCrossEntropyLoss] using the [init function](PixelCrossEntropyLossConfig::init).
#[derive(Config, Debug)]
pub struct PixelCrossEntropyLossConfig {
    /// Create weighted cross-entropy.
    ///
    /// The loss of a pixel is multiplied by the weight of its target class and
    /// the sum is normalized by the total weight of the contributing pixels.
    ///
    /// # Pre-conditions
    ///   - The order of the weight vector should correspond to the label integer assignment.
    pub weights: Option<Vec<f32>>,

    /// Pixels with this target label are left out of the loss.
    pub ignore_index: Option<usize>,
}

impl PixelCrossEntropyLossConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PixelCrossEntropyLoss<B> {
        self.assertions();
        PixelCrossEntropyLoss {
            weights: self
                .weights
                .as_ref()
                .map(|e| Tensor::<B, 1>::from_floats(e.as_slice(), device)),
            ignore_index: self.ignore_index,
        }
    }

    fn assertions(&self) {
        if let Some(weights) = self.weights.as_ref() {
            assert!(
                weights.iter().all(|e| e > &0.),
                "Weights of cross-entropy have to be positive."
            );
        }
    }
}

/// Should be created using [PixelCrossEntropyLossConfig].
#[derive(Module, Debug)]
#[module(custom_display)]
pub struct PixelCrossEntropyLoss<B: Backend> {
    pub weights: Option<Tensor<B, 1>>,
    pub ignore_index: Option<usize>,
}

impl<B: Backend> ModuleDisplay for PixelCrossEntropyLoss<B> {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("weights", &self.weights)
            .add("ignore_index", &self.ignore_index)
            .optional()
    }
}

impl<B: Backend> PixelCrossEntropyLoss<B> {
    /// Compute the criterion on the input tensor.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, num_classes, height, width]` (logits)
    /// - targets: `[batch_size, 1, height, width]` (integer class indices)
    pub fn forward(&self, predictions: Tensor<B, 4>, targets: Tensor<B, 4, Int>) -> Tensor<B, 1> {
        Self::assertions(&predictions, &targets);

        let [batch_size, num_classes, height, width] = predictions.dims();
        let total_elements = batch_size * height * width;
        let device = predictions.device();

        let predictions = predictions
            .reshape([batch_size, num_classes, height * width])
            .permute([0, 2, 1])
            .reshape([total_elements, num_classes]);

        let targets = targets.reshape([total_elements]);

        let ignored = self
            .ignore_index
            .map(|index| targets.clone().equal_elem(index as i64));

        // ignored pixels may carry labels outside the class range, gather must not see them
        let targets = match &ignored {
            Some(mask) => targets.mask_fill(mask.clone(), 0),
            None => targets,
        };

        let nll = log_softmax(predictions, 1)
            .gather(1, targets.clone().reshape([total_elements, 1]))
            .reshape([total_elements])
            .neg();

        let pixel_weights = match &self.weights {
            Some(weights) => weights.clone().gather(0, targets),
            None => Tensor::ones([total_elements], &device),
        };

        let pixel_weights = match ignored {
            Some(mask) => pixel_weights.mask_fill(mask, 0.0),
            None => pixel_weights,
        };

        let total_weight = pixel_weights.clone().sum().clamp_min(1e-12);

        (nll * pixel_weights).sum() / total_weight
    }

    fn assertions(predictions: &Tensor<B, 4>, targets: &Tensor<B, 4, Int>) {
        let [pred_batch, _pred_classes, pred_height, pred_width] = predictions.dims();
        let [target_batch, target_channels, target_height, target_width] = targets.dims();

        assert_eq!(
            pred_batch, target_batch,
            "Batch size mismatch: predictions ({}) vs targets ({})",
            pred_batch, target_batch
        );

        assert_eq!(
            target_channels, 1,
            "Target should have exactly 1 channel, got {}",
            target_channels
        );

        assert_eq!(
            [pred_height, pred_width],
            [target_height, target_width],
            "Spatial size mismatch: predictions ({}x{}) vs targets ({}x{})",
            pred_height,
            pred_width,
            target_height,
            target_width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn targets(labels: Vec<i64>, shape: [usize; 4]) -> Tensor<TestBackend, 4, Int> {
        Tensor::from_data(
            TensorData::new(labels, Shape::new(shape)).convert::<<TestBackend as Backend>::IntElem>(),
            &Default::default(),
        )
    }

    fn logits(values: Vec<f32>, shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        Tensor::from_data(TensorData::new(values, Shape::new(shape)), &Default::default())
    }

    fn scalar(loss: Tensor<TestBackend, 1>) -> f32 {
        loss.into_scalar().elem::<f32>()
    }

    #[test]
    fn uniform_logits_give_log_num_classes() {
        let loss = PixelCrossEntropyLossConfig::new().init(&Default::default());
        let predictions = Tensor::<TestBackend, 4>::zeros([2, 3, 2, 2], &Default::default());

        let value = scalar(loss.forward(predictions, targets(vec![0, 1, 2, 0, 1, 2, 0, 1], [2, 1, 2, 2])));
        assert!((value - 3f32.ln()).abs() < 1e-5);
    }

    #[test]
    fn confident_correct_logits_give_small_loss() {
        let loss = PixelCrossEntropyLossConfig::new().init(&Default::default());
        // one sample, two classes, 1x2 pixels: pixel 0 is class 0, pixel 1 is class 1
        let predictions = logits(vec![20.0, -20.0, -20.0, 20.0], [1, 2, 1, 2]);

        let value = scalar(loss.forward(predictions, targets(vec![0, 1], [1, 1, 1, 2])));
        assert!(value < 1e-5);
    }

    #[test]
    fn predictions_are_normalized_as_logits() {
        let loss = PixelCrossEntropyLossConfig::new().init(&Default::default());
        let base = logits(vec![2.0, 0.5, -1.0, 1.0], [1, 2, 1, 2]);
        let shifted = base.clone() + 7.0;

        let base = scalar(loss.forward(base, targets(vec![0, 1], [1, 1, 1, 2])));
        let shifted = scalar(loss.forward(shifted, targets(vec![0, 1], [1, 1, 1, 2])));

        // log-softmax is invariant to a constant offset
        assert!((base - shifted).abs() < 1e-5);
        let expected = ((1.0 + (-3.0f32).exp()).ln() + (1.0 + (-0.5f32).exp()).ln()) / 2.0;
        assert!((base - expected).abs() < 1e-5);
    }

    #[test]
    fn ignored_pixels_do_not_contribute() {
        let loss = PixelCrossEntropyLossConfig::new()
            .with_ignore_index(Some(255))
            .init(&Default::default());
        // pixel 0 is confidently right, pixel 1 would be confidently wrong but is ignored
        let predictions = logits(vec![20.0, 20.0, -20.0, -20.0], [1, 2, 1, 2]);

        let value = scalar(loss.forward(predictions, targets(vec![0, 255], [1, 1, 1, 2])));
        assert!(value < 1e-5);
    }

    #[test]
    fn class_weights_rebalance_pixels() {
        let predictions = Tensor::<TestBackend, 4>::zeros([1, 2, 1, 2], &Default::default());
        let plain = PixelCrossEntropyLossConfig::new().init(&Default::default());
        let weighted = PixelCrossEntropyLossConfig::new()
            .with_weights(Some(vec![1.0, 3.0]))
            .init(&Default::default());

        let plain = scalar(plain.forward(predictions.clone(), targets(vec![0, 1], [1, 1, 1, 2])));
        let weighted = scalar(weighted.forward(predictions, targets(vec![0, 1], [1, 1, 1, 2])));

        // uniform logits lose ln(2) on every pixel regardless of weighting
        assert!((plain - 2f32.ln()).abs() < 1e-5);
        assert!((weighted - 2f32.ln()).abs() < 1e-5);
    }

    #[test]
    #[should_panic(expected = "Target should have exactly 1 channel")]
    fn rejects_multi_channel_targets() {
        let loss = PixelCrossEntropyLossConfig::new().init::<TestBackend>(&Default::default());
        let predictions = Tensor::<TestBackend, 4>::zeros([1, 2, 1, 1], &Default::default());

        loss.forward(predictions, targets(vec![0, 1], [1, 2, 1, 1]));
    }
}
