use burn::{
    nn::conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
    prelude::*,
};

use crate::error::Error;

use super::SegmentationModel;
use super::blocks::{ConvBlock, ConvBlockConfig, EncoderBlock, EncoderBlockConfig};

/// Total downsampling of the encoder. Inputs must be a multiple of it.
pub const OUTPUT_STRIDE: usize = 32;

/// Fully convolutional network with a 16-stride skip connection.
///
/// Five VGG-style stages downsample the input by 32. The coarse class scores
/// are upsampled by 2, fused with scores predicted from the stride-16 stage
/// and upsampled by 16 back to the input resolution.
#[derive(Module, Debug)]
pub struct Fcn16s<B: Backend> {
    stage_1: EncoderBlock<B>,
    stage_2: EncoderBlock<B>,
    stage_3: EncoderBlock<B>,
    stage_4: EncoderBlock<B>,
    stage_5: EncoderBlock<B>,
    classifier: ConvBlock<B>,
    score_pool5: Conv2d<B>,
    score_pool4: Conv2d<B>,
    upscore_2x: ConvTranspose2d<B>,
    upscore_16x: ConvTranspose2d<B>,

    input_channels: usize,
    num_classes: usize,
}

#[derive(Config, Debug)]
pub struct Fcn16sConfig {
    #[config(default = "3")]
    input_channels: usize,
    #[config(default = "3")]
    num_classes: usize,
    #[config(default = "64")]
    base_channels: usize,
    #[config(default = "0.5")]
    dropout: f64,
}

impl Fcn16sConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Fcn16s<B> {
        let c = self.base_channels;
        let stage = |input: usize, filters: usize, convs: usize| {
            EncoderBlockConfig::new(ConvBlockConfig::new(input, filters).with_num_convs(convs))
                .init::<B>(device)
        };

        Fcn16s {
            stage_1: stage(self.input_channels, c, 2),
            stage_2: stage(c, c * 2, 2),
            stage_3: stage(c * 2, c * 4, 3),
            stage_4: stage(c * 4, c * 8, 3),
            stage_5: stage(c * 8, c * 8, 3),
            classifier: ConvBlockConfig::new(c * 8, c * 16)
                .with_dropout(self.dropout)
                .init(device),
            score_pool5: Conv2dConfig::new([c * 16, self.num_classes], [1, 1]).init(device),
            score_pool4: Conv2dConfig::new([c * 8, self.num_classes], [1, 1]).init(device),
            upscore_2x: ConvTranspose2dConfig::new([self.num_classes, self.num_classes], [2, 2])
                .with_stride([2, 2])
                .init(device),
            upscore_16x: ConvTranspose2dConfig::new([self.num_classes, self.num_classes], [16, 16])
                .with_stride([16, 16])
                .init(device),
            input_channels: self.input_channels,
            num_classes: self.num_classes,
        }
    }

    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn check_input_size(size: [usize; 2]) -> crate::error::Result<()> {
        if size.iter().any(|&s| s == 0 || s % OUTPUT_STRIDE != 0) {
            return Err(Error::InvalidImageSize(size));
        }

        Ok(())
    }
}

impl<B: Backend> Fcn16s<B> {
    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Maps `[batch, channels, height, width]` depth to class logits of
    /// shape `[batch, num_classes, height, width]`.
    pub fn forward(&self, depth: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.stage_1.forward(depth);
        let x = self.stage_2.forward(x);
        let x = self.stage_3.forward(x);
        let pool4 = self.stage_4.forward(x);
        let pool5 = self.stage_5.forward(pool4.clone());

        let score = self.score_pool5.forward(self.classifier.forward(pool5));
        let score = self.upscore_2x.forward(score) + self.score_pool4.forward(pool4);

        self.upscore_16x.forward(score)
    }
}

impl<B: Backend> SegmentationModel<B> for Fcn16s<B> {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn forward(&self, depth: Tensor<B, 4>) -> Tensor<B, 4> {
        Fcn16s::forward(self, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn logits_match_input_resolution() {
        let device = Default::default();
        let model = Fcn16sConfig::new()
            .with_base_channels(2)
            .init::<NdArray>(&device);

        let logits = model.forward(Tensor::zeros([2, 3, 64, 32], &device));
        assert_eq!(logits.dims(), [2, 3, 64, 32]);
        assert_eq!(SegmentationModel::num_classes(&model), 3);
        assert_eq!(model.input_channels(), 3);
    }

    #[test]
    fn input_size_must_be_multiple_of_stride() {
        assert!(Fcn16sConfig::check_input_size([224, 224]).is_ok());
        assert!(matches!(
            Fcn16sConfig::check_input_size([224, 100]),
            Err(Error::InvalidImageSize([224, 100]))
        ));
        assert!(Fcn16sConfig::check_input_size([0, 32]).is_err());
    }

    #[test]
    fn config_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fcn.json");
        Fcn16sConfig::new()
            .with_num_classes(4)
            .with_dropout(0.25)
            .save(&path)
            .unwrap();

        let loaded = Fcn16sConfig::load(&path).unwrap();
        assert_eq!(loaded.num_classes(), 4);
        assert_eq!(loaded.dropout, 0.25);
        assert_eq!(loaded.input_channels(), 3);
    }
}
