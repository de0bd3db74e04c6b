mod blocks;
mod fcn;

use burn::prelude::*;

pub use blocks::{ConvBlock, ConvBlockConfig, EncoderBlock, EncoderBlockConfig};
pub use fcn::{Fcn16s, Fcn16sConfig, OUTPUT_STRIDE};

/// Anything that turns a depth batch into per-pixel class logits.
///
/// The training and inference loops only talk to models through this trait.
pub trait SegmentationModel<B: Backend> {
    fn num_classes(&self) -> usize;

    /// `[batch, channels, height, width]` to `[batch, num_classes, height, width]`.
    fn forward(&self, depth: Tensor<B, 4>) -> Tensor<B, 4>;
}
