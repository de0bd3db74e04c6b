mod evaluate;
mod export;

pub use evaluate::{EvalReport, evaluate};
pub use export::{colorize_labels, colorize_values, export_masks, show_first_batch};

use std::sync::Arc;

use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    prelude::*,
};

use crate::dataset::{HandSegBatch, HandSegBatcher, HandSegItem};
use crate::model::SegmentationModel;

/// Sequential, unshuffled batches of `dataset` in index order.
///
/// Single-threaded: a multi-worker loader batches per-worker chunks of the
/// dataset, so batch membership would depend on the worker count.
pub fn evaluation_loader<B, D>(
    dataset: D,
    device: B::Device,
    input_channels: usize,
    batch_size: usize,
) -> Arc<dyn DataLoader<HandSegBatch<B>>>
where
    B: Backend,
    D: Dataset<HandSegItem> + 'static,
{
    DataLoaderBuilder::new(HandSegBatcher::<B>::new(device, input_channels))
        .batch_size(batch_size)
        .build(dataset)
}

/// Arg-max over the class dimension: `[batch, height, width]` labels.
pub fn predict_labels<B, M>(model: &M, depth: Tensor<B, 4>) -> Tensor<B, 3, Int>
where
    B: Backend,
    M: SegmentationModel<B>,
{
    model.forward(depth).argmax(1).squeeze::<3>(1)
}
