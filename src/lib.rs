pub mod checkpoint;
pub mod error;
pub mod metric;
pub mod model;

#[cfg(feature = "dataset")]
pub mod dataset;

#[cfg(feature = "training")]
pub mod training;

#[cfg(feature = "inference")]
pub mod inference;

pub use error::{Error, Result};
pub use metric::{ConfusionMatrix, LabelBatch, MeanIoU, batch_mean_iou};
pub use model::{Fcn16s, Fcn16sConfig, SegmentationModel};

#[cfg(feature = "dataset")]
pub use dataset::{Direction, HandSegBatch, HandSegBatcher, HandSegDataset, Split};

#[cfg(feature = "training")]
pub use training::{PixelCrossEntropyLoss, PixelCrossEntropyLossConfig, Trainer, TrainingConfig};

#[cfg(feature = "inference")]
pub use inference::{
    EvalReport, evaluate, evaluation_loader, export_masks, predict_labels, show_first_batch,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
