pub mod step_log;
pub mod loss;
pub mod trainer;

pub use step_log::LossLog;
pub use loss::{PixelCrossEntropyLoss, PixelCrossEntropyLossConfig};
pub use trainer::{Trainer, TrainingConfig, load_training_config};
