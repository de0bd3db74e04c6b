use std::path::{Path, PathBuf};

use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use tracing::{debug, info};

use crate::checkpoint;
use crate::dataset::{Direction, HandSegBatcher, HandSegItem};
use crate::error::{self, Error};
use crate::model::{Fcn16s, Fcn16sConfig, SegmentationModel};

use super::LossLog;
use super::loss::PixelCrossEntropyLossConfig;

#[derive(Config)]
pub struct TrainingConfig {
    pub model: Fcn16sConfig,
    pub optimizer: AdamConfig,
    /// Camera subset trained on, also the tag of every checkpoint.
    pub direction: Direction,
    /// `[height, width]` samples are resized to.
    pub image_size: [usize; 2],
    #[config(default = 20)]
    pub num_epochs: usize,
    #[config(default = 4)]
    pub batch_size: usize,
    #[config(default = 4)]
    pub num_workers: usize,
    #[config(default = 42)]
    pub seed: u64,
    #[config(default = 3e-4)]
    pub learning_rate: f64,
    /// Save a checkpoint every this many epochs. The last epoch is always saved.
    #[config(default = 1)]
    pub checkpoint_every: usize,
    /// Cut every epoch short after this many steps.
    pub max_steps_per_epoch: Option<usize>,
    pub class_weights: Option<Vec<f32>>,
}

impl TrainingConfig {
    fn validate(&self) -> error::Result<()> {
        Fcn16sConfig::check_input_size(self.image_size)?;

        if self.model.num_classes() == 0 {
            return Err(Error::InvalidClassCount(0));
        }

        if let Some(weights) = &self.class_weights {
            if weights.len() != self.model.num_classes() {
                return Err(Error::ShapeMismatch {
                    expected: vec![self.model.num_classes()],
                    found: vec![weights.len()],
                });
            }
        }

        Ok(())
    }

    fn should_checkpoint(&self, epoch: usize) -> bool {
        epoch + 1 == self.num_epochs || epoch % self.checkpoint_every.max(1) == 0
    }
}

/// Runs the optimization loop and writes checkpoints under `checkpoint_dir`.
pub struct Trainer<B: AutodiffBackend> {
    config: TrainingConfig,
    checkpoint_dir: PathBuf,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(config: TrainingConfig, checkpoint_dir: impl Into<PathBuf>, device: B::Device) -> Self {
        Self {
            config,
            checkpoint_dir: checkpoint_dir.into(),
            device,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Directory holding the run config and the step log.
    pub fn run_dir(&self) -> PathBuf {
        self.checkpoint_dir
            .join(format!("{}_FCN16s", self.config.direction))
    }

    /// Trains a freshly initialized [Fcn16s].
    pub fn fit<D>(&self, dataset: D) -> error::Result<Fcn16s<B>>
    where
        D: Dataset<HandSegItem> + 'static,
    {
        B::seed(self.config.seed);
        let model = self.config.model.init::<B>(&self.device);

        self.fit_model(model, dataset)
    }

    pub fn fit_model<M, D>(&self, mut model: M, dataset: D) -> error::Result<M>
    where
        M: AutodiffModule<B> + SegmentationModel<B>,
        D: Dataset<HandSegItem> + 'static,
    {
        self.config.validate()?;
        B::seed(self.config.seed);

        let run_dir = self.run_dir();
        std::fs::create_dir_all(&run_dir)?;
        self.config.save(run_dir.join("config.json"))?;
        let mut loss_log = LossLog::create(run_dir.join("loss.csv"))?;

        info!(
            samples = dataset.len(),
            direction = %self.config.direction,
            epochs = self.config.num_epochs,
            batch_size = self.config.batch_size,
            "Starting training"
        );

        let batcher = HandSegBatcher::<B>::new(self.device.clone(), self.config.model.input_channels());
        let mut builder = DataLoaderBuilder::new(batcher)
            .batch_size(self.config.batch_size)
            .shuffle(self.config.seed);
        if self.config.num_workers > 0 {
            builder = builder.num_workers(self.config.num_workers);
        }
        let dataloader = builder.build(dataset);

        let loss_fn = PixelCrossEntropyLossConfig::new()
            .with_weights(self.config.class_weights.clone())
            .init::<B>(&self.device);
        let mut optimizer = self.config.optimizer.init::<B, M>();

        let mut step = 0;
        for epoch in 0..self.config.num_epochs {
            let mut epoch_loss = 0.0;
            let mut epoch_steps = 0;

            for batch in dataloader.iter() {
                if self
                    .config
                    .max_steps_per_epoch
                    .is_some_and(|max| epoch_steps >= max)
                {
                    break;
                }

                let logits = model.forward(batch.depth);
                let loss = loss_fn.forward(logits, batch.masks);
                let loss_value = loss.clone().into_scalar().elem::<f64>();

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optimizer.step(self.config.learning_rate, model, grads);

                step += 1;
                epoch_steps += 1;
                epoch_loss += loss_value;

                loss_log.record(step, epoch, loss_value)?;
                debug!(step, epoch, loss = loss_value, "Train step");
            }

            loss_log.flush()?;

            let mean_loss = if epoch_steps > 0 {
                epoch_loss / epoch_steps as f64
            } else {
                0.0
            };
            info!(epoch, steps = epoch_steps, mean_loss, "Epoch finished");

            if self.config.should_checkpoint(epoch) {
                let name = checkpoint::epoch_checkpoint_name(self.config.direction, epoch);
                checkpoint::save_model(&model, &self.config.model, &self.checkpoint_dir, &name)?;
            }
        }

        info!(steps = step, "Training completed");

        Ok(model)
    }
}

/// Loads a [TrainingConfig] written by a previous run or by hand.
pub fn load_training_config(path: &Path) -> error::Result<TrainingConfig> {
    TrainingConfig::load(path).map_err(|err| Error::Config(format!("{err:?}")))
}
