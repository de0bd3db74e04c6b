use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::{
    backend::{
        Autodiff, NdArray, Wgpu,
        ndarray::NdArrayDevice,
        wgpu::WgpuDevice,
    },
    optim::AdamConfig,
    tensor::backend::AutodiffBackend,
};
use clap::Args;
use hand_seg::{
    Direction, Fcn16sConfig, HandSegDataset, Split, Trainer, TrainingConfig,
    training::load_training_config,
};
use tracing::info;

use super::{BackendArg, DirectionArg};

const DEFAULT_IMAGE_SIZE: usize = 224;

#[derive(Args)]
pub struct TrainArgs {
    /// Camera subset to train on (ego unless the config file names one)
    #[arg(short, long, value_enum)]
    pub direction: Option<DirectionArg>,

    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Training config written by a previous run; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub epochs: Option<usize>,

    #[arg(short, long)]
    pub batch_size: Option<usize>,

    #[arg(short, long)]
    pub lr: Option<f64>,

    #[arg(long)]
    pub num_workers: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Square input size, a multiple of 32
    #[arg(long)]
    pub image_size: Option<usize>,

    #[arg(long)]
    pub checkpoint_every: Option<usize>,

    #[arg(long)]
    pub max_steps_per_epoch: Option<usize>,

    #[arg(long, value_enum, default_value_t = BackendArg::Wgpu)]
    pub backend: BackendArg,
}

fn training_config(args: &TrainArgs) -> Result<TrainingConfig> {
    let mut config = match &args.config {
        Some(path) => load_training_config(path)
            .with_context(|| format!("Failed to load training config {}", path.display()))?,
        None => TrainingConfig::new(
            Fcn16sConfig::new(),
            AdamConfig::new(),
            Direction::Ego,
            [DEFAULT_IMAGE_SIZE, DEFAULT_IMAGE_SIZE],
        ),
    };

    if let Some(direction) = args.direction {
        config.direction = direction.into();
    }
    if let Some(epochs) = args.epochs {
        config.num_epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(lr) = args.lr {
        config.learning_rate = lr;
    }
    if let Some(num_workers) = args.num_workers {
        config.num_workers = num_workers;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(size) = args.image_size {
        config.image_size = [size, size];
    }
    if let Some(every) = args.checkpoint_every {
        config.checkpoint_every = every;
    }
    if args.max_steps_per_epoch.is_some() {
        config.max_steps_per_epoch = args.max_steps_per_epoch;
    }

    Ok(config)
}

pub fn run(args: &TrainArgs) -> Result<()> {
    let config = training_config(args)?;

    match args.backend {
        BackendArg::Wgpu => {
            train::<Autodiff<Wgpu<f32, i32>>>(args, config, WgpuDevice::default())
        }
        BackendArg::Ndarray => {
            train::<Autodiff<NdArray<f32>>>(args, config, NdArrayDevice::Cpu)
        }
    }
}

fn train<B: AutodiffBackend>(args: &TrainArgs, config: TrainingConfig, device: B::Device) -> Result<()> {
    info!(backend = ?args.backend, device = ?device, "Initialized device");

    let dataset = HandSegDataset::new(
        &args.data_dir,
        Split::Train,
        Some(config.direction),
        config.image_size,
    )
    .with_context(|| format!("Failed to load training data from {}", args.data_dir.display()))?;

    let trainer = Trainer::<B>::new(config, &args.checkpoint_dir, device);
    trainer.fit(dataset).context("Training failed")?;

    info!(
        checkpoints = %args.checkpoint_dir.display(),
        log = %trainer.run_dir().join("loss.csv").display(),
        "Training completed successfully"
    );

    Ok(())
}
