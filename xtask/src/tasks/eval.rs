use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use burn::{
    backend::{NdArray, Wgpu, ndarray::NdArrayDevice, wgpu::WgpuDevice},
    data::dataset::Dataset,
    prelude::*,
};
use clap::{Args, ValueEnum};
use hand_seg::{
    Fcn16sConfig, HandSegDataset, Split, checkpoint,
    inference::{evaluate, evaluation_loader, export_masks, show_first_batch},
};
use tracing::info;

use super::{BackendArg, DirectionArg};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Mode {
    /// Render raw depth, processed depth, prediction and ground truth of one sample
    Show,
    /// Write the predicted mask of every sample
    Save,
    /// Print the mean IoU over the evaluation split
    Miou,
}

#[derive(Args)]
pub struct EvalArgs {
    #[arg(short, long, value_enum, default_value = "save")]
    pub mode: Mode,

    /// Restrict to one camera direction (both by default)
    #[arg(short, long, value_enum)]
    pub direction: Option<DirectionArg>,

    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Checkpoint name inside the checkpoint directory, without extension
    #[arg(long, default_value = checkpoint::DEFAULT_CHECKPOINT)]
    pub checkpoint: String,

    #[arg(short, long, default_value = "results")]
    pub results_dir: PathBuf,

    #[arg(short, long, default_value_t = 4)]
    pub batch_size: usize,

    /// Square input size, a multiple of 32
    #[arg(long, default_value_t = 224)]
    pub image_size: usize,

    #[arg(long, value_enum, default_value_t = BackendArg::Wgpu)]
    pub backend: BackendArg,
}

pub fn run(args: &EvalArgs) -> Result<()> {
    match args.backend {
        BackendArg::Wgpu => eval::<Wgpu<f32, i32>>(args, WgpuDevice::default()),
        BackendArg::Ndarray => eval::<NdArray<f32>>(args, NdArrayDevice::Cpu),
    }
}

fn eval<B: Backend>(args: &EvalArgs, device: B::Device) -> Result<()> {
    info!(backend = ?args.backend, device = ?device, "Initialized device");

    let image_size = [args.image_size, args.image_size];
    Fcn16sConfig::check_input_size(image_size)?;

    let model = checkpoint::load_model::<B>(&args.checkpoint_dir, &args.checkpoint, &device)
        .context("Failed to load model")?;

    let dataset = HandSegDataset::new(
        &args.data_dir,
        Split::Test,
        args.direction.map(Into::into),
        image_size,
    )
    .with_context(|| format!("Failed to load evaluation data from {}", args.data_dir.display()))?;
    let num_samples = dataset.len();

    // non-autodiff backend, dropout is disabled
    let dataloader = evaluation_loader::<B, _>(
        dataset,
        device.clone(),
        model.input_channels(),
        args.batch_size,
    );

    match args.mode {
        Mode::Show => {
            let path = args.results_dir.join("show.png");
            if !show_first_batch(&model, dataloader.iter(), &path)? {
                bail!("Evaluation split is empty");
            }
            println!("Saved {}", path.display());
        }
        Mode::Save => {
            let written = export_masks(&model, dataloader.iter(), &args.results_dir)?;
            println!("Saved {written} masks to {}", args.results_dir.display());
        }
        Mode::Miou => {
            info!(samples = num_samples, "Evaluating");
            let report = evaluate(&model, dataloader.iter())?;
            println!("{report}");
        }
    }

    Ok(())
}
