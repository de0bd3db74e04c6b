//! Model checkpoints: a record file holding the weights plus the
//! [Fcn16sConfig] that rebuilds the architecture, side by side.

use std::path::{Path, PathBuf};

use burn::{prelude::*, record::CompactRecorder};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{Fcn16s, Fcn16sConfig};

/// Checkpoint loaded for evaluation and export.
pub const DEFAULT_CHECKPOINT: &str = "seg_hand";

const RECORD_EXTENSION: &str = "mpk";
const CONFIG_EXTENSION: &str = "json";

/// Name of the checkpoint written after `epoch` of a run tagged `tag`.
pub fn epoch_checkpoint_name(tag: impl std::fmt::Display, epoch: usize) -> String {
    format!("{tag}_FCN16s_{epoch}")
}

pub fn record_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{RECORD_EXTENSION}"))
}

pub fn config_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{CONFIG_EXTENSION}"))
}

/// Writes `{dir}/{name}.mpk` and `{dir}/{name}.json`.
pub fn save_model<B: Backend, M: Module<B>>(
    model: &M,
    config: &Fcn16sConfig,
    dir: &Path,
    name: &str,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    model
        .clone()
        .save_file(dir.join(name), &CompactRecorder::new())
        .map_err(|err| Error::Recorder(format!("{err:?}")))?;
    config.save(config_path(dir, name))?;

    let path = record_path(dir, name);
    info!(path = %path.display(), "Saved checkpoint");

    Ok(path)
}

/// Rebuilds a [Fcn16s] from `{dir}/{name}`.
///
/// Without a config file next to the record the default architecture is
/// assumed.
pub fn load_model<B: Backend>(dir: &Path, name: &str, device: &B::Device) -> Result<Fcn16s<B>> {
    let record = record_path(dir, name);
    if !record.is_file() {
        return Err(Error::MissingCheckpoint(record));
    }

    let config_file = config_path(dir, name);
    let config = if config_file.is_file() {
        Fcn16sConfig::load(&config_file).map_err(|err| Error::Config(format!("{err:?}")))?
    } else {
        warn!(
            path = %config_file.display(),
            "No model config next to checkpoint, assuming the default architecture"
        );
        Fcn16sConfig::new()
    };

    let model = config
        .init::<B>(device)
        .load_file(dir.join(name), &CompactRecorder::new(), device)
        .map_err(|err| Error::Recorder(format!("{err:?}")))?;

    info!(path = %record.display(), "Loaded checkpoint");

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SegmentationModel;
    use burn::backend::NdArray;

    #[test]
    fn epoch_names_follow_tag_and_epoch() {
        assert_eq!(epoch_checkpoint_name("ego", 3), "ego_FCN16s_3");
        assert_eq!(epoch_checkpoint_name("front", 0), "front_FCN16s_0");
    }

    #[test]
    fn missing_record_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_model::<NdArray>(dir.path(), DEFAULT_CHECKPOINT, &Default::default());

        match result {
            Err(Error::MissingCheckpoint(path)) => assert!(path.ends_with("seg_hand.mpk")),
            other => panic!("expected a missing checkpoint, got {other:?}"),
        }
    }

    #[test]
    fn saved_model_reloads_with_its_config() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let config = Fcn16sConfig::new().with_base_channels(2).with_num_classes(4);
        let model = config.init::<NdArray>(&device);

        let path = save_model(&model, &config, dir.path(), "run_FCN16s_0").unwrap();
        assert!(path.is_file());
        assert!(config_path(dir.path(), "run_FCN16s_0").is_file());

        let restored = load_model::<NdArray>(dir.path(), "run_FCN16s_0", &device).unwrap();
        assert_eq!(SegmentationModel::num_classes(&restored), 4);
    }
}
