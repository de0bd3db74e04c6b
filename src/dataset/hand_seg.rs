use std::path::{Path, PathBuf};

use burn::data::dataset::transform::{Mapper, MapperDataset};
use burn::data::dataset::{Dataset, InMemDataset};
use image::DynamicImage;
use image::imageops::{self, FilterType};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::{Direction, Split};

const DEPTH_DIR: &str = "depth";
const MASK_DIR: &str = "mask";
const SUPPORTED_FILES: [&str; 1] = ["png"];

/// Paths of one depth frame and its ground-truth mask.
#[derive(Clone, Debug)]
pub struct HandSegItemRaw {
    pub depth_path: PathBuf,
    pub mask_path: PathBuf,
    pub direction: Direction,
}

/// A decoded sample, resized to the dataset image size.
///
/// All buffers are row-major `height * width`.
#[derive(Clone, Debug)]
pub struct HandSegItem {
    /// File name of the depth frame, used to name exported predictions.
    pub name: String,
    pub direction: Direction,
    pub size: [usize; 2],
    /// Depth values as stored in the file.
    pub raw_depth: Vec<f32>,
    /// Depth scaled into `[0, 1]` by the frame maximum.
    pub depth: Vec<f32>,
    /// Class index per pixel.
    pub mask: Vec<i64>,
}

impl HandSegItem {
    fn empty(name: String, direction: Direction, size: [usize; 2]) -> Self {
        let pixels = size[0] * size[1];

        Self {
            name,
            direction,
            size,
            raw_depth: vec![0.0; pixels],
            depth: vec![0.0; pixels],
            mask: vec![0; pixels],
        }
    }
}

struct PathToHandSegItem {
    image_size: [usize; 2],
}

impl Mapper<HandSegItemRaw, HandSegItem> for PathToHandSegItem {
    fn map(&self, item: &HandSegItemRaw) -> HandSegItem {
        let name = item
            .depth_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match load_item(item, self.image_size) {
            Ok((raw_depth, depth, mask)) => HandSegItem {
                name,
                direction: item.direction,
                size: self.image_size,
                raw_depth,
                depth,
                mask,
            },
            Err(err) => {
                // a None item would end the epoch early
                warn!(
                    path = %item.depth_path.display(),
                    error = %err,
                    "Could not load sample, substituting an empty one"
                );
                HandSegItem::empty(name, item.direction, self.image_size)
            }
        }
    }
}

fn load_item(
    item: &HandSegItemRaw,
    image_size: [usize; 2],
) -> Result<(Vec<f32>, Vec<f32>, Vec<i64>)> {
    let (raw_depth, depth) = load_depth(&item.depth_path, image_size)?;
    let mask = load_mask(&item.mask_path, image_size)?;

    Ok((raw_depth, depth, mask))
}

fn load_depth(path: &Path, [height, width]: [usize; 2]) -> Result<(Vec<f32>, Vec<f32>)> {
    let depth = image::open(path)?.into_luma16();
    let depth = imageops::resize(&depth, width as u32, height as u32, FilterType::Triangle);

    let raw: Vec<f32> = depth.pixels().map(|pixel| pixel[0] as f32).collect();
    let max = raw.iter().copied().fold(0.0f32, f32::max);

    let normalized = if max > 0.0 {
        raw.iter().map(|&value| value / max).collect()
    } else {
        vec![0.0; raw.len()]
    };

    Ok((raw, normalized))
}

fn load_mask(path: &Path, [height, width]: [usize; 2]) -> Result<Vec<i64>> {
    let (width, height) = (width as u32, height as u32);

    // class index is read from the first channel at the stored bit depth
    let labels = match image::open(path)? {
        mask @ (DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_)) => {
            let mask = imageops::resize(&mask.into_rgb16(), width, height, FilterType::Nearest);
            mask.pixels().map(|pixel| pixel[0] as i64).collect()
        }
        mask => {
            let mask = imageops::resize(&mask.into_rgb8(), width, height, FilterType::Nearest);
            mask.pixels().map(|pixel| pixel[0] as i64).collect()
        }
    };

    Ok(labels)
}

type HandSegMapper = MapperDataset<InMemDataset<HandSegItemRaw>, PathToHandSegItem, HandSegItemRaw>;

/// Depth frames paired with hand masks, decoded lazily on access.
///
/// Expected layout: `{root}/{split}/{direction}/depth/<id>.png` with the
/// mask at `{root}/{split}/{direction}/mask/<id>.png`.
pub struct HandSegDataset {
    dataset: HandSegMapper,
}

impl Dataset<HandSegItem> for HandSegDataset {
    fn get(&self, index: usize) -> Option<HandSegItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl HandSegDataset {
    /// Discover the samples of a split.
    ///
    /// # Arguments
    ///
    /// * `root` - Dataset root folder, containing `train` and `test`.
    /// * `split` - Which split to load.
    /// * `direction` - Restrict to one camera, or load both when `None`.
    /// * `image_size` - `[height, width]` every sample is resized to.
    pub fn new<P: AsRef<Path>>(
        root: P,
        split: Split,
        direction: Option<Direction>,
        image_size: [usize; 2],
    ) -> Result<Self> {
        let split_dir = root.as_ref().join(split.as_str());
        let directions = direction.map_or_else(|| Direction::ALL.to_vec(), |d| vec![d]);

        let mut items = Vec::new();
        for direction in directions {
            let base = split_dir.join(direction.as_str());
            let depth_dir = base.join(DEPTH_DIR);
            let mask_dir = base.join(MASK_DIR);

            if !depth_dir.is_dir() {
                debug!(path = %depth_dir.display(), "No depth directory, skipping");
                continue;
            }

            let mut depth_paths: Vec<PathBuf> = std::fs::read_dir(&depth_dir)?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| path.is_file() && is_supported(path))
                .collect();
            depth_paths.sort();

            for depth_path in depth_paths {
                let Some(file_name) = depth_path.file_name() else {
                    continue;
                };

                let mask_path = mask_dir.join(file_name);
                if !mask_path.is_file() {
                    warn!(path = %depth_path.display(), "No mask for depth frame, skipping");
                    continue;
                }

                items.push(HandSegItemRaw {
                    depth_path,
                    mask_path,
                    direction,
                });
            }
        }

        if items.is_empty() {
            return Err(Error::EmptyDataset(split_dir));
        }

        info!(
            split = %split,
            samples = items.len(),
            "Discovered hand segmentation samples"
        );

        Ok(Self::from_items(items, image_size))
    }

    pub fn from_items(items: Vec<HandSegItemRaw>, image_size: [usize; 2]) -> Self {
        let dataset = InMemDataset::new(items);
        let mapper = PathToHandSegItem { image_size };
        let dataset = MapperDataset::new(dataset, mapper);

        Self { dataset }
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_FILES
                .iter()
                .any(|&valid_ext| valid_ext.eq_ignore_ascii_case(ext))
        })
}
