use std::path::Path;

use burn::prelude::*;
use image::{Rgb, RgbImage, imageops};
use tracing::info;

use crate::dataset::HandSegBatch;
use crate::error::Result;
use crate::metric::{class_index, labels_to_host};
use crate::model::SegmentationModel;

use super::predict_labels;

const VIRIDIS: [[u8; 3]; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];

const PANEL_GAP: u32 = 4;

fn viridis(t: f32) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0) * (VIRIDIS.len() - 1) as f32;
    let low = t.floor() as usize;
    let high = (low + 1).min(VIRIDIS.len() - 1);
    let frac = t - low as f32;

    let mut pixel = [0u8; 3];
    for (channel, value) in pixel.iter_mut().enumerate() {
        let a = VIRIDIS[low][channel] as f32;
        let b = VIRIDIS[high][channel] as f32;
        *value = (a + (b - a) * frac).round() as u8;
    }

    Rgb(pixel)
}

/// Paints each class with an evenly spaced viridis color; out-of-range
/// labels are black.
pub fn colorize_labels(labels: &[i64], [height, width]: [usize; 2], num_classes: usize) -> RgbImage {
    let span = num_classes.saturating_sub(1).max(1) as f32;

    RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let label = labels[y as usize * width + x as usize];
        match class_index(label, num_classes) {
            Some(class) => viridis(class as f32 / span),
            None => Rgb([0, 0, 0]),
        }
    })
}

/// Min-max normalized viridis rendering of a scalar field.
pub fn colorize_values(values: &[f32], [height, width]: [usize; 2]) -> RgbImage {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let value = values[y as usize * width + x as usize];
        if range > 0.0 {
            viridis((value - min) / range)
        } else {
            viridis(0.0)
        }
    })
}

/// Writes the predicted mask of every sample to
/// `{out_dir}/{direction}/{sample name}` and returns how many were written.
pub fn export_masks<B, M, I>(model: &M, batches: I, out_dir: &Path) -> Result<usize>
where
    B: Backend,
    M: SegmentationModel<B>,
    I: IntoIterator<Item = HandSegBatch<B>>,
{
    let num_classes = model.num_classes();
    let mut written = 0;

    for batch in batches {
        let (labels, [batch_size, height, width]) =
            labels_to_host(predict_labels(model, batch.depth));
        let pixels = height * width;

        for index in 0..batch_size {
            let dir = out_dir.join(batch.directions[index].as_str());
            std::fs::create_dir_all(&dir)?;

            let mask = colorize_labels(
                &labels[index * pixels..(index + 1) * pixels],
                [height, width],
                num_classes,
            );
            mask.save(dir.join(&batch.names[index]))?;
            written += 1;
        }
    }

    info!(count = written, dir = %out_dir.display(), "Exported predicted masks");

    Ok(written)
}

/// Renders raw depth, processed depth, prediction and ground truth of the
/// first sample side by side. Only the first batch is consumed.
///
/// Returns `false` when there was nothing to render.
pub fn show_first_batch<B, M, I>(model: &M, batches: I, out_path: &Path) -> Result<bool>
where
    B: Backend,
    M: SegmentationModel<B>,
    I: IntoIterator<Item = HandSegBatch<B>>,
{
    let Some(batch) = batches.into_iter().next() else {
        return Ok(false);
    };

    let num_classes = model.num_classes();
    let [_, _, height, width] = batch.depth.dims();
    let pixels = height * width;
    let size = [height, width];

    let raw: Vec<f32> = batch.raw_depth.into_data().iter::<f32>().take(pixels).collect();
    let processed: Vec<f32> = batch.depth.clone().into_data().iter::<f32>().take(pixels).collect();
    let (predicted, _) = labels_to_host(predict_labels(model, batch.depth));
    let (truth, _) = labels_to_host(batch.masks.squeeze::<3>(1));

    let panels = [
        colorize_values(&raw, size),
        colorize_values(&processed, size),
        colorize_labels(&predicted[..pixels], size, num_classes),
        colorize_labels(&truth[..pixels], size, num_classes),
    ];

    let panel_width = width as u32;
    let canvas_width = panel_width * panels.len() as u32 + PANEL_GAP * (panels.len() as u32 - 1);
    let mut canvas = RgbImage::from_pixel(canvas_width, height as u32, Rgb([255, 255, 255]));

    for (index, panel) in panels.iter().enumerate() {
        let x = index as u32 * (panel_width + PANEL_GAP);
        imageops::replace(&mut canvas, panel, x as i64, 0);
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    canvas.save(out_path)?;

    info!(
        path = %out_path.display(),
        sample = %batch.names[0],
        "Saved side-by-side view"
    );

    Ok(true)
}
