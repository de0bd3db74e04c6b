use burn::{data::dataloader::batcher::Batcher, prelude::*};
use derive_new::new;

use super::{Direction, HandSegItem};

#[derive(Clone, new)]
pub struct HandSegBatcher<B: Backend> {
    device: B::Device,
    input_channels: usize,
}

#[derive(Clone, Debug)]
pub struct HandSegBatch<B: Backend> {
    /// `[batch, height, width]`, unnormalized.
    pub raw_depth: Tensor<B, 3>,
    /// `[batch, channels, height, width]`, normalized depth repeated over channels.
    pub depth: Tensor<B, 4>,
    /// `[batch, 1, height, width]` class indices.
    pub masks: Tensor<B, 4, Int>,
    pub names: Vec<String>,
    pub directions: Vec<Direction>,
}

impl<B: Backend> Batcher<HandSegItem, HandSegBatch<B>> for HandSegBatcher<B> {
    fn batch(&self, items: Vec<HandSegItem>) -> HandSegBatch<B> {
        let batch_size = items.len();
        let [height, width] = items.first().map(|item| item.size).unwrap_or([0, 0]);
        let pixels = height * width;

        let mut raw_depth = Vec::with_capacity(batch_size * pixels);
        let mut depth = Vec::with_capacity(batch_size * pixels);
        let mut masks = Vec::with_capacity(batch_size * pixels);
        let mut names = Vec::with_capacity(batch_size);
        let mut directions = Vec::with_capacity(batch_size);

        for item in items {
            raw_depth.extend_from_slice(&item.raw_depth);
            depth.extend_from_slice(&item.depth);
            masks.extend_from_slice(&item.mask);
            names.push(item.name);
            directions.push(item.direction);
        }

        let raw_depth = Tensor::<B, 3>::from_data(
            TensorData::new(raw_depth, Shape::new([batch_size, height, width]))
                .convert::<B::FloatElem>(),
            &self.device,
        );

        let depth = Tensor::<B, 4>::from_data(
            TensorData::new(depth, Shape::new([batch_size, 1, height, width]))
                .convert::<B::FloatElem>(),
            &self.device,
        )
        .repeat_dim(1, self.input_channels);

        let masks = Tensor::<B, 4, Int>::from_data(
            TensorData::new(masks, Shape::new([batch_size, 1, height, width]))
                .convert::<B::IntElem>(),
            &self.device,
        );

        HandSegBatch {
            raw_depth,
            depth,
            masks,
            names,
            directions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn item(name: &str, value: f32, label: i64) -> HandSegItem {
        HandSegItem {
            name: name.to_string(),
            direction: Direction::Ego,
            size: [2, 3],
            raw_depth: vec![value * 1000.0; 6],
            depth: vec![value; 6],
            mask: vec![label; 6],
        }
    }

    #[test]
    fn stacks_items_along_batch_dimension() {
        let device = Default::default();
        let batcher = HandSegBatcher::<NdArray>::new(device, 3);

        let batch = batcher.batch(vec![item("a.png", 0.25, 1), item("b.png", 0.5, 2)]);

        assert_eq!(batch.raw_depth.dims(), [2, 2, 3]);
        assert_eq!(batch.depth.dims(), [2, 3, 2, 3]);
        assert_eq!(batch.masks.dims(), [2, 1, 2, 3]);
        assert_eq!(batch.names, vec!["a.png", "b.png"]);

        let depth: Vec<f32> = batch.depth.into_data().iter::<f32>().collect();
        assert!(depth[..18].iter().all(|&v| v == 0.25));
        assert!(depth[18..].iter().all(|&v| v == 0.5));

        let masks: Vec<i64> = batch.masks.into_data().iter::<i64>().collect();
        assert_eq!(masks[0], 1);
        assert_eq!(masks[11], 2);
    }
}
