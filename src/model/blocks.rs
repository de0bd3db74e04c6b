use burn::{
    nn::{
        Dropout, DropoutConfig, Relu,
        conv::{Conv2d, Conv2dConfig},
        pool::MaxPool2d,
    },
    prelude::*,
};
use nn::{PaddingConfig2d, pool::MaxPool2dConfig};

/// A stack of `3x3` same-padded convolutions, each followed by a ReLU.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    convs: Vec<Conv2d<B>>,
    activation: Relu,
    dropout: Dropout,
}

impl<B: Backend> ConvBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = x;

        for conv in &self.convs {
            x = conv.forward(x);
            x = self.activation.forward(x);
            x = self.dropout.forward(x);
        }

        x
    }
}

#[derive(Config, Debug)]
pub struct ConvBlockConfig {
    input_channels: usize,
    num_filters: usize,
    #[config(default = "2")]
    num_convs: usize,
    #[config(default = "0.0")]
    dropout: f64,
}

impl ConvBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvBlock<B> {
        let convs = (0..self.num_convs)
            .map(|i| {
                let input_channels = if i == 0 {
                    self.input_channels
                } else {
                    self.num_filters
                };

                Conv2dConfig::new([input_channels, self.num_filters], [3, 3])
                    .with_padding(PaddingConfig2d::Same)
                    .init(device)
            })
            .collect();

        ConvBlock {
            convs,
            activation: Relu::new(),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// Convolution stack followed by a `2x2` max pool that halves the resolution.
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    conv_block: ConvBlock<B>,
    max_pool: MaxPool2d,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv_block.forward(x);

        self.max_pool.forward(x)
    }
}

#[derive(Config, Debug)]
pub struct EncoderBlockConfig {
    conv_block: ConvBlockConfig,
}

impl EncoderBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            conv_block: self.conv_block.init(device),
            max_pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }
}
