use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig2d, Relu,
    },
    prelude::*,
};

use crate::data::patch::CHANNELS;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct JointModelConfig {
    pub pose_dim: usize,
    #[config(default = "16")]
    pub base_filters: usize,
    #[config(default = "256")]
    pub embed_dim: usize,
    #[config(default = "128")]
    pub head_hidden: usize,
    #[config(default = "0.0")]
    pub dropout: f64,
}

impl JointModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> JointModel<B> {
        let f = self.base_filters;
        let trunk = PatchTrunk {
            blocks: vec![
                ConvBlock::new(CHANNELS, f, device),
                ConvBlock::new(f, f * 2, device),
                ConvBlock::new(f * 2, f * 4, device),
            ],
            pool:    AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            project: LinearConfig::new(f * 4, self.embed_dim).init(device),
            relu:    Relu::new(),
        };
        JointModel {
            trunk,
            pose_head:  Head::new(2 * self.embed_dim, self.head_hidden, self.pose_dim, device),
            match_head: Head::new(2 * self.embed_dim, self.head_hidden, 1, device),
            dropout:    DropoutConfig::new(self.dropout).init(),
        }
    }
}

/// conv 3x3 (same) → relu → maxpool 2x2
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            relu: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.pool.forward(self.relu.forward(self.conv.forward(x)))
    }
}

/// Shared feature extractor applied to each patch of a pair.
#[derive(Module, Debug)]
pub struct PatchTrunk<B: Backend> {
    pub blocks:  Vec<ConvBlock<B>>,
    pub pool:    AdaptiveAvgPool2d,
    pub project: Linear<B>,
    pub relu:    Relu,
}

impl<B: Backend> PatchTrunk<B> {
    /// [batch, 3, S, S] → [batch, embed_dim]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = x;
        for block in &self.blocks {
            x = block.forward(x);
        }
        let x: Tensor<B, 2> = self.pool.forward(x).flatten(1, 3);
        self.relu.forward(self.project.forward(x))
    }
}

/// Two-layer MLP over the concatenated pair embedding.
#[derive(Module, Debug)]
pub struct Head<B: Backend> {
    pub hidden: Linear<B>,
    pub out:    Linear<B>,
    pub relu:   Relu,
}

impl<B: Backend> Head<B> {
    fn new(input: usize, hidden: usize, output: usize, device: &B::Device) -> Self {
        Self {
            hidden: LinearConfig::new(input, hidden).init(device),
            out:    LinearConfig::new(hidden, output).init(device),
            relu:   Relu::new(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.out.forward(self.relu.forward(self.hidden.forward(x)))
    }
}

/// Siamese network with a pose regression head and a match
/// classification head sharing one patch trunk.
#[derive(Module, Debug)]
pub struct JointModel<B: Backend> {
    pub trunk:      PatchTrunk<B>,
    pub pose_head:  Head<B>,
    pub match_head: Head<B>,
    pub dropout:    Dropout,
}

/// Inputs for the combined forward pass: one pair batch per task.
pub struct JointInput<B: Backend> {
    pub pose_left:   Tensor<B, 4>,
    pub pose_right:  Tensor<B, 4>,
    pub match_left:  Tensor<B, 4>,
    pub match_right: Tensor<B, 4>,
}

pub struct JointOutput<B: Backend> {
    /// [pose_batch, pose_dim]
    pub pose:         Tensor<B, 2>,
    /// [match_batch]
    pub match_logits: Tensor<B, 1>,
}

impl<B: Backend> JointModel<B> {
    fn embed_pair(&self, left: Tensor<B, 4>, right: Tensor<B, 4>) -> Tensor<B, 2> {
        let features = Tensor::cat(vec![self.trunk.forward(left), self.trunk.forward(right)], 1);
        self.dropout.forward(features)
    }

    pub fn forward_pose(&self, left: Tensor<B, 4>, right: Tensor<B, 4>) -> Tensor<B, 2> {
        self.pose_head.forward(self.embed_pair(left, right))
    }

    pub fn forward_match(&self, left: Tensor<B, 4>, right: Tensor<B, 4>) -> Tensor<B, 1> {
        self.match_head.forward(self.embed_pair(left, right)).flatten(0, 1)
    }

    pub fn forward(&self, input: JointInput<B>) -> JointOutput<B> {
        JointOutput {
            pose:         self.forward_pose(input.pose_left, input.pose_right),
            match_logits: self.forward_match(input.match_left, input.match_right),
        }
    }
}
