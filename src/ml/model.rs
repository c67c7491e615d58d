use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{sigmoid, silu},
};

// ─── Architecture table ──────────────────────────────────────────────────────
// EfficientNet-B0 (width 1.0, depth 1.0). Each stage is a run of
// MBConv blocks; only the first block of a stage changes stride
// and channel count.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpec {
    pub expand_ratio: usize,
    pub kernel:       usize,
    pub stride:       usize,
    pub in_channels:  usize,
    pub out_channels: usize,
    pub repeats:      usize,
}

const fn stage(
    expand_ratio: usize, kernel: usize, stride: usize,
    in_channels: usize, out_channels: usize, repeats: usize,
) -> StageSpec {
    StageSpec { expand_ratio, kernel, stride, in_channels, out_channels, repeats }
}

pub const B0_STAGES: [StageSpec; 7] = [
    stage(1, 3, 1,  32,  16, 1),
    stage(6, 3, 2,  16,  24, 2),
    stage(6, 5, 2,  24,  40, 2),
    stage(6, 3, 2,  40,  80, 3),
    stage(6, 5, 1,  80, 112, 3),
    stage(6, 5, 2, 112, 192, 4),
    stage(6, 3, 1, 192, 320, 1),
];

pub const STEM_CHANNELS: usize = 32;

/// Width of the 1×1 head conv, i.e. the feature width the classifier sees
pub const HEAD_CHANNELS: usize = 4 * 320;

#[cfg(test)]
pub const IMAGENET_CLASSES: usize = 1000;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct EfficientNetConfig {
    #[config(default = 1000)]
    pub num_classes: usize,
    #[config(default = 0.2)]
    pub dropout:     f64,
}

impl EfficientNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EfficientNet<B> {
        let stem = ConvBn::new(3, STEM_CHANNELS, 3, 2, 1, device);

        let stages = B0_STAGES
            .iter()
            .map(|spec| Stage::new(spec, device))
            .collect();

        let last = B0_STAGES[B0_STAGES.len() - 1].out_channels;
        let head = ConvBn::new(last, HEAD_CHANNELS, 1, 1, 1, device);

        EfficientNet {
            stem,
            stages,
            head,
            avgpool:    AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout:    DropoutConfig::new(self.dropout).init(),
            classifier: LinearConfig::new(HEAD_CHANNELS, self.num_classes).init(device),
        }
    }
}

// ─── Building blocks ─────────────────────────────────────────────────────────

/// Bias-free convolution followed by batch norm. Activation is
/// applied by the caller because the projection conv has none.
#[derive(Module, Debug)]
pub struct ConvBn<B: Backend> {
    pub conv: Conv2d<B>,
    pub norm: BatchNorm<B, 2>,
}

impl<B: Backend> ConvBn<B> {
    fn new(
        in_channels: usize, out_channels: usize,
        kernel: usize, stride: usize, groups: usize,
        device: &B::Device,
    ) -> Self {
        let pad = (kernel - 1) / 2;
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Explicit(pad, pad))
            .with_groups(groups)
            .with_bias(false)
            .init(device);
        let norm = BatchNormConfig::new(out_channels).init(device);
        Self { conv, norm }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.norm.forward(self.conv.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct SqueezeExcitation<B: Backend> {
    pub avgpool: AdaptiveAvgPool2d,
    pub fc1:     Conv2d<B>,
    pub fc2:     Conv2d<B>,
}

impl<B: Backend> SqueezeExcitation<B> {
    fn new(channels: usize, squeeze: usize, device: &B::Device) -> Self {
        Self {
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc1:     Conv2dConfig::new([channels, squeeze], [1, 1]).init(device),
            fc2:     Conv2dConfig::new([squeeze, channels], [1, 1]).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let scale = self.avgpool.forward(x.clone());      // [N, C, 1, 1]
        let scale = silu(self.fc1.forward(scale));
        let scale = sigmoid(self.fc2.forward(scale));
        let dims = x.dims();
        x * scale.expand(dims)
    }
}

/// Inverted residual block with squeeze-excitation.
#[derive(Module, Debug)]
pub struct MbConv<B: Backend> {
    /// 1×1 expansion; absent when the expand ratio is 1
    pub expand:    Option<ConvBn<B>>,
    pub depthwise: ConvBn<B>,
    pub se:        SqueezeExcitation<B>,
    pub project:   ConvBn<B>,
    pub residual:  bool,
}

impl<B: Backend> MbConv<B> {
    fn new(
        expand_ratio: usize, kernel: usize, stride: usize,
        in_channels: usize, out_channels: usize,
        device: &B::Device,
    ) -> Self {
        let expanded = in_channels * expand_ratio;
        let expand = (expanded != in_channels)
            .then(|| ConvBn::new(in_channels, expanded, 1, 1, 1, device));
        let depthwise = ConvBn::new(expanded, expanded, kernel, stride, expanded, device);
        let se = SqueezeExcitation::new(expanded, (in_channels / 4).max(1), device);
        let project = ConvBn::new(expanded, out_channels, 1, 1, 1, device);
        Self {
            expand, depthwise, se, project,
            residual: stride == 1 && in_channels == out_channels,
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = input.clone();
        if let Some(expand) = &self.expand {
            x = silu(expand.forward(x));
        }
        let x = silu(self.depthwise.forward(x));
        let x = self.se.forward(x);
        let x = self.project.forward(x);
        // Stochastic depth is a training-only regulariser; identity here.
        if self.residual { x + input } else { x }
    }
}

#[derive(Module, Debug)]
pub struct Stage<B: Backend> {
    pub blocks: Vec<MbConv<B>>,
}

impl<B: Backend> Stage<B> {
    fn new(spec: &StageSpec, device: &B::Device) -> Self {
        let blocks = (0..spec.repeats)
            .map(|i| {
                let (stride, in_channels) = if i == 0 {
                    (spec.stride, spec.in_channels)
                } else {
                    (1, spec.out_channels)
                };
                MbConv::new(spec.expand_ratio, spec.kernel, stride, in_channels, spec.out_channels, device)
            })
            .collect();
        Self { blocks }
    }
}

// ─── Network ─────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct EfficientNet<B: Backend> {
    pub stem:       ConvBn<B>,
    pub stages:     Vec<Stage<B>>,
    pub head:       ConvBn<B>,
    pub avgpool:    AdaptiveAvgPool2d,
    pub dropout:    Dropout,
    pub classifier: Linear<B>,
}

impl<B: Backend> EfficientNet<B> {
    /// images: [batch, 3, H, W] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = silu(self.stem.forward(images));
        for stage in &self.stages {
            for block in &stage.blocks {
                x = block.forward(x);
            }
        }
        let x = silu(self.head.forward(x));
        let x = self.avgpool.forward(x).flatten::<2>(1, 3);   // [batch, features]
        self.classifier.forward(self.dropout.forward(x))
    }

    /// Input width of the current classifier, read from its weight
    /// matrix ([d_input, d_output] in burn).
    pub fn feature_width(&self) -> usize {
        self.classifier.weight.val().dims()[0]
    }

    /// Number of classifier outputs.
    pub fn num_outputs(&self) -> usize {
        self.classifier.weight.val().dims()[1]
    }

    /// Swap the classifier for a single-logit head over the same features.
    pub fn with_binary_head(self, device: &B::Device) -> Self {
        let in_features = self.feature_width();
        Self {
            classifier: LinearConfig::new(in_features, 1).init(device),
            ..self
        }
    }
}

/// Build EfficientNet-B0 with a binary head and random weights.
/// No I/O is performed.
pub fn build_model<B: Backend>(device: &B::Device) -> EfficientNet<B> {
    EfficientNetConfig::new().init::<B>(device).with_binary_head(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn stage_table_chains_channels() {
        assert_eq!(B0_STAGES[0].in_channels, STEM_CHANNELS);
        for pair in B0_STAGES.windows(2) {
            assert_eq!(pair[0].out_channels, pair[1].in_channels);
        }
        let blocks: usize = B0_STAGES.iter().map(|s| s.repeats).sum();
        assert_eq!(blocks, 16);
    }

    #[test]
    fn imagenet_head_is_replaced_by_single_logit() {
        let device = Default::default();
        let imagenet = EfficientNetConfig::new().init::<TestBackend>(&device);
        assert_eq!(imagenet.num_outputs(), IMAGENET_CLASSES);

        let width = imagenet.feature_width();
        let binary = imagenet.with_binary_head(&device);
        assert_eq!(binary.feature_width(), width);
        assert_eq!(binary.num_outputs(), 1);
    }

    #[test]
    fn first_stage_has_no_expansion() {
        let device = Default::default();
        let model = build_model::<TestBackend>(&device);
        assert!(model.stages[0].blocks[0].expand.is_none());
        assert!(model.stages[1].blocks[0].expand.is_some());
        assert!(!model.stages[1].blocks[0].residual);
        assert!(model.stages[1].blocks[1].residual);
    }

    #[test]
    fn forward_yields_one_logit_per_image() {
        let device = Default::default();
        let model = build_model::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::ones([2, 3, 64, 64], &device);
        let logits = model.forward(images);
        assert_eq!(logits.dims(), [2, 1]);
    }
}
