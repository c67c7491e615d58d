// ============================================================
// Layer 6 — Weight Store
// ============================================================
// Restores (and saves) the classifier's parameters.
//
// Two on-disk formats are understood, picked by extension:
//
//   model_weights.pth / .pt  ← torchvision state dict, read with
//                              burn-import's PyTorchFileRecorder
//   model_weights.mpk        ← burn's named MessagePack record,
//                              full precision
//
// torchvision names parameters after its Sequential indices
// (features.3.1.block.2.fc1.weight). The remap table below
// rewrites those into this crate's module tree
// (stages.2.blocks.1.se.fc1.weight). BatchNorm weight/bias →
// gamma/beta and Linear transposition are handled by burn-import.
//
// burn does not check tensor shapes when a record is applied, so
// every parameter shape is compared against the freshly built
// model before the loaded model is handed back.

use anyhow::{bail, Context, Result};
use burn::{
    module::{ModuleVisitor, ParamId},
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use std::path::{Path, PathBuf};

use crate::ml::model::{EfficientNet, EfficientNetRecord, B0_STAGES};

type NativeRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightFormat {
    /// torchvision `state_dict` saved with `torch.save`
    PyTorch,
    /// burn `NamedMpkFileRecorder` output
    Burn,
}

impl WeightFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("pth") | Some("pt") => Ok(WeightFormat::PyTorch),
            Some("mpk")              => Ok(WeightFormat::Burn),
            other => bail!(
                "Unsupported weight file '{}' (extension {:?}); expected .pth, .pt or .mpk",
                path.display(),
                other
            ),
        }
    }
}

/// A weight file at a fixed path.
pub struct WeightStore {
    path: PathBuf,
}

impl WeightStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Apply the stored parameters to `model`.
    ///
    /// Fails on an unreadable file, missing parameters, or any
    /// parameter whose shape differs from the model's.
    pub fn load<B: Backend>(
        &self,
        model:  EfficientNet<B>,
        device: &B::Device,
    ) -> Result<EfficientNet<B>> {
        let format = WeightFormat::from_path(&self.path)?;
        tracing::info!("Loading {:?} weights from '{}'", format, self.path.display());

        let record: EfficientNetRecord<B> = match format {
            WeightFormat::PyTorch => {
                let mut args = LoadArgs::new(self.path.clone());
                for (pattern, replacement) in torchvision_key_remap() {
                    args = args.with_key_remap(&pattern, &replacement);
                }
                PyTorchFileRecorder::<FullPrecisionSettings>::default()
                    .load(args, device)
                    .with_context(|| {
                        format!("Cannot read PyTorch weights '{}'", self.path.display())
                    })?
            }
            WeightFormat::Burn => NativeRecorder::new()
                .load(self.path.clone(), device)
                .with_context(|| {
                    format!("Cannot read burn record '{}'", self.path.display())
                })?,
        };

        let expected = param_shapes(&model);
        let loaded   = model.load_record(record);
        check_shapes(&expected, &param_shapes(&loaded))
            .with_context(|| format!("Weights in '{}' do not fit EfficientNet-B0", self.path.display()))?;

        Ok(loaded)
    }

    /// Write `model` in burn's native full-precision format.
    /// The recorder forces the `.mpk` extension; the final path is returned.
    pub fn save<B: Backend>(&self, model: &EfficientNet<B>) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create '{}'", parent.display()))?;
        }

        NativeRecorder::new()
            .record(model.clone().into_record(), self.path.clone())
            .with_context(|| format!("Failed to save weights to '{}'", self.path.display()))?;

        let written = self.path.with_extension("mpk");
        tracing::debug!("Saved weights to '{}'", written.display());
        Ok(written)
    }
}

/// Regex rewrites from torchvision's EfficientNet parameter names to
/// this crate's, applied in order by burn-import.
pub fn torchvision_key_remap() -> Vec<(String, String)> {
    let head = B0_STAGES.len() + 1;
    let mut table = vec![
        (r"^features\.0\.0\.".to_string(),         "stem.conv.".to_string()),
        (r"^features\.0\.1\.".to_string(),         "stem.norm.".to_string()),
        (format!(r"^features\.{head}\.0\."),       "head.conv.".to_string()),
        (format!(r"^features\.{head}\.1\."),       "head.norm.".to_string()),
        (r"^classifier\.1\.".to_string(),          "classifier.".to_string()),
    ];

    for (idx, spec) in B0_STAGES.iter().enumerate() {
        let feature = idx + 1;
        let src = |k: usize, tail: &str| format!(r"^features\.{feature}\.(\d+)\.block\.{k}\.{tail}");
        let dst = |name: &str| format!("stages.{idx}.blocks.$1.{name}.");

        // Blocks without expansion start directly with the depthwise conv.
        let dw = if spec.expand_ratio == 1 {
            0
        } else {
            table.push((src(0, r"0\."), dst("expand.conv")));
            table.push((src(0, r"1\."), dst("expand.norm")));
            1
        };
        table.push((src(dw, r"0\."),     dst("depthwise.conv")));
        table.push((src(dw, r"1\."),     dst("depthwise.norm")));
        table.push((src(dw + 1, ""),     dst("se")));
        table.push((src(dw + 2, r"0\."), dst("project.conv")));
        table.push((src(dw + 2, r"1\."), dst("project.norm")));
    }

    table
}

// ─── Shape validation ────────────────────────────────────────────────────────

#[derive(Default)]
struct ShapeCollector {
    shapes: Vec<Vec<usize>>,
}

impl<B: Backend> ModuleVisitor<B> for ShapeCollector {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        self.shapes.push(tensor.dims().to_vec());
    }
}

fn param_shapes<B: Backend>(model: &EfficientNet<B>) -> Vec<Vec<usize>> {
    let mut collector = ShapeCollector::default();
    model.visit(&mut collector);
    collector.shapes
}

fn check_shapes(expected: &[Vec<usize>], loaded: &[Vec<usize>]) -> Result<()> {
    if expected.len() != loaded.len() {
        bail!("expected {} tensors, found {}", expected.len(), loaded.len());
    }
    if let Some((i, (want, got))) = expected
        .iter()
        .zip(loaded)
        .enumerate()
        .find(|(_, (want, got))| want != got)
    {
        bail!("tensor #{i} has shape {got:?}, expected {want:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{build_model, EfficientNetConfig, HEAD_CHANNELS, STEM_CHANNELS};
    use burn::backend::NdArray;
    use regex::Regex;

    type TestBackend = NdArray;

    /// Full B0 state dict in torchvision naming with a one-logit head;
    /// regenerate with `tests/fixtures/make_torchvision_b0.py`.
    const TORCHVISION_FIXTURE: &str =
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/efficientnet_b0_binary.pth");

    /// Element `i` of the fixture's shared float storage.
    fn fixture_value(i: usize) -> f32 {
        (i % 256) as f32 / 256.0
    }

    fn values<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
        tensor.into_data().to_vec::<f32>().unwrap()
    }

    fn remap(key: &str) -> String {
        torchvision_key_remap()
            .iter()
            .fold(key.to_string(), |name, (pattern, replacement)| {
                Regex::new(pattern)
                    .unwrap()
                    .replace_all(&name, replacement.as_str())
                    .into_owned()
            })
    }

    fn logits(model: &EfficientNet<TestBackend>) -> Vec<f32> {
        let device = Default::default();
        let input = Tensor::<TestBackend, 4>::ones([1, 3, 32, 32], &device);
        model.forward(input).into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(WeightFormat::from_path(Path::new("model_weights.pth")).unwrap(), WeightFormat::PyTorch);
        assert_eq!(WeightFormat::from_path(Path::new("a/b.pt")).unwrap(), WeightFormat::PyTorch);
        assert_eq!(WeightFormat::from_path(Path::new("b0.mpk")).unwrap(), WeightFormat::Burn);
        assert!(WeightFormat::from_path(Path::new("weights.bin")).is_err());
        assert!(WeightFormat::from_path(Path::new("weights")).is_err());
    }

    #[test]
    fn torchvision_names_map_onto_module_tree() {
        let cases = [
            ("features.0.0.weight",                 "stem.conv.weight"),
            ("features.0.1.running_var",            "stem.norm.running_var"),
            ("features.1.0.block.0.0.weight",       "stages.0.blocks.0.depthwise.conv.weight"),
            ("features.1.0.block.1.fc1.bias",       "stages.0.blocks.0.se.fc1.bias"),
            ("features.1.0.block.2.1.weight",       "stages.0.blocks.0.project.norm.weight"),
            ("features.2.1.block.0.0.weight",       "stages.1.blocks.1.expand.conv.weight"),
            ("features.4.2.block.1.1.running_mean", "stages.3.blocks.2.depthwise.norm.running_mean"),
            ("features.6.3.block.2.fc2.weight",     "stages.5.blocks.3.se.fc2.weight"),
            ("features.7.0.block.3.0.weight",       "stages.6.blocks.0.project.conv.weight"),
            ("features.8.0.weight",                 "head.conv.weight"),
            ("features.8.1.bias",                   "head.norm.bias"),
            ("classifier.1.weight",                 "classifier.weight"),
        ];
        for (torch, ours) in cases {
            assert_eq!(remap(torch), ours, "remapping {torch}");
        }
    }

    #[test]
    fn torchvision_state_dict_loads() {
        let device = Default::default();
        let model = WeightStore::new(TORCHVISION_FIXTURE)
            .load(build_model::<TestBackend>(&device), &device)
            .unwrap();

        // torch keeps Linear weights as [out, in]; burn wants [in, out].
        let weight = model.classifier.weight.val();
        assert_eq!(weight.dims(), [HEAD_CHANNELS, 1]);
        let weight = values(weight);
        assert!(weight.iter().enumerate().all(|(i, &w)| w == fixture_value(i)));
        assert_eq!(values(model.classifier.bias.clone().unwrap().val()), vec![fixture_value(0)]);

        // BatchNorm weight/bias arrive as gamma/beta.
        let gamma = values(model.stem.norm.gamma.val());
        assert_eq!(gamma.len(), STEM_CHANNELS);
        assert!(gamma.iter().enumerate().all(|(i, &g)| g == fixture_value(i)));

        let se = &model.stages[5].blocks[3].se;
        assert_eq!(se.fc1.weight.val().dims(), [192 / 4, 192 * 6, 1, 1]);
        assert!(model.stages[0].blocks[0].expand.is_none());
        assert_eq!(model.head.conv.weight.val().dims(), [HEAD_CHANNELS, 320, 1, 1]);
    }

    #[test]
    fn saved_weights_restore_identical_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let original = build_model::<TestBackend>(&device);

        let store = WeightStore::new(dir.path().join("b0.mpk"));
        let written = store.save(&original).unwrap();
        assert!(written.is_file());

        let fresh = build_model::<TestBackend>(&device);
        let restored = WeightStore::new(written).load(fresh, &device).unwrap();
        assert_eq!(logits(&original), logits(&restored));
    }

    #[test]
    fn mismatched_head_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let imagenet = EfficientNetConfig::new().init::<TestBackend>(&device);
        let written = WeightStore::new(dir.path().join("imagenet.mpk")).save(&imagenet).unwrap();

        let err = WeightStore::new(written)
            .load(build_model::<TestBackend>(&device), &device)
            .unwrap_err();
        assert!(format!("{err:#}").contains("do not fit"));
    }

    #[test]
    fn corrupt_files_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        for name in ["broken.mpk", "broken.pth"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"\x00\x01 not a weight file").unwrap();
            let result = WeightStore::new(&path).load(build_model::<TestBackend>(&device), &device);
            assert!(result.is_err(), "{name} should not load");
        }
    }
}
