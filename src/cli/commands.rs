// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the subcommands: `serve`, `classify` and `convert`
// and all their configurable flags.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::ml::inferencer::InferencerOptions;
use crate::server::ServerConfig;

/// Default weight file, relative to the working directory
pub const DEFAULT_WEIGHTS: &str = "model_weights.pth";

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP prediction service
    Serve(ServeArgs),

    /// Classify a single image file and print the result
    Classify(ClassifyArgs),

    /// Convert torchvision weights into burn's native format
    Convert(ConvertArgs),
}

/// Where the model weights come from.
#[derive(Args, Debug, Clone)]
pub struct WeightArgs {
    /// Weight file (.pth / .pt from PyTorch, or .mpk from `convert`)
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_WEIGHTS)]
    pub weights: PathBuf,

    /// Exit with an error instead of serving random weights when the
    /// weight file is missing or unreadable
    #[arg(long, default_value_t = false)]
    pub strict_weights: bool,
}

impl From<WeightArgs> for InferencerOptions {
    fn from(a: WeightArgs) -> Self {
        InferencerOptions {
            weights_path:   a.weights,
            strict_weights: a.strict_weights,
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "API_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Largest accepted upload, in megabytes
    #[arg(long, default_value_t = 20)]
    pub max_upload_mb: usize,

    #[command(flatten)]
    pub weights: WeightArgs,
}

/// Convert CLI ServeArgs into the server's plain config struct.
/// The server layer never sees clap types.
impl From<&ServeArgs> for ServerConfig {
    fn from(a: &ServeArgs) -> Self {
        ServerConfig {
            host:            a.host.clone(),
            port:            a.port,
            max_upload_size: a.max_upload_mb.saturating_mul(1024 * 1024),
        }
    }
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Image file to classify
    #[arg(long)]
    pub image: PathBuf,

    #[command(flatten)]
    pub weights: WeightArgs,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// torchvision state dict (.pth / .pt)
    #[arg(long, default_value = DEFAULT_WEIGHTS)]
    pub input: PathBuf,

    /// Destination; the .mpk extension is enforced
    #[arg(long, default_value = "model_weights.mpk")]
    pub output: PathBuf,
}
