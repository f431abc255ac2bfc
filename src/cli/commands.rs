// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `report`,
// and all their configurable flags.
//
// Boolean switches such as --gradient-clip and --cuda take an
// explicit value (`--cuda false`) so that the defaults can be
// turned off from the command line.

use clap::{ArgAction, Args, Subcommand};

use crate::application::train_use_case::TrainConfig;
use crate::domain::curriculum::CurriculumKind;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the joint pose/match model on a pair manifest
    Train(TrainArgs),

    /// Report binned and unbinned surface-normal accuracy
    Report(ReportArgs),
}

/// Parse a boolean flag value.
/// `yes`, `true`, `t` and `1` (any case) are true; everything else is false.
pub fn parse_flag(s: &str) -> Result<bool, String> {
    Ok(matches!(
        s.to_ascii_lowercase().as_str(),
        "yes" | "true" | "t" | "1"
    ))
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Path to the pair manifest (JSON)
    #[arg(long, default_value = "dataset/train/regTrain/prepro.json")]
    pub json_path: String,

    /// Directory the manifest's image paths are relative to.
    /// Defaults to the manifest's own directory.
    #[arg(long)]
    pub image_root: Option<String>,

    /// Directory for checkpoints, saved config and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// SGD learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Validation batch size, also the base of the uniform curriculum
    #[arg(long, default_value_t = 250)]
    pub batch_size: usize,

    /// Enable gradient clipping?
    #[arg(long, default_value = "true", action = ArgAction::Set, value_parser = parse_flag)]
    pub gradient_clip: bool,

    /// Gradient norm threshold used when clipping is enabled
    #[arg(long, default_value_t = 1.0)]
    pub clip_norm: f64,

    /// Number of training iterations
    #[arg(long, default_value_t = 200_000)]
    pub iters: usize,

    /// SGD momentum
    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// Seed for weight initialisation and batch sampling
    #[arg(long, default_value_t = 123)]
    pub random_seed: u64,

    /// Run on the GPU; fails if no GPU adapter is available
    #[arg(long, default_value = "true", action = ArgAction::Set, value_parser = parse_flag)]
    pub cuda: bool,

    /// Weight of the match loss in the combined loss
    #[arg(long, default_value_t = 1.0)]
    pub loss_lambda: f64,

    /// Side length patches are resized to before entering the network
    #[arg(long, default_value_t = 64)]
    pub patch_size: usize,

    /// Per-level batch composition
    #[arg(long, value_enum, default_value_t = CurriculumKind::Fixed)]
    pub curriculum: CurriculumKind,

    /// Print the training loss every N iterations
    #[arg(long, default_value_t = 100)]
    pub log_interval: usize,

    /// Run a full validation pass every N iterations
    #[arg(long, default_value_t = 1000)]
    pub eval_interval: usize,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            json_path:      a.json_path,
            image_root:     a.image_root,
            checkpoint_dir: a.checkpoint_dir,
            lr:             a.lr,
            batch_size:     a.batch_size,
            gradient_clip:  a.gradient_clip,
            clip_norm:      a.clip_norm,
            iters:          a.iters,
            momentum:       a.momentum,
            random_seed:    a.random_seed,
            cuda:           a.cuda,
            loss_lambda:    a.loss_lambda,
            patch_size:     a.patch_size,
            curriculum:     a.curriculum,
            log_interval:   a.log_interval,
            eval_interval:  a.eval_interval,
        }
    }
}

/// All arguments for the `report` command.
/// Each input is a JSON array of shape N x H x W.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Predicted class per pixel
    #[arg(long)]
    pub predicted: String,

    /// Ground-truth class per pixel
    #[arg(long)]
    pub truth: String,

    /// Validity mask; pixels with a value > 0 are counted
    #[arg(long)]
    pub mask: String,

    /// Total number of classes
    #[arg(long)]
    pub num_classes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_parse_flag_accepts_truthy_spellings() {
        for s in ["yes", "TRUE", "t", "1", "Yes"] {
            assert_eq!(parse_flag(s), Ok(true), "{s}");
        }
        for s in ["no", "false", "0", "", "on"] {
            assert_eq!(parse_flag(s), Ok(false), "{s}");
        }
    }

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["joint-pose-match", "train"]).unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.batch_size, 250);
        assert_eq!(args.iters, 200_000);
        assert_eq!(args.random_seed, 123);
        assert!(args.gradient_clip);
        assert!(args.cuda);
        assert_eq!(args.curriculum, CurriculumKind::Fixed);
    }

    #[test]
    fn test_boolean_flags_can_be_disabled() {
        let cli = Cli::try_parse_from([
            "joint-pose-match", "train", "--cuda", "no", "--gradient-clip", "0",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        let cfg: TrainConfig = args.into();
        assert!(!cfg.cuda);
        assert!(!cfg.gradient_clip);
    }
}
