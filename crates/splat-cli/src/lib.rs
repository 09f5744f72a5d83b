mod batch;
mod convert;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::MultiProgress;
use splat_convert::ConvertConfig;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "splat2mc - gaussian splats as Minecraft particles"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a ply file into a datapack.
    Convert(ConvertArgs),
    /// Show statistics of a ply file.
    Info(InfoArgs),
    /// Convert every ply file in a directory.
    Batch(BatchArgs),
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Ply file to convert.
    #[arg(value_name = "PLY")]
    pub ply: PathBuf,
    /// Folder the datapack is written to.
    #[arg(short, long, default_value = "./output")]
    pub output: PathBuf,
    #[clap(flatten)]
    pub config: ConvertConfig,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Ply file to inspect.
    #[arg(value_name = "PLY")]
    pub ply: PathBuf,
    /// Print the statistics as json.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Directory with ply files. Subdirectories are not searched.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
    /// Folder the datapacks are written to.
    #[arg(short, long, default_value = "./output")]
    pub output: PathBuf,
    #[clap(flatten)]
    pub config: ConvertConfig,
}

impl Cli {
    /// Check the conversion options before touching any file.
    pub fn validate(self) -> anyhow::Result<Self> {
        let config = match &self.command {
            Command::Convert(args) => Some(&args.config),
            Command::Batch(args) => Some(&args.config),
            Command::Info(_) => None,
        };
        if let Some(config) = config {
            config.validate().context("Invalid arguments")?;
        }
        Ok(self)
    }
}

/// Run a subcommand. Progress bars are added to `progress`.
pub fn run(cli: Cli, progress: &MultiProgress) -> anyhow::Result<()> {
    match cli.command {
        Command::Convert(args) => convert::run_convert(&args),
        Command::Info(args) => convert::run_info(&args),
        Command::Batch(args) => batch::run_batch(&args, progress),
    }
}


#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;
    use splat_convert::CoordinateMode;

    #[test]
    fn parses_convert() {
        let cli = Cli::try_parse_from([
            "splat2mc",
            "convert",
            "scene.ply",
            "-o",
            "packs",
            "-n",
            "200",
            "-s",
            "16",
            "--coordinates",
            "absolute",
        ])
        .expect("Valid arguments");
        let Command::Convert(args) = cli.command else {
            panic!("Expected convert");
        };
        assert_eq!(args.ply.to_str(), Some("scene.ply"));
        assert_eq!(args.output.to_str(), Some("packs"));
        assert_eq!(args.config.max_particles, 200);
        assert_eq!(args.config.target_size, 16.0);
        assert_eq!(args.config.min_opacity, 0.1);
        assert_eq!(args.config.coordinates, CoordinateMode::Absolute);
    }

    #[test]
    fn parses_info_and_batch() {
        let cli = Cli::try_parse_from(["splat2mc", "info", "scene.ply", "--json"])
            .expect("Valid arguments");
        assert!(matches!(&cli.command, Command::Info(args) if args.json));

        let cli = Cli::try_parse_from(["splat2mc", "batch", "splats"]).expect("Valid arguments");
        let Command::Batch(args) = cli.command else {
            panic!("Expected batch");
        };
        assert_eq!(args.output.to_str(), Some("./output"));
        assert_eq!(args.config.max_particles, 5000);
    }

    #[test]
    fn validate_rejects_bad_options() {
        let cli = Cli::try_parse_from(["splat2mc", "convert", "scene.ply", "--min-opacity", "3"])
            .expect("Parses fine");
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["splat2mc", "convert", "scene.ply", "-n", "0"]);
        assert!(cli.is_err(), "Zero particles rejected while parsing");

        let cli = Cli::try_parse_from(["splat2mc", "info", "scene.ply"]).expect("Parses fine");
        assert!(cli.validate().is_ok());
    }
}
