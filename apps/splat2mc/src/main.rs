use clap::Parser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use splat_cli::Cli;

fn main() -> anyhow::Result<()> {
    let logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .build();
    let level = logger.filter();

    // Log lines are printed above any progress bar instead of tearing through it.
    let progress = MultiProgress::new();
    LogWrapper::new(progress.clone(), logger).try_init()?;
    log::set_max_level(level);

    let cli = Cli::parse().validate()?;
    splat_cli::run(cli, &progress)
}
