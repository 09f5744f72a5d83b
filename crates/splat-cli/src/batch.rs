use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use splat_datapack::safe_name;

use crate::BatchArgs;
use crate::convert::{convert_file, datapack_name};

/// All `.ply` files directly inside `dir`, sorted by path.
pub(crate) fn find_ply_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut files = vec![];
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .path();
        let is_ply = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ply"));
        if is_ply && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Drop files that would write to the same datapack as an earlier file.
pub(crate) fn unique_datapacks(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut claimed = HashSet::new();
    files
        .into_iter()
        .filter(|path| {
            // Files without a usable name fail on their own later.
            let Ok(name) = datapack_name(path) else {
                return true;
            };
            let unique = claimed.insert(safe_name(name));
            if !unique {
                log::warn!(
                    "Skipping {}, an earlier file already writes datapack splat_{}",
                    path.display(),
                    safe_name(name)
                );
            }
            unique
        })
        .collect()
}

pub(crate) fn run_batch(args: &BatchArgs, progress: &MultiProgress) -> anyhow::Result<()> {
    let files = find_ply_files(&args.dir)?;
    if files.is_empty() {
        log::warn!("No ply files found in {}", args.dir.display());
        return Ok(());
    }
    log::info!("Found {} ply files", files.len());
    let files = unique_datapacks(files);

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let bar = progress.add(ProgressBar::new(files.len() as u64));
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.green/blue}] {pos}/{len} files ({elapsed}) {msg}")?
            .progress_chars("=> "),
    );

    let start = Instant::now();
    let failed: Vec<&Path> = files
        .par_iter()
        .filter_map(|path| {
            let result = convert_file(path, &args.output, &args.config);
            bar.inc(1);
            match result {
                Ok(pack) => {
                    bar.set_message(pack.function);
                    None
                }
                Err(err) => {
                    log::error!("{err:#}");
                    Some(path.as_path())
                }
            }
        })
        .collect();

    bar.finish_and_clear();
    progress.remove(&bar);

    let elapsed = Duration::from_secs(start.elapsed().as_secs());
    println!(
        "Converted {} of {} files in {}, datapacks in {}",
        files.len() - failed.len(),
        files.len(),
        humantime::format_duration(elapsed),
        args.output.display()
    );

    if failed.is_empty() {
        Ok(())
    } else {
        let names: Vec<_> = failed.iter().map(|p| p.display().to_string()).collect();
        anyhow::bail!(
            "{} of {} files failed: {}",
            failed.len(),
            files.len(),
            names.join(", ")
        )
    }
}
