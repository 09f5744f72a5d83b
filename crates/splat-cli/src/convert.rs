use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use splat_convert::{ConversionError, ConvertConfig, SceneSummary};
use splat_datapack::{NAMESPACE, safe_name, write_datapack};

use crate::{ConvertArgs, InfoArgs};

/// A datapack written for one ply file.
pub(crate) struct ConvertedPack {
    pub root: PathBuf,
    pub function: String,
    pub commands: usize,
}

/// Attach the file and the broad error category to a conversion error.
fn with_kind<T>(result: Result<T, ConversionError>, path: &Path) -> anyhow::Result<T> {
    result.map_err(|err| {
        let kind = err.kind();
        anyhow::Error::new(err).context(format!("Failed to convert {} ({kind})", path.display()))
    })
}

fn read_ply(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Datapacks are named after the file they came from.
pub(crate) fn datapack_name(path: &Path) -> anyhow::Result<&str> {
    path.file_stem()
        .and_then(OsStr::to_str)
        .with_context(|| format!("{} has no usable file name", path.display()))
}

pub(crate) fn convert_file(
    path: &Path,
    output: &Path,
    config: &ConvertConfig,
) -> anyhow::Result<ConvertedPack> {
    let start = Instant::now();

    let bytes = read_ply(path)?;
    let commands = with_kind(splat_convert::convert_with_config(&bytes, config), path)?;
    let name = datapack_name(path)?;
    let root = write_datapack(name, &commands, output)
        .with_context(|| format!("Failed to write datapack for {}", path.display()))?;

    let elapsed = Duration::from_millis(start.elapsed().as_millis() as u64);
    log::info!(
        "Converted {} to {} particles in {}",
        path.display(),
        commands.len(),
        humantime::format_duration(elapsed)
    );

    Ok(ConvertedPack {
        root,
        function: safe_name(name),
        commands: commands.len(),
    })
}

pub(crate) fn run_convert(args: &ConvertArgs) -> anyhow::Result<()> {
    let pack = convert_file(&args.ply, &args.output, &args.config)?;
    if pack.commands == 0 {
        log::warn!(
            "No splat of {} is more opaque than {}, the datapack is empty",
            args.ply.display(),
            args.config.min_opacity
        );
    }
    println!("Datapack created: {}", pack.root.display());
    println!("  Copy it to your world's datapacks/ folder");
    println!("  Then: /reload and /function {NAMESPACE}:{}", pack.function);
    Ok(())
}

fn summary_text(path: &Path, summary: &SceneSummary) -> String {
    let (opacity, scale) = (summary.opacity, summary.scale);
    let mut text = format!(
        "File: {}\nSplats: {}\n\
         Opacity: min={:.3}, max={:.3}, avg={:.3}\n\
         Scale: min={:.6}, max={:.6}, avg={:.6}\n",
        path.display(),
        summary.record_count,
        opacity.min,
        opacity.max,
        opacity.mean,
        scale.min,
        scale.max,
        scale.mean
    );
    let (min, max) = (summary.bounds.min, summary.bounds.max);
    for (axis, lo, hi) in [("X", min.x, max.x), ("Y", min.y, max.y), ("Z", min.z, max.z)] {
        text.push_str(&format!("Bounds {axis}: [{lo:.3}, {hi:.3}]\n"));
    }
    text
}

pub(crate) fn run_info(args: &InfoArgs) -> anyhow::Result<()> {
    let bytes = read_ply(&args.ply)?;
    let summary = with_kind(splat_convert::inspect(&bytes), &args.ply)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary_text(&args.ply, &summary));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{convert_file, datapack_name, summary_text};
    use crate::test_util::write_ply;
    use splat_convert::{ConversionError, ConvertConfig, ErrorKind};
    use std::path::Path;

    #[test]
    fn names_from_file_stem() {
        assert_eq!(
            datapack_name(Path::new("scans/Old Bike.ply")).expect("Has a stem"),
            "Old Bike"
        );
        assert!(datapack_name(Path::new("/")).is_err());
    }

    #[test]
    fn converts_to_datapack() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let ply = write_ply(dir.path(), "Tree Line.ply", 4);
        let output = dir.path().join("out");

        let pack = convert_file(&ply, &output, &ConvertConfig::default()).expect("Converts");
        assert_eq!(pack.root, output.join("splat_tree_line"));
        assert_eq!(pack.function, "tree_line");
        assert_eq!(pack.commands, 4);

        let main = std::fs::read_to_string(pack.root.join("data/splats/function/tree_line.mcfunction"))
            .expect("Function written");
        assert_eq!(main.lines().filter(|l| l.starts_with("particle dust")).count(), 4);
    }

    #[test]
    fn reports_error_kind() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let ply = write_ply(dir.path(), "empty.ply", 0);

        let err = convert_file(&ply, dir.path(), &ConvertConfig::default())
            .err()
            .expect("Empty scene fails");
        assert_eq!(
            err.downcast_ref::<ConversionError>(),
            Some(&ConversionError::EmptyScene)
        );
        assert!(
            format!("{err}").contains(&ErrorKind::EmptyScene.to_string()),
            "{err}"
        );
    }

    #[test]
    fn info_text() {
        let dir = tempfile::tempdir().expect("Temp dir");
        let ply = write_ply(dir.path(), "line.ply", 3);
        let summary = splat_convert::inspect(&std::fs::read(&ply).expect("Readable"))
            .expect("Valid scene");
        let text = summary_text(Path::new("line.ply"), &summary);
        assert!(text.starts_with("File: line.ply\nSplats: 3\n"), "{text}");
        assert!(text.contains("Bounds X: [0.000, 2.000]"), "{text}");
        assert!(text.contains("Bounds Z: [0.000, 0.000]"), "{text}");
        assert!(text.contains("\nOpacity: min=0.881, max=0.881, avg=0.881\n"), "{text}");
        assert!(text.contains("\nScale: min=0.018316, max=0.018316, avg=0.018316\n"), "{text}");
        assert_eq!(text.lines().count(), 7, "{text}");
    }
}
