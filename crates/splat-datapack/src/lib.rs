//! Package particle commands as a Minecraft datapack.
//!
//! A datapack is a folder with a `pack.mcmeta` and a tree of function files. Dropping
//! it in a world's `datapacks/` folder makes `/function splats:<name>` available.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Datapack format understood by the game versions that use the `function` folder name.
pub const PACK_FORMAT: u32 = 48;

/// Namespace all splat functions live in.
pub const NAMESPACE: &str = "splats";

const HELP_FUNCTION: &str = "help";

#[derive(Debug, Error)]
pub enum DatapackError {
    #[error("Datapack name `{0}` has no usable characters")]
    InvalidName(String),

    #[error("Failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize datapack json")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct PackMeta {
    pack: PackInfo,
}

#[derive(Serialize)]
struct PackInfo {
    pack_format: u32,
    description: String,
}

/// A raw JSON text component, as used by `tellraw`.
#[derive(Serialize)]
struct TextComponent<'a> {
    text: String,
    color: &'a str,
}

/// Name usable as function and folder name. Function names only allow lowercase
/// ascii letters, digits and a few separators, everything else becomes `_`.
pub fn safe_name(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Folder the datapack for `name` is written to.
pub fn datapack_dir(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("splat_{}", safe_name(name)))
}

/// Contents of the function file that spawns every particle.
pub fn function_source(commands: &[String]) -> String {
    let mut source = format!(
        "# Generated by splat2mc\n# {} Gaussian splats\n\n",
        commands.len()
    );
    for command in commands {
        source.push_str(command);
        source.push('\n');
    }
    source
}

fn pack_meta(name: &str) -> Result<String, DatapackError> {
    let meta = PackMeta {
        pack: PackInfo {
            pack_format: PACK_FORMAT,
            description: format!("3D Gaussian Splat: {name}"),
        },
    };
    Ok(serde_json::to_string_pretty(&meta)? + "\n")
}

fn help_source(function: &str) -> Result<String, DatapackError> {
    let lines = [
        TextComponent {
            text: format!("Available splats: {function}"),
            color: "green",
        },
        TextComponent {
            text: format!("Run: /function {NAMESPACE}:{function}"),
            color: "gray",
        },
    ];
    let mut source = String::new();
    for line in &lines {
        source += &format!("tellraw @s {}\n", serde_json::to_string(line)?);
    }
    Ok(source)
}

fn write_file(path: &Path, contents: &str) -> Result<(), DatapackError> {
    std::fs::write(path, contents).map_err(|source| DatapackError::Io {
        path: path.to_owned(),
        source,
    })
}

/// Write `commands` as datapack `splat_<name>` into `output_dir`. An existing datapack
/// of the same name is overwritten. Returns the datapack folder.
pub fn write_datapack(
    name: &str,
    commands: &[String],
    output_dir: &Path,
) -> Result<PathBuf, DatapackError> {
    let function = safe_name(name);
    if !function.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err(DatapackError::InvalidName(name.to_owned()));
    }

    let root = datapack_dir(output_dir, name);
    let functions = root.join("data").join(NAMESPACE).join("function");
    std::fs::create_dir_all(&functions).map_err(|source| DatapackError::Io {
        path: functions.clone(),
        source,
    })?;

    write_file(&root.join("pack.mcmeta"), &pack_meta(name)?)?;
    write_file(
        &functions.join(format!("{function}.mcfunction")),
        &function_source(commands),
    )?;
    write_file(
        &functions.join(format!("{HELP_FUNCTION}.mcfunction")),
        &help_source(&function)?,
    )?;

    log::info!(
        "Wrote {} commands to datapack {}",
        commands.len(),
        root.display()
    );
    Ok(root)
}
