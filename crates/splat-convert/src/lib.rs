//! Turn gaussian splat ply files into particle commands.
//!
//! The pipeline is parse -> normalize -> downsample -> generate commands. Every stage
//! is a pure function over the output of the previous one.

pub mod command;
pub mod config;
pub mod downsample;
pub mod error;
pub mod normalize;
pub mod ply;
pub mod sh;
pub mod splat;

#[cfg(test)]
mod tests;

pub use command::{CoordinateMode, ParticleCommand, generate_commands};
pub use config::ConvertConfig;
pub use downsample::downsample;
pub use error::{ConversionError, ErrorKind};
pub use normalize::normalize;
pub use ply::parse_ply;
pub use splat::{Bounds, NormalizedRecord, Scene, SceneSummary, SplatRecord, ValueRange};

/// Decode all splats in a ply file. Fails with [`ConversionError::EmptyScene`] if the
/// file is valid but contains no splats.
pub fn parse_scene(input: &[u8]) -> Result<Scene, ConversionError> {
    let scene = tracing::trace_span!("ParsePly").in_scope(|| parse_ply(input))?;
    if scene.is_empty() {
        return Err(ConversionError::EmptyScene);
    }
    Ok(scene)
}

/// Convert a ply file to particle commands with relative coordinates.
pub fn convert(
    input: &[u8],
    max_particles: usize,
    target_size: f32,
    min_opacity: f32,
) -> Result<Vec<String>, ConversionError> {
    convert_with_config(
        input,
        &ConvertConfig {
            max_particles,
            target_size,
            min_opacity,
            coordinates: CoordinateMode::Relative,
        },
    )
}

/// Convert a ply file to particle commands, most opaque splat first.
///
/// An empty command list is a valid result, it means no splat passed the opacity
/// threshold.
pub fn convert_with_config(
    input: &[u8],
    config: &ConvertConfig,
) -> Result<Vec<String>, ConversionError> {
    config.validate()?;

    let scene = parse_scene(input)?;
    log::info!("Loaded {} splats", scene.len());

    let normalized = tracing::trace_span!("Normalize")
        .in_scope(|| normalize::normalize(&scene, config.target_size));

    let selected = tracing::trace_span!("Downsample").in_scope(|| {
        downsample::downsample(&normalized, config.max_particles, config.min_opacity)
    });

    if selected.is_empty() {
        log::warn!(
            "No splats left after filtering with min opacity {}",
            config.min_opacity
        );
    } else {
        log::info!("Generating {} particle commands", selected.len());
    }

    Ok(tracing::trace_span!("GenerateCommands")
        .in_scope(|| command::generate_commands(&selected, config.coordinates)))
}

/// Statistics of a ply file, without normalizing or downsampling it.
pub fn inspect(input: &[u8]) -> Result<SceneSummary, ConversionError> {
    parse_scene(input)?
        .summary()
        .ok_or(ConversionError::EmptyScene)
}
