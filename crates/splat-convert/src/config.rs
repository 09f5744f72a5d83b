use clap::Args;

use crate::command::CoordinateMode;
use crate::error::ConversionError;

pub const DEFAULT_MAX_PARTICLES: usize = 5000;
pub const DEFAULT_TARGET_SIZE: f32 = 10.0;
pub const DEFAULT_MIN_OPACITY: f32 = 0.1;

fn parse_max_particles(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Max particles must be at least 1".to_owned()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Invalid max particles '{s}': {e}")),
    }
}

#[derive(Clone, Debug, Args, PartialEq)]
pub struct ConvertConfig {
    /// Maximum number of particles to emit. The most opaque splats are kept.
    #[arg(
        short = 'n',
        long,
        help_heading = "Conversion Options",
        default_value = "5000",
        value_parser = parse_max_particles
    )]
    pub max_particles: usize,
    /// Edge length of the cube (in blocks) the splat is fitted into.
    #[arg(
        short = 's',
        long = "size",
        help_heading = "Conversion Options",
        default_value = "10.0"
    )]
    pub target_size: f32,
    /// Splats less opaque than this are skipped.
    #[arg(long, help_heading = "Conversion Options", default_value = "0.1")]
    pub min_opacity: f32,
    /// Whether particles are placed relative to the executing position.
    #[arg(
        long,
        help_heading = "Conversion Options",
        value_enum,
        default_value_t = CoordinateMode::Relative
    )]
    pub coordinates: CoordinateMode,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            max_particles: DEFAULT_MAX_PARTICLES,
            target_size: DEFAULT_TARGET_SIZE,
            min_opacity: DEFAULT_MIN_OPACITY,
            coordinates: CoordinateMode::default(),
        }
    }
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<(), ConversionError> {
        if self.max_particles == 0 {
            return Err(ConversionError::InvalidParameter(
                "max particles must be at least 1".to_owned(),
            ));
        }
        if !(self.target_size.is_finite() && self.target_size > 0.0) {
            return Err(ConversionError::InvalidParameter(format!(
                "target size must be a positive number, got {}",
                self.target_size
            )));
        }
        if !(0.0..=1.0).contains(&self.min_opacity) {
            return Err(ConversionError::InvalidParameter(format!(
                "min opacity must be within [0, 1], got {}",
                self.min_opacity
            )));
        }
        Ok(())
    }
}
