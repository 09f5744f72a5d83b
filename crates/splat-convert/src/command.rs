use std::fmt;

use clap::ValueEnum;
use glam::Vec3;

use crate::splat::NormalizedRecord;

/// Particle spawned for every splat.
pub const PARTICLE_KIND: &str = "dust";

/// Splat radius (in blocks) to dust particle size.
pub const PARTICLE_SIZE_PER_BLOCK: f32 = 50.0;

/// Range of sizes the dust particle accepts.
pub const MIN_PARTICLE_SIZE: f32 = 0.1;
pub const MAX_PARTICLE_SIZE: f32 = 4.0;

#[derive(
    Default, ValueEnum, Clone, Copy, Eq, PartialEq, Debug, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CoordinateMode {
    /// Offsets from the executing position (`~x ~y ~z`).
    #[default]
    Relative,
    /// World coordinates.
    Absolute,
}

pub fn particle_size(scale: f32) -> f32 {
    (scale * PARTICLE_SIZE_PER_BLOCK).clamp(MIN_PARTICLE_SIZE, MAX_PARTICLE_SIZE)
}

/// One `particle` command. Formats to the exact line the game expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleCommand {
    pub position: Vec3,
    pub color: [f32; 3],
    pub size: f32,
    pub mode: CoordinateMode,
}

impl ParticleCommand {
    pub fn from_record(record: &NormalizedRecord, mode: CoordinateMode) -> Self {
        Self {
            position: record.position,
            color: record.color.map(|c| c.clamp(0.0, 1.0)),
            size: particle_size(record.scale),
            mode,
        }
    }
}

impl fmt::Display for ParticleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.color;
        let prefix = match self.mode {
            CoordinateMode::Relative => "~",
            CoordinateMode::Absolute => "",
        };
        let Vec3 { x, y, z } = self.position;
        write!(
            f,
            "particle {PARTICLE_KIND}{{color:[{r:.3},{g:.3},{b:.3}],scale:{:.2}}} \
             {prefix}{x:.3} {prefix}{y:.3} {prefix}{z:.3} 0 0 0 0 1 force",
            self.size
        )
    }
}

/// Format one command per record, keeping the order of `records`.
pub fn generate_commands(records: &[NormalizedRecord], mode: CoordinateMode) -> Vec<String> {
    records
        .iter()
        .map(|r| ParticleCommand::from_record(r, mode).to_string())
        .collect()
}
