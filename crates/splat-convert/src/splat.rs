use glam::{DVec3, Vec3};
use serde::Serialize;

/// A single decoded splat.
///
/// Color and opacity are already in display space. The anisotropic scale of the
/// source splat is collapsed into one effective radius, rotation is dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplatRecord {
    pub position: Vec3,
    pub color: [f32; 3],
    pub opacity: f32,
    pub scale: f32,
}

/// A splat after it has been fitted into the output volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRecord {
    /// Index of the [`SplatRecord`] this was derived from.
    pub source_index: usize,
    pub position: Vec3,
    pub color: [f32; 3],
    pub opacity: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        points.into_iter().fold(None, |bounds, p| {
            Some(match bounds {
                None => Self { min: p, max: p },
                Some(b) => Self {
                    min: b.min.min(p),
                    max: b.max.max(p),
                },
            })
        })
    }

    pub fn center(&self) -> DVec3 {
        (self.min.as_dvec3() + self.max.as_dvec3()) * 0.5
    }

    pub fn extent(&self) -> DVec3 {
        self.max.as_dvec3() - self.min.as_dvec3()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

impl ValueRange {
    fn from_values(values: impl ExactSizeIterator<Item = f32>) -> Option<Self> {
        let count = values.len();
        if count == 0 {
            return None;
        }
        let (min, max, sum) = values.fold(
            (f32::INFINITY, f32::NEG_INFINITY, 0.0f64),
            |(min, max, sum), v| (min.min(v), max.max(v), sum + v as f64),
        );
        Some(Self {
            min,
            max,
            mean: (sum / count as f64) as f32,
        })
    }
}

/// Read-only statistics of a parsed scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSummary {
    pub record_count: usize,
    pub bounds: Bounds,
    pub opacity: ValueRange,
    pub scale: ValueRange,
}

/// The full set of splats decoded from one file. Never modified after parsing.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    records: Vec<SplatRecord>,
}

impl Scene {
    pub fn new(records: Vec<SplatRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[SplatRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.records.iter().map(|r| r.position))
    }

    pub fn summary(&self) -> Option<SceneSummary> {
        Some(SceneSummary {
            record_count: self.len(),
            bounds: self.bounds()?,
            opacity: ValueRange::from_values(self.records.iter().map(|r| r.opacity))?,
            scale: ValueRange::from_values(self.records.iter().map(|r| r.scale))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Bounds, Scene, SplatRecord};
    use assert_approx_eq::assert_approx_eq;
    use glam::Vec3;

    fn record(position: Vec3, opacity: f32, scale: f32) -> SplatRecord {
        SplatRecord {
            position,
            color: [0.5; 3],
            opacity,
            scale,
        }
    }

    #[test]
    fn bounds_of_nothing() {
        assert!(Bounds::from_points(Vec::<Vec3>::new()).is_none());
        assert!(Scene::default().summary().is_none());
    }

    #[test]
    fn bounds_center_and_extent() {
        let bounds = Bounds::from_points([
            glam::vec3(-1.0, 2.0, 10.0),
            glam::vec3(3.0, 4.0, 10.0),
            glam::vec3(0.0, -2.0, 10.0),
        ])
        .expect("Non empty");
        assert_eq!(bounds.min, glam::vec3(-1.0, -2.0, 10.0));
        assert_eq!(bounds.max, glam::vec3(3.0, 4.0, 10.0));
        assert_eq!(bounds.center(), glam::dvec3(1.0, 1.0, 10.0));
        assert_eq!(bounds.extent(), glam::dvec3(4.0, 6.0, 0.0));
    }

    #[test]
    fn summary_ranges() {
        let scene = Scene::new(vec![
            record(Vec3::ZERO, 0.2, 1.0),
            record(Vec3::ONE, 0.8, 3.0),
        ]);
        let summary = scene.summary().expect("Non empty");
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.opacity.min, 0.2);
        assert_eq!(summary.opacity.max, 0.8);
        assert_approx_eq!(summary.opacity.mean, 0.5);
        assert_approx_eq!(summary.scale.mean, 2.0);
    }
}
