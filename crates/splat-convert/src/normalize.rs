use crate::splat::{NormalizedRecord, Scene};

/// Factor that fits the largest side of the scene bounds to `target_size`.
///
/// A scene without extent (a single splat, or all splats in one spot) is not
/// rescaled at all.
pub fn fit_scale_factor(max_extent: f64, target_size: f32) -> f64 {
    if max_extent > 0.0 {
        target_size as f64 / max_extent
    } else {
        1.0
    }
}

/// Center the scene on the origin and uniformly rescale it so it fits a cube
/// with sides of `target_size`. Splat radii are scaled by the same factor.
///
/// The output has the same length and order as the scene.
pub fn normalize(scene: &Scene, target_size: f32) -> Vec<NormalizedRecord> {
    let Some(bounds) = scene.bounds() else {
        return vec![];
    };

    // Work in doubles, scenes can sit far away from their own origin.
    let center = bounds.center();
    let factor = fit_scale_factor(bounds.extent().max_element(), target_size);

    log::debug!("Normalizing around {center} with factor {factor}");

    scene
        .records()
        .iter()
        .enumerate()
        .map(|(source_index, record)| NormalizedRecord {
            source_index,
            position: ((record.position.as_dvec3() - center) * factor).as_vec3(),
            color: record.color,
            opacity: record.opacity,
            scale: (record.scale as f64 * factor) as f32,
        })
        .collect()
}
