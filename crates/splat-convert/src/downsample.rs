use crate::splat::NormalizedRecord;

/// Pick at most `max_count` splats, most opaque first.
///
/// Splats below `min_opacity` are dropped before ranking. Equal opacities keep their
/// input order, so the selection is reproducible. Opacity is only a proxy for how much
/// a splat contributes to the image, this makes no attempt at finding an optimal subset.
pub fn downsample(
    records: &[NormalizedRecord],
    max_count: usize,
    min_opacity: f32,
) -> Vec<NormalizedRecord> {
    let mut kept: Vec<_> = records
        .iter()
        .filter(|r| r.opacity >= min_opacity)
        .copied()
        .collect();

    let filtered = records.len() - kept.len();

    // Stable sort, ties stay in input order.
    kept.sort_by(|a, b| b.opacity.total_cmp(&a.opacity));
    kept.truncate(max_count);

    log::debug!(
        "Kept {} of {} splats ({filtered} below opacity {min_opacity})",
        kept.len(),
        records.len()
    );

    kept
}
