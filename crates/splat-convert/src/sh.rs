use glam::Vec3;

/// Normalization constant of the zeroth order SH basis, `1 / (2 * sqrt(pi))`.
pub const SH_C0: f32 = 0.282_094_8;

/// Decode a single DC coefficient to a display channel in [0, 1].
pub fn sh_to_channel(coeff: f32) -> f32 {
    (0.5 + SH_C0 * coeff).clamp(0.0, 1.0)
}

/// Decode the view independent base color of a splat. Higher SH bands are not
/// considered, the result is what the splat looks like "on average".
pub fn sh_to_rgb(sh_dc: Vec3) -> [f32; 3] {
    [
        sh_to_channel(sh_dc.x),
        sh_to_channel(sh_dc.y),
        sh_to_channel(sh_dc.z),
    ]
}

pub fn channel_to_sh(rgb: f32) -> f32 {
    (rgb - 0.5) / SH_C0
}

pub fn rgb_to_sh(rgb: Vec3) -> Vec3 {
    glam::vec3(
        channel_to_sh(rgb.x),
        channel_to_sh(rgb.y),
        channel_to_sh(rgb.z),
    )
}
