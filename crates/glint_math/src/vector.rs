//! Small vector helpers shared by the intersection kernels and the integrator.

use crate::Vec3;

/// Direction returned by [`safe_normalize`] for zero-length or non-finite input.
pub const FALLBACK_DIRECTION: Vec3 = Vec3::Z;

/// Normalize `v`, falling back to [`FALLBACK_DIRECTION`] instead of producing NaN.
#[inline]
pub fn safe_normalize(v: Vec3) -> Vec3 {
    v.try_normalize().unwrap_or(FALLBACK_DIRECTION)
}

/// Mirror `v` about the normal `n` (n must be unit length).
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract the unit vector `uv` through a surface with unit normal `n`
/// facing against `uv`, where `eta` is the ratio n_incident / n_transmitted.
///
/// Returns `None` on total internal reflection.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let cos_i = (-uv).dot(n).min(1.0);
    let sin2_t = eta * eta * (1.0 - cos_i * cos_i).max(0.0);
    if sin2_t >= 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin2_t).sqrt();
    Some(eta * uv + (eta * cos_i - cos_t) * n)
}

/// Build two unit tangents completing `n` to a right-handed orthonormal frame.
///
/// Branchless construction from Duff et al., "Building an Orthonormal Basis,
/// Revisited" (JCGT 2017).
#[inline]
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = 1.0f32.copysign(n.z);
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);
    (tangent, bitangent)
}
