//! Random sampling helpers used by the camera and the integrator.

use std::f32::consts::PI;

use glint_math::{orthonormal_basis, Vec3};
use rand::{Rng, RngCore};

/// Uniform float in [0, 1).
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Cosine-weighted direction on the hemisphere around the unit normal `n`.
///
/// Samples the unit disk with `r = sqrt(u1)`, `theta = 2 pi u2`, lifts it to
/// `z = sqrt(1 - u1)` and rotates the result into the frame of `n`.
pub fn cosine_sample_hemisphere(n: Vec3, rng: &mut dyn RngCore) -> Vec3 {
    let u1 = gen_f32(rng);
    let u2 = gen_f32(rng);

    let r = u1.sqrt();
    let theta = 2.0 * PI * u2;
    let x = r * theta.cos();
    let y = r * theta.sin();
    let z = (1.0 - u1).max(0.0).sqrt();

    let (tangent, bitangent) = orthonormal_basis(n);
    tangent * x + bitangent * y + n * z
}

/// Uniform point inside the unit ball (rejection sampled).
pub fn random_in_unit_ball(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
        );
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}

/// Random offset in [-0.5, 0.5) x [-0.5, 0.5) for pixel jitter.
pub fn sample_square(rng: &mut dyn RngCore) -> (f32, f32) {
    (gen_f32(rng) - 0.5, gen_f32(rng) - 0.5)
}
