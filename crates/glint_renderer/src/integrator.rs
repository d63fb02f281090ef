//! Recursive Monte Carlo path integrator.
//!
//! Paths terminate on lights, on misses, at the bounce cap, or through
//! Russian roulette. Opaque surfaces split energy between a mirror lobe and a
//! cosine-weighted diffuse lobe; dielectrics split between Fresnel-weighted
//! reflection and refraction with Beer-Lambert absorption inside the medium.

use glint_math::{reflect, refract, safe_normalize, Ray, Vec3};
use rand::RngCore;

use crate::hittable::HitRecord;
use crate::material::{energy_split, fresnel_dielectric};
use crate::sampling::{cosine_sample_hemisphere, gen_f32, random_in_unit_ball};
use crate::{Color, Material, RenderConfig, Scene};

/// Offset applied to secondary ray origins to escape the surface they leave.
pub const RAY_EPSILON: f32 = 1e-4;

/// Roulette survival probability bounds.
const MIN_SURVIVAL: f32 = 0.05;
const MAX_SURVIVAL: f32 = 0.95;

/// Estimate the radiance arriving along `ray`, scaled by `throughput`.
///
/// `depth` counts all bounces so far and `spec_depth` the chained mirror or
/// glass bounces. Primary rays start with `depth = 0`, `throughput = 1` and
/// `spec_depth = 0`. The result is never negative.
pub fn trace(
    ray: &Ray,
    scene: &Scene,
    depth: u32,
    throughput: Color,
    spec_depth: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> Color {
    trace_segment(ray, scene, depth, throughput, spec_depth, config, rng).0
}

/// Surface response after lights have been handled.
enum Lobe {
    Opaque {
        albedo: Color,
        reflectivity: f32,
        roughness: f32,
    },
    Glass {
        albedo: Color,
        ior: f32,
        roughness: f32,
    },
}

/// Like [`trace`], but also reports the distance to the first hit
/// (infinite on a miss) so refraction can attenuate by the path length.
fn trace_segment(
    ray: &Ray,
    scene: &Scene,
    depth: u32,
    throughput: Color,
    spec_depth: u32,
    config: &RenderConfig,
    rng: &mut dyn RngCore,
) -> (Color, f32) {
    let Some(rec) = scene.nearest_hit(ray) else {
        return (throughput * config.background_color(), f32::INFINITY);
    };

    let material = scene.surface(rec.material).material;
    let lobe = match material {
        Material::Emissive { color, strength } => return (throughput * color * strength, rec.t),
        Material::Diffuse { albedo } => Lobe::Opaque {
            albedo,
            reflectivity: 0.0,
            roughness: 0.0,
        },
        Material::Specular {
            albedo,
            reflectivity,
            roughness,
        } => Lobe::Opaque {
            albedo,
            reflectivity,
            roughness,
        },
        Material::Dielectric { albedo, ior, roughness } => Lobe::Glass { albedo, ior, roughness },
    };

    if depth >= config.max_bounces {
        return (throughput * material.albedo(), rec.t);
    }

    let mut throughput = throughput;
    if depth >= config.roulette_start_depth {
        let survival = throughput.max_element().clamp(MIN_SURVIVAL, MAX_SURVIVAL);
        if gen_f32(rng) >= survival {
            return (Color::ZERO, rec.t);
        }
        throughput /= survival;
    }

    let bounce = Bounce {
        scene,
        rec: &rec,
        incoming: safe_normalize(ray.direction()),
        depth: depth + 1,
        throughput,
        spec_depth,
        config,
    };

    let radiance = match lobe {
        _ if spec_depth >= config.max_specular_depth => bounce.diffuse(material.albedo(), 1.0, rng),
        Lobe::Opaque {
            albedo,
            reflectivity,
            roughness,
        } => {
            let (specular, diffuse) = energy_split(reflectivity);
            bounce.mirror(specular, roughness, rng) + bounce.diffuse(albedo, diffuse, rng)
        }
        Lobe::Glass { albedo, ior, roughness } => bounce.glass(albedo, ior, roughness, rng),
    };

    (radiance, rec.t)
}

/// Everything a scattering event needs to spawn child paths.
struct Bounce<'a> {
    scene: &'a Scene,
    rec: &'a HitRecord,
    incoming: Vec3,
    /// Depth of the child paths
    depth: u32,
    throughput: Color,
    spec_depth: u32,
    config: &'a RenderConfig,
}

impl Bounce<'_> {
    fn spawn(
        &self,
        origin: Vec3,
        direction: Vec3,
        weight: Color,
        spec_depth: u32,
        rng: &mut dyn RngCore,
    ) -> (Color, f32) {
        if weight.max_element() <= 0.0 {
            return (Color::ZERO, f32::INFINITY);
        }
        let ray = Ray::new(origin, direction);
        let throughput = self.throughput * weight;
        trace_segment(&ray, self.scene, self.depth, throughput, spec_depth, self.config, rng)
    }

    /// Origin on the side of the surface the ray arrived from.
    fn above(&self) -> Vec3 {
        self.rec.p + self.rec.normal * RAY_EPSILON
    }

    /// Origin on the far side of the surface.
    fn below(&self) -> Vec3 {
        self.rec.p - self.rec.normal * RAY_EPSILON
    }

    /// Cosine-sampled bounce weighted by `albedo * cos * share`.
    fn diffuse(&self, albedo: Color, share: f32, rng: &mut dyn RngCore) -> Color {
        if share <= 0.0 {
            return Color::ZERO;
        }
        let direction = cosine_sample_hemisphere(self.rec.normal, rng);
        let cos_theta = direction.dot(self.rec.normal).max(0.0);
        self.spawn(self.above(), direction, albedo * cos_theta * share, self.spec_depth, rng)
            .0
    }

    /// Mirror bounce carrying `share` of the energy.
    fn mirror(&self, share: f32, roughness: f32, rng: &mut dyn RngCore) -> Color {
        if share <= 0.0 {
            return Color::ZERO;
        }
        let direction = glossy_reflect(self.incoming, self.rec.normal, roughness, rng);
        self.spawn(self.above(), direction, Color::splat(share), self.spec_depth + 1, rng)
            .0
    }

    fn glass(&self, albedo: Color, ior: f32, roughness: f32, rng: &mut dyn RngCore) -> Color {
        let (eta_i, eta_t) = if self.rec.front_face { (1.0, ior) } else { (ior, 1.0) };
        let cos_i = (-self.incoming).dot(self.rec.normal).clamp(0.0, 1.0);
        let kr = fresnel_dielectric(cos_i, eta_i, eta_t);

        let mut radiance = self.mirror(kr, roughness, rng);

        if kr < 1.0 {
            if let Some(direction) = refract(self.incoming, self.rec.normal, eta_i / eta_t) {
                let weight = Color::splat(1.0 - kr);
                let direction = safe_normalize(direction);
                let (mut transmitted, distance) =
                    self.spawn(self.below(), direction, weight, self.spec_depth + 1, rng);

                // Entering the medium: absorb along the segment to the next hit
                if self.rec.front_face && distance.is_finite() {
                    transmitted *= beer_lambert(albedo, distance);
                }
                radiance += transmitted;
            }
        }

        radiance
    }
}

/// Mirror direction, jittered by `roughness` times a point in the unit ball.
fn glossy_reflect(incoming: Vec3, normal: Vec3, roughness: f32, rng: &mut dyn RngCore) -> Vec3 {
    let reflected = reflect(incoming, normal);
    if roughness > 0.0 {
        safe_normalize(reflected + roughness * random_in_unit_ball(rng))
    } else {
        reflected
    }
}

/// Transmittance `exp(-(1 - albedo) * distance)` per channel.
pub fn beer_lambert(albedo: Color, distance: f32) -> Color {
    let density = (Color::ONE - albedo).max(Color::ZERO);
    Color::new(
        (-density.x * distance).exp(),
        (-density.y * distance).exp(),
        (-density.z * distance).exp(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Surface;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn primary(scene: &Scene, ray: &Ray, config: &RenderConfig, rng: &mut StdRng) -> Color {
        trace(ray, scene, 0, Color::ONE, 0, config, rng)
    }

    fn enclosing_light(strength: f32) -> Scene {
        let mut builder = Scene::builder();
        let light = builder.add_material(Material::emissive(Color::ONE, strength));
        builder.add_sphere(Vec3::ZERO, 100.0, light);
        builder.build().unwrap()
    }

    #[test]
    fn test_empty_scene_is_black() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = RenderConfig::default();
        let c = primary(&Scene::empty(), &Ray::new(Vec3::ZERO, -Vec3::Z), &config, &mut rng);
        assert_eq!(c, Color::ZERO);
    }

    #[test]
    fn test_miss_returns_background() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = RenderConfig {
            background: [0.25, 0.5, 1.0],
            ..Default::default()
        };
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let c = trace(&ray, &Scene::empty(), 0, Color::splat(0.5), 0, &config, &mut rng);
        assert_eq!(c, Color::new(0.125, 0.25, 0.5));
    }

    #[test]
    fn test_light_returns_emission_exactly() {
        let mut rng = StdRng::seed_from_u64(2);
        let scene = enclosing_light(4.0);
        let config = RenderConfig::default();

        for dir in [Vec3::X, -Vec3::Y, Vec3::new(1.0, 2.0, 3.0).normalize()] {
            let c = primary(&scene, &Ray::new(Vec3::ZERO, dir), &config, &mut rng);
            assert_eq!(c, Color::splat(4.0));
        }
    }

    #[test]
    fn test_depth_cap_returns_albedo() {
        let mut builder = Scene::builder();
        let grey = builder.add_material(Material::diffuse(Color::new(0.2, 0.4, 0.6)));
        builder.add_sphere(Vec3::new(0.0, 0.0, -3.0), 1.0, grey);
        let scene = builder.build().unwrap();
        let config = RenderConfig::default();
        let mut rng = StdRng::seed_from_u64(3);

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let c = trace(&ray, &scene, config.max_bounces, Color::splat(0.5), 0, &config, &mut rng);
        assert!((c - Color::new(0.1, 0.2, 0.3)).length() < 1e-6);
    }

    #[test]
    fn test_diffuse_inside_light_is_bounded() {
        // Grey sphere inside a light: every bounce ends on the light or the albedo cap
        let mut builder = Scene::builder();
        let light = builder.add_material(Material::emissive(Color::ONE, 1.0));
        let grey = builder.add_material(Material::diffuse(Color::splat(0.5)));
        builder.add_sphere(Vec3::ZERO, 100.0, light);
        builder.add_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, grey);
        let scene = builder.build().unwrap();
        let config = RenderConfig::default();
        let mut rng = StdRng::seed_from_u64(4);

        let n = 20_000;
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let mut sum = Color::ZERO;
        for _ in 0..n {
            let c = primary(&scene, &ray, &config, &mut rng);
            assert!(c.min_element() >= 0.0 && c.is_finite());
            sum += c;
        }

        // Estimator of albedo * E[cos] = 0.5 * 2/3 for a fully lit hemisphere
        let mean = sum / n as f32;
        assert!((mean.x - 1.0 / 3.0).abs() < 0.02, "mean {mean}");
    }

    #[test]
    fn test_mirror_reflects_the_light() {
        let mut builder = Scene::builder();
        let light = builder.add_material(Material::emissive(Color::ONE, 2.0));
        let mirror = builder.add_material(Material::specular(Color::ONE, 1.0, 0.0));
        builder.add_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0, light);
        builder.add_quad(
            Vec3::new(-5.0, -5.0, -5.0),
            Vec3::new(5.0, -5.0, -5.0),
            Vec3::new(5.0, 5.0, -5.0),
            Vec3::new(-5.0, 5.0, -5.0),
            mirror,
        );
        let scene = builder.build().unwrap();
        let config = RenderConfig::default();
        let mut rng = StdRng::seed_from_u64(5);

        let c = primary(&scene, &Ray::new(Vec3::ZERO, -Vec3::Z), &config, &mut rng);
        assert_eq!(c, Color::splat(2.0));

        // Reflected ray passes beside the light
        let c = primary(&scene, &Ray::new(Vec3::new(3.0, 0.0, 0.0), -Vec3::Z), &config, &mut rng);
        assert_eq!(c, Color::ZERO);
    }

    #[test]
    fn test_specular_depth_cap_falls_back_to_diffuse() {
        // With a cap of 0 a perfect mirror under a white sky shades as diffuse
        let mut builder = Scene::builder();
        let mirror = builder.add_material(Material::specular(Color::splat(0.5), 1.0, 0.0));
        builder.add_quad(
            Vec3::new(-5.0, -5.0, -5.0),
            Vec3::new(5.0, -5.0, -5.0),
            Vec3::new(5.0, 5.0, -5.0),
            Vec3::new(-5.0, 5.0, -5.0),
            mirror,
        );
        let scene = builder.build().unwrap();
        let config = RenderConfig {
            max_specular_depth: 0,
            background: [1.0, 1.0, 1.0],
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(6);

        let n = 20_000;
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let sum: Color = (0..n).map(|_| primary(&scene, &ray, &config, &mut rng)).sum();

        // Diffuse estimator under a white sky: albedo * E[cos] = 0.5 * 2/3
        let mean = sum / n as f32;
        assert!((mean.x - 1.0 / 3.0).abs() < 0.02, "mean {mean}");
    }

    #[test]
    fn test_roulette_kills_dim_paths_unbiased() {
        let scene = enclosing_light(1.0);
        let config = RenderConfig::default();
        let mut rng = StdRng::seed_from_u64(7);

        // Beyond the roulette depth, throughput 0.01 survives 5% of the time
        let n = 40_000;
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        // Lights return before roulette, so nothing is lost
        for _ in 0..1000 {
            let c = trace(&ray, &scene, 5, Color::splat(0.01), 0, &config, &mut rng);
            assert_eq!(c, Color::splat(0.01));
        }

        // A grey sphere is hit first, so roulette applies
        let mut builder = Scene::builder();
        let grey = builder.add_material(Material::diffuse(Color::splat(0.5)));
        let light = builder.add_material(Material::emissive(Color::ONE, 1.0));
        builder.add_sphere(Vec3::ZERO, 100.0, light);
        builder.add_sphere(Vec3::new(0.0, 5.0, 0.0), 1.0, grey);
        let scene = builder.build().unwrap();

        let mut killed = 0;
        for _ in 0..n {
            if trace(&ray, &scene, 5, Color::splat(0.01), 0, &config, &mut rng) == Color::ZERO {
                killed += 1;
            }
        }
        let survival = 1.0 - killed as f32 / n as f32;
        assert!((survival - 0.05).abs() < 0.01, "survival {survival}");
    }

    #[test]
    fn test_roulette_survivors_are_reweighted() {
        // Grey sphere under a uniform light, traced past the roulette depth.
        // Half the paths die, survivors carry twice the weight.
        let mut builder = Scene::builder();
        let grey = builder.add_material(Material::diffuse(Color::splat(0.5)));
        let light = builder.add_material(Material::emissive(Color::ONE, 1.0));
        builder.add_sphere(Vec3::ZERO, 100.0, light);
        builder.add_sphere(Vec3::new(0.0, 5.0, 0.0), 1.0, grey);
        let scene = builder.build().unwrap();
        let config = RenderConfig::default();
        let mut rng = StdRng::seed_from_u64(12);

        let depth = config.roulette_start_depth + 1;
        assert!(depth < config.max_bounces);

        let n = 40_000;
        let ray = Ray::new(Vec3::ZERO, Vec3::Y);
        let mut killed = 0;
        let mut sum = Color::ZERO;
        for _ in 0..n {
            let c = trace(&ray, &scene, depth, Color::splat(0.5), 0, &config, &mut rng);
            if c == Color::ZERO {
                killed += 1;
            }
            sum += c;
        }

        let kill_rate = killed as f32 / n as f32;
        assert!((kill_rate - 0.5).abs() < 0.02, "kill rate {kill_rate}");

        // Same expectation as without roulette: throughput * albedo * E[cos]
        let mean = sum / n as f32;
        let expected = 0.5 * 0.5 * 2.0 / 3.0;
        assert!((mean.x - expected).abs() < 0.01, "mean {mean}, expected {expected}");
    }

    #[test]
    fn test_clear_glass_sphere_transmits_most_light() {
        let mut builder = Scene::builder();
        let glass = builder.add_material(Material::dielectric(Color::ONE, 1.5, 0.0));
        builder.add_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, glass);
        let scene = builder.build().unwrap();
        let config = RenderConfig {
            background: [1.0, 1.0, 1.0],
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(8);

        let n = 2_000;
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let sum: Color = (0..n).map(|_| primary(&scene, &ray, &config, &mut rng)).sum();
        let mean = sum / n as f32;

        // Clear glass under a uniform sky conserves energy
        assert!((mean.x - 1.0).abs() < 0.05, "mean {mean}");
    }

    #[test]
    fn test_tinted_glass_absorbs() {
        let mut builder = Scene::builder();
        let glass = builder.add_material(Material::dielectric(Color::new(1.0, 0.2, 0.2), 1.5, 0.0));
        builder.add_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0, glass);
        let scene = builder.build().unwrap();
        let config = RenderConfig {
            background: [1.0, 1.0, 1.0],
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(9);

        let n = 2_000;
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let sum: Color = (0..n).map(|_| primary(&scene, &ray, &config, &mut rng)).sum();
        let mean = sum / n as f32;

        // Through the centre: path length 2, transmittance exp(-0.8 * 2) in g and b
        assert!(mean.x > 0.9);
        assert!(mean.y < 0.4 && mean.z < 0.4, "mean {mean}");
    }

    #[test]
    fn test_beer_lambert() {
        assert_eq!(beer_lambert(Color::ONE, 10.0), Color::ONE);
        let t = beer_lambert(Color::new(0.5, 0.0, 2.0), 2.0);
        assert!((t.x - (-1.0f32).exp()).abs() < 1e-6);
        assert!((t.y - (-2.0f32).exp()).abs() < 1e-6);
        assert_eq!(t.z, 1.0);
    }

    #[test]
    fn test_glossy_reflect_stays_unit_length() {
        let mut rng = StdRng::seed_from_u64(10);
        let incoming = Vec3::new(1.0, -1.0, 0.0).normalize();
        let mirrored = glossy_reflect(incoming, Vec3::Y, 0.0, &mut rng);
        assert!((mirrored - Vec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-6);
        for _ in 0..100 {
            let d = glossy_reflect(incoming, Vec3::Y, 0.3, &mut rng);
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_double_sided_light_seen_from_behind() {
        let mut builder = Scene::builder();
        let id =
            builder.add_material(Surface::new(Material::emissive(Color::ONE, 3.0)).double_sided());
        builder.add_triangle(
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(0.0, 1.0, -1.0),
            id,
        );
        let scene = builder.build().unwrap();

        let mut rng = StdRng::seed_from_u64(11);
        let config = RenderConfig::default();
        let from_back = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);
        assert_eq!(primary(&scene, &from_back, &config, &mut rng), Color::splat(3.0));
    }
}
