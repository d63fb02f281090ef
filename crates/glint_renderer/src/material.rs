//! Surface materials.
//!
//! A material is a closed set of variants matched exhaustively by the
//! integrator. Whether a triangle is visible from behind is a property of the
//! [`Surface`] wrapping the material, not of the variant.

use glint_math::Vec3;

/// Color type alias (linear RGB, 0-1 per channel)
pub type Color = Vec3;

/// Convert an 8-bit color (0-255 per channel) to a linear 0-1 [`Color`].
pub fn rgb8(r: u8, g: u8, b: u8) -> Color {
    Color::new(r as f32, g as f32, b as f32) / 255.0
}

/// How light interacts with a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Lambertian surface.
    Diffuse { albedo: Color },
    /// Opaque surface splitting energy between a mirror lobe and a diffuse lobe.
    Specular {
        albedo: Color,
        /// Fraction of energy sent along the mirror direction, in [0, 1].
        reflectivity: f32,
        /// 0 = perfect mirror; larger values jitter the reflected direction.
        roughness: f32,
    },
    /// Glass-like surface with Fresnel-weighted reflection and refraction.
    Dielectric {
        /// Absorption tint applied inside the medium.
        albedo: Color,
        /// Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
        ior: f32,
        roughness: f32,
    },
    /// Light source. Terminates every path that reaches it.
    Emissive { color: Color, strength: f32 },
}

impl Material {
    /// Create a Lambertian material with the given albedo color.
    pub fn diffuse(albedo: Color) -> Self {
        Material::Diffuse { albedo }
    }

    /// Create an opaque reflective material.
    ///
    /// - `reflectivity`: share of energy reflected specularly, clamped to [0, 1]
    /// - `roughness`: 0.0 = perfect mirror, clamped to be non-negative
    pub fn specular(albedo: Color, reflectivity: f32, roughness: f32) -> Self {
        Material::Specular {
            albedo,
            reflectivity: reflectivity.clamp(0.0, 1.0),
            roughness: roughness.max(0.0),
        }
    }

    /// Create a dielectric (glass) material.
    pub fn dielectric(albedo: Color, ior: f32, roughness: f32) -> Self {
        Material::Dielectric {
            albedo,
            ior,
            roughness: roughness.max(0.0),
        }
    }

    /// Create a light-emitting material.
    pub fn emissive(color: Color, strength: f32) -> Self {
        Material::Emissive { color, strength }
    }

    /// Base reflected color of the surface (emission color for lights).
    pub fn albedo(&self) -> Color {
        match *self {
            Material::Diffuse { albedo }
            | Material::Specular { albedo, .. }
            | Material::Dielectric { albedo, .. } => albedo,
            Material::Emissive { color, .. } => color,
        }
    }
}

/// Split an opaque surface's energy into (specular weight, diffuse weight).
///
/// The two weights always sum to one.
#[inline]
pub fn energy_split(reflectivity: f32) -> (f32, f32) {
    (reflectivity, 1.0 - reflectivity)
}

/// Unpolarised Fresnel reflectance at a dielectric interface.
///
/// `cos_theta_i` is the cosine between the incoming direction and the normal
/// on the incident side; `eta_i` and `eta_t` are the indices of refraction on
/// the incident and transmitted sides. Returns 1 on total internal reflection.
pub fn fresnel_dielectric(cos_theta_i: f32, eta_i: f32, eta_t: f32) -> f32 {
    let cos_theta_i = cos_theta_i.clamp(0.0, 1.0);

    // Snell's law for the transmitted sine
    let sin_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0).sqrt();
    let sin_theta_t = eta_i / eta_t * sin_theta_i;
    if sin_theta_t >= 1.0 {
        return 1.0;
    }
    let cos_theta_t = (1.0 - sin_theta_t * sin_theta_t).max(0.0).sqrt();

    let r_parallel = ((eta_t * cos_theta_i) - (eta_i * cos_theta_t))
        / ((eta_t * cos_theta_i) + (eta_i * cos_theta_t));
    let r_perp = ((eta_i * cos_theta_i) - (eta_t * cos_theta_t))
        / ((eta_i * cos_theta_i) + (eta_t * cos_theta_t));

    (r_parallel * r_parallel + r_perp * r_perp) / 2.0
}

/// Index into a scene's material table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

impl MaterialId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A material plus the per-surface flags that do not affect shading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub material: Material,
    /// When false, triangles using this surface are invisible from behind.
    pub double_sided: bool,
}

impl Surface {
    /// Single-sided surface.
    pub fn new(material: Material) -> Self {
        Self {
            material,
            double_sided: false,
        }
    }

    /// Make the surface visible from both sides.
    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }
}

impl From<Material> for Surface {
    fn from(material: Material) -> Self {
        Surface::new(material)
    }
}
