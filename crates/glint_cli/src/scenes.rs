//! Built-in demo scenes.

use anyhow::Result;
use clap::ValueEnum;
use glint_math::Vec3;
use glint_renderer::{rgb8, Camera, Color, Material, Scene, SceneBuilder, Surface};

/// Demo scenes selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoScene {
    /// Closed box with coloured walls, a ceiling light, a mirror ball and a glass ball
    Cornell,
    /// Mirror sphere facing a large light
    Mirror,
    /// Tinted glass spheres on a floor under an open sky
    Glass,
}

impl DemoScene {
    /// Build the scene and a camera framing it.
    pub fn build(self) -> Result<(Scene, Camera)> {
        let (builder, camera) = match self {
            DemoScene::Cornell => cornell_box(),
            DemoScene::Mirror => mirror(),
            DemoScene::Glass => glass(),
        };
        Ok((builder.build()?, camera))
    }

    /// Suggested background for scenes that are open to the sky.
    pub fn background(self) -> Option<[f32; 3]> {
        match self {
            DemoScene::Glass => Some([0.6, 0.7, 0.9]),
            DemoScene::Cornell | DemoScene::Mirror => None,
        }
    }
}

fn cornell_box() -> (SceneBuilder, Camera) {
    let mut b = Scene::builder();
    let white = b.add_material(Material::diffuse(rgb8(186, 186, 186)));
    let red = b.add_material(Material::diffuse(rgb8(166, 13, 13)));
    let green = b.add_material(Material::diffuse(rgb8(31, 115, 38)));
    let light =
        b.add_material(Surface::new(Material::emissive(rgb8(255, 240, 210), 8.0)).double_sided());
    let mirror = b.add_material(Material::specular(rgb8(230, 230, 230), 0.95, 0.0));
    let glass = b.add_material(Material::dielectric(rgb8(235, 245, 255), 1.5, 0.0));

    let (lo, hi) = (-1.0, 1.0);
    let top = 2.0;

    // Floor, ceiling, back wall
    b.add_quad(
        Vec3::new(lo, 0.0, hi),
        Vec3::new(hi, 0.0, hi),
        Vec3::new(hi, 0.0, lo),
        Vec3::new(lo, 0.0, lo),
        white,
    );
    b.add_quad(
        Vec3::new(lo, top, lo),
        Vec3::new(hi, top, lo),
        Vec3::new(hi, top, hi),
        Vec3::new(lo, top, hi),
        white,
    );
    b.add_quad(
        Vec3::new(lo, 0.0, lo),
        Vec3::new(hi, 0.0, lo),
        Vec3::new(hi, top, lo),
        Vec3::new(lo, top, lo),
        white,
    );

    // Left (red) and right (green) walls
    b.add_quad(
        Vec3::new(lo, 0.0, hi),
        Vec3::new(lo, 0.0, lo),
        Vec3::new(lo, top, lo),
        Vec3::new(lo, top, hi),
        red,
    );
    b.add_quad(
        Vec3::new(hi, 0.0, lo),
        Vec3::new(hi, 0.0, hi),
        Vec3::new(hi, top, hi),
        Vec3::new(hi, top, lo),
        green,
    );

    // Ceiling light, just below the ceiling
    let (l, y) = (0.3, top - 0.01);
    b.add_quad(
        Vec3::new(-l, y, -l),
        Vec3::new(l, y, -l),
        Vec3::new(l, y, l),
        Vec3::new(-l, y, l),
        light,
    );

    b.add_sphere(Vec3::new(-0.45, 0.4, -0.35), 0.4, mirror);
    b.add_sphere(Vec3::new(0.45, 0.4, 0.25), 0.4, glass);

    let camera =
        Camera::look_at(Vec3::new(0.0, 1.0, 3.6), Vec3::new(0.0, 1.0, 0.0), Vec3::Y).with_fov(40.0);
    (b, camera)
}

fn mirror() -> (SceneBuilder, Camera) {
    let mut b = Scene::builder();
    let floor = b.add_material(Material::diffuse(Color::splat(0.5)));
    let chrome = b.add_material(Material::specular(Color::ONE, 1.0, 0.0));
    let brushed = b.add_material(Material::specular(rgb8(255, 200, 120), 0.8, 0.15));
    let light = b.add_material(Material::emissive(Color::ONE, 4.0));

    b.add_quad(
        Vec3::new(-20.0, 0.0, 20.0),
        Vec3::new(20.0, 0.0, 20.0),
        Vec3::new(20.0, 0.0, -20.0),
        Vec3::new(-20.0, 0.0, -20.0),
        floor,
    );
    b.add_sphere(Vec3::new(0.0, 1.0, 0.0), 1.0, chrome);
    b.add_sphere(Vec3::new(2.2, 0.6, 0.8), 0.6, brushed);
    b.add_sphere(Vec3::new(-3.0, 4.0, 4.0), 2.0, light);

    let camera =
        Camera::look_at(Vec3::new(0.0, 1.5, 6.0), Vec3::new(0.0, 0.8, 0.0), Vec3::Y).with_fov(45.0);
    (b, camera)
}

fn glass() -> (SceneBuilder, Camera) {
    let mut b = Scene::builder();
    let checker_a = b.add_material(Material::diffuse(rgb8(200, 200, 200)));
    let checker_b = b.add_material(Material::diffuse(rgb8(60, 60, 60)));
    let clear = b.add_material(Material::dielectric(Color::ONE, 1.5, 0.0));
    let amber = b.add_material(Material::dielectric(rgb8(255, 170, 60), 1.5, 0.0));
    let frosted = b.add_material(Material::dielectric(rgb8(150, 200, 255), 1.33, 0.2));

    // Checkerboard floor, one quad per cell
    let cells = 8;
    let size = 1.5;
    let half = cells as f32 * size / 2.0;
    for i in 0..cells {
        for j in 0..cells {
            let x0 = i as f32 * size - half;
            let z0 = j as f32 * size - half;
            let material = if (i + j) % 2 == 0 { checker_a } else { checker_b };
            b.add_quad(
                Vec3::new(x0, 0.0, z0 + size),
                Vec3::new(x0 + size, 0.0, z0 + size),
                Vec3::new(x0 + size, 0.0, z0),
                Vec3::new(x0, 0.0, z0),
                material,
            );
        }
    }

    b.add_sphere(Vec3::new(-1.6, 0.7, 0.0), 0.7, clear);
    b.add_sphere(Vec3::new(0.0, 0.7, -0.6), 0.7, amber);
    b.add_sphere(Vec3::new(1.6, 0.7, 0.0), 0.7, frosted);

    let camera =
        Camera::look_at(Vec3::new(0.0, 2.0, 5.5), Vec3::new(0.0, 0.5, 0.0), Vec3::Y).with_fov(40.0);
    (b, camera)
}
