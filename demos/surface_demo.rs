//! Renders a value-colored surface with a colorbar to `surface.png`.

use chartgl::*;

fn main() -> Result<()> {
    init_logging();

    let n = 40;
    let mut vertices = Vec::with_capacity(n * n);
    let mut values = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let x = i as f64 / (n - 1) as f64 * 6.0 - 3.0;
            let y = j as f64 / (n - 1) as f64 * 6.0 - 3.0;
            let z = x.sin() * y.cos();
            vertices.push(DVec3::new(x, y, z));
            values.push(z);
        }
    }
    let mut triangles = Vec::new();
    for i in 0..n - 1 {
        for j in 0..n - 1 {
            let a = (i * n + j) as u32;
            let b = a + 1;
            let c = a + n as u32;
            let d = c + 1;
            triangles.push([a, c, d]);
            triangles.push([a, d, b]);
        }
    }

    let color_map = ColorMapRegistry::new()
        .get("viridis")
        .unwrap_or_else(|| ColorMap::new("gray", vec![Vec4::ZERO, Vec4::ONE]));
    let scheme = LegendScheme::continuous(color_map, Normalize::linear(-1.0, 1.0))?;

    let mut scene = Scene::new();
    scene.add_graphic(Graphic::new(
        Shape::Mesh {
            vertices,
            triangles,
            values: Some(values),
        },
        scheme.clone(),
    ));
    scene.set_title("sin(x) cos(y)");
    scene.set_legend(scheme, LegendOptions::default());

    render_to_file(&scene, "surface.png", 1024, 768)?;
    println!("wrote surface.png");
    Ok(())
}
