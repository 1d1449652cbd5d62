//! Evaluation grids for potential fields.

use nalgebra::Vector3;

/// Evenly spaced samples including both endpoints.
pub fn linspace(samples: usize, start: f64, end: f64) -> Vec<f64> {
    if samples < 2 {
        return vec![start];
    }
    let step = (end - start) / (samples - 1) as f64;
    (0..samples).map(|i| start + i as f64 * step).collect()
}

/// Tensor product grid with `x` running fastest and `z` slowest.
pub fn make_tensor_product_grid(x: &[f64], y: &[f64], z: &[f64]) -> Vec<Vector3<f64>> {
    let mut out = Vec::with_capacity(x.len() * y.len() * z.len());
    for &pz in z {
        for &py in y {
            for &px in x {
                out.push(Vector3::new(px, py, pz));
            }
        }
    }
    out
}

/// Points distributed over a sphere along the golden spiral.
pub fn make_sphere_grid(radius: f64, samples: usize, center: &Vector3<f64>) -> Vec<Vector3<f64>> {
    let golden_ratio = 0.5 * (1.0 + 5.0_f64.sqrt());
    (0..samples)
        .map(|i| {
            let phi = (1.0 - 2.0 * (i as f64 + 0.5) / samples as f64).acos();
            let theta = 2.0 * std::f64::consts::PI * (i as f64 + 0.5) / golden_ratio;
            center
                + radius
                    * Vector3::new(
                        theta.cos() * phi.sin(),
                        theta.sin() * phi.sin(),
                        phi.cos(),
                    )
        })
        .collect()
}
