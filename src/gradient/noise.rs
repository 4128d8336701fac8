// ============================================================================
// NOISE FIELDS — 2D noise primitives and the warp dispatcher
// ============================================================================
//
// All primitives are pure functions of position. Noise functions return
// roughly `[0, 1]`; simplex is signed and centred on zero until remapped.

use crate::model::WarpShape;

#[inline]
pub(crate) fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

#[inline]
pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Lattice hash to `[0, 1)` (sine fract).
#[inline]
fn lattice_hash(ix: f64, iy: f64) -> f64 {
    let n = ix * 374_761_393.0 + iy * 668_265_263.0;
    let r = n.sin() * 43_758.545_3;
    r - r.floor()
}

/// Jittered feature point for a Worley/Voronoi cell.
#[inline]
fn feature_point(gx: f64, gy: f64) -> (f64, f64) {
    let s1 = (gx * 127.1 + gy * 311.7).sin() * 43_758.545_3;
    let s2 = (gx * 269.5 + gy * 183.3).sin() * 43_758.545_3;
    (gx + (s1 - s1.floor()), gy + (s2 - s2.floor()))
}

/// 2D simplex noise, signed, centred on zero.
pub fn simplex(x: f64, y: f64) -> f64 {
    let f2 = 0.5 * (3.0_f64.sqrt() - 1.0);
    let g2 = (3.0 - 3.0_f64.sqrt()) / 6.0;

    let s = (x + y) * f2;
    let i = (x + s).floor();
    let j = (y + s).floor();

    let t = (i + j) * g2;
    let x0 = x - (i - t);
    let y0 = y - (j - t);

    let (i1, j1) = if x0 > y0 { (1.0, 0.0) } else { (0.0, 1.0) };

    let x1 = x0 - i1 + g2;
    let y1 = y0 - j1 + g2;
    let x2 = x0 - 1.0 + 2.0 * g2;
    let y2 = y0 - 1.0 + 2.0 * g2;

    let corner = |dx: f64, dy: f64, hx: f64, hy: f64| -> f64 {
        let mut t = 0.5 - dx * dx - dy * dy;
        if t < 0.0 {
            return 0.0;
        }
        t *= t;
        t * t * (lattice_hash(hx, hy) * 2.0 - 1.0)
    };

    let n0 = corner(x0, y0, i, j);
    let n1 = corner(x1, y1, i + i1, j + j1);
    let n2 = corner(x2, y2, i + 1.0, j + 1.0);

    70.0 * (n0 + n1 + n2)
}

/// Bilinear value noise with smoothstep easing, `[0, 1)`.
pub fn value(x: f64, y: f64) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let sx = smoothstep(x - x0);
    let sy = smoothstep(y - y0);

    let n00 = lattice_hash(x0, y0);
    let n10 = lattice_hash(x0 + 1.0, y0);
    let n01 = lattice_hash(x0, y0 + 1.0);
    let n11 = lattice_hash(x0 + 1.0, y0 + 1.0);

    lerp(lerp(n00, n10, sx), lerp(n01, n11, sx), sy)
}

/// Fractal Brownian motion over simplex octaves, remapped to ~`[0, 1]`.
pub fn fbm(x: f64, y: f64, octaves: u32) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 0.5;
    let mut frequency = 1.0;
    for _ in 0..octaves {
        total += amplitude * simplex(x * frequency, y * frequency);
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    total * 0.5 + 0.5
}

/// Distance to the nearest and second-nearest feature points.
fn nearest_features(x: f64, y: f64) -> (f64, f64) {
    let xi = x.floor();
    let yi = y.floor();
    let mut d1 = f64::MAX;
    let mut d2 = f64::MAX;

    for oy in -1..=1 {
        for ox in -1..=1 {
            let (fx, fy) = feature_point(xi + ox as f64, yi + oy as f64);
            let d = ((fx - x) * (fx - x) + (fy - y) * (fy - y)).sqrt();
            if d < d1 {
                d2 = d1;
                d1 = d;
            } else if d < d2 {
                d2 = d;
            }
        }
    }
    (d1, d2)
}

/// Cellular (F1) noise.
pub fn worley(x: f64, y: f64) -> f64 {
    let (d1, _) = nearest_features(x, y);
    (d1 * 1.5).clamp(0.0, 1.0)
}

/// Cell-edge noise (F2 − F1).
pub fn voronoi(x: f64, y: f64) -> f64 {
    let (d1, d2) = nearest_features(x, y);
    ((d2 - d1) * 2.0).clamp(0.0, 1.0)
}

/// fBm sampled at a position offset by two other fBm fields.
pub fn domain_warp(x: f64, y: f64, strength: f64) -> f64 {
    let qx = fbm(x, y, 4);
    let qy = fbm(x + 5.2, y + 1.3, 4);
    fbm(x + strength * qx, y + strength * qy, 4)
}

pub fn waves(x: f64, y: f64, frequency: f64) -> f64 {
    ((x * frequency).sin() * (y * frequency).cos() + 1.0) * 0.5
}

/// Sample the warp field for raster pixel `(x, y)`.
///
/// `warp_scale` divides pixel coordinates before sampling, so larger values
/// give coarser features. The geometric fields divide a second time.
pub fn sample_warp(shape: WarpShape, x: f64, y: f64, warp_scale: f64) -> f64 {
    let nx = x / warp_scale;
    let ny = y / warp_scale;

    match shape {
        WarpShape::SimplexNoise => simplex(nx, ny) * 0.5 + 0.5,
        WarpShape::ValueNoise | WarpShape::SmoothNoise => value(nx, ny),
        WarpShape::WorleyNoise => worley(nx, ny),
        WarpShape::FbmNoise => fbm(nx, ny, 4),
        WarpShape::VoronoiNoise => voronoi(nx, ny),
        WarpShape::DomainWarping => domain_warp(nx, ny, 4.0),
        WarpShape::Waves => waves(nx, ny, 0.5),
        WarpShape::Circular => {
            let dx = nx / warp_scale - 0.5;
            let dy = ny / warp_scale - 0.5;
            (dx * dx + dy * dy).sqrt()
        }
        WarpShape::Oval => {
            let dx = (nx / warp_scale - 0.5) * 2.0;
            let dy = ny / warp_scale - 0.5;
            (dx * dx + dy * dy).sqrt()
        }
        WarpShape::Rows => ((ny * 0.5).sin() + 1.0) * 0.5,
        WarpShape::Columns => ((nx * 0.5).sin() + 1.0) * 0.5,
        WarpShape::Flat => 0.5,
        WarpShape::Gravity => ny / warp_scale / 10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_samples(f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
        let mut out = Vec::new();
        for j in 0..40 {
            for i in 0..40 {
                out.push(f(i as f64 * 0.173 - 3.1, j as f64 * 0.219 + 0.7));
            }
        }
        out
    }

    #[test]
    fn simplex_is_bounded_and_signed() {
        let samples = grid_samples(simplex);
        // Corner weights peak at 70 × 0.5⁴ per lattice point.
        assert!(samples.iter().all(|v| v.abs() <= 3.0 * 70.0 * 0.0625));
        assert!(samples.iter().any(|v| *v > 0.0));
        assert!(samples.iter().any(|v| *v < 0.0));
    }

    #[test]
    fn bounded_fields_stay_in_unit_interval() {
        for f in [value as fn(f64, f64) -> f64, worley, voronoi] {
            for v in grid_samples(f) {
                assert!((0.0..=1.0).contains(&v), "{v}");
            }
        }
        for v in grid_samples(|x, y| waves(x, y, 0.5)) {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn value_noise_hits_lattice_values() {
        // At integer coordinates the interpolation collapses to the hash.
        assert_eq!(value(3.0, 5.0), lattice_hash(3.0, 5.0));
    }

    #[test]
    fn flat_field_is_constant() {
        for (x, y) in [(0.0, 0.0), (120.0, 40.0), (999.0, 3.0)] {
            assert_eq!(sample_warp(WarpShape::Flat, x, y, 100.0), 0.5);
        }
    }

    #[test]
    fn rows_ignore_x_and_columns_ignore_y() {
        let a = sample_warp(WarpShape::Rows, 10.0, 50.0, 20.0);
        let b = sample_warp(WarpShape::Rows, 300.0, 50.0, 20.0);
        assert_eq!(a, b);
        let c = sample_warp(WarpShape::Columns, 50.0, 10.0, 20.0);
        let d = sample_warp(WarpShape::Columns, 50.0, 300.0, 20.0);
        assert_eq!(c, d);
    }

    #[test]
    fn every_shape_is_finite() {
        for shape in WarpShape::ALL {
            for (x, y) in [(0.0, 0.0), (17.0, 93.0), (640.0, 480.0)] {
                assert!(sample_warp(shape, x, y, 1.0).is_finite(), "{shape:?}");
                assert!(sample_warp(shape, x, y, 600.0).is_finite(), "{shape:?}");
            }
        }
    }

    #[test]
    fn fields_are_deterministic() {
        assert_eq!(fbm(1.25, -4.5, 4), fbm(1.25, -4.5, 4));
        assert_eq!(domain_warp(0.3, 0.9, 4.0), domain_warp(0.3, 0.9, 4.0));
    }
}
