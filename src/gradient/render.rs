// ============================================================================
// GRADIENT RASTER — supersampled, row-parallel, cancellable
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use image::{ImageError, RgbaImage};
use rayon::prelude::*;

use super::color::{Palette, Rgb};
use super::noise::{sample_warp, smoothstep};
use super::rng::Rng;
use crate::model::{AnchorPoint, GradientConfig, GradientMode};

pub const DEFAULT_QUALITY: f64 = 1.5;
pub const MIN_QUALITY: f64 = 1.0;
pub const MAX_QUALITY: f64 = 3.0;

const SHARP_EXPONENT: i32 = 3;
const MESH_CELLS: f64 = 4.0;
const MESH_JITTER: f64 = 0.3;
const GRAIN_RANGE: f64 = 20.0;

#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// Supersample multiplier, clamped to `[1, 3]`.
    pub quality_scale: f64,
    /// Checked once per scanline; when set the render is abandoned.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            quality_scale: DEFAULT_QUALITY,
            cancel: None,
        }
    }
}

impl RenderOptions {
    pub fn with_quality(quality_scale: f64) -> Self {
        Self {
            quality_scale,
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn scale(&self) -> f64 {
        if self.quality_scale.is_finite() {
            self.quality_scale.clamp(MIN_QUALITY, MAX_QUALITY)
        } else {
            DEFAULT_QUALITY
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }
}

/// Render output together with its encoded form.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientAsset {
    /// Raster width in pixels (after supersampling).
    pub width: u32,
    pub height: u32,
    /// Supersample factor that was applied to the requested size.
    pub scale: f64,
    /// PNG-encoded pixels.
    pub png: Vec<u8>,
}

impl GradientAsset {
    pub fn byte_len(&self) -> usize {
        self.png.len()
    }
}

/// Config values with every range clamped, resolved once per render.
struct Params<'a> {
    mode: GradientMode,
    config: &'a GradientConfig,
    warp_scale: f64,
    warp_strength: f64,
    noise_amount: f64,
    palette: Palette,
    anchors: Option<&'a [AnchorPoint]>,
    seed: u32,
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v } else { fallback }
}

impl<'a> Params<'a> {
    fn new(config: &'a GradientConfig) -> Self {
        Self {
            mode: config.mode,
            config,
            warp_scale: finite_or(config.warp_scale, 200.0).clamp(1.0, 600.0),
            warp_strength: finite_or(config.warp_strength, 0.0).clamp(0.0, 1.0),
            noise_amount: finite_or(config.noise_amount, 0.0).clamp(0.0, 0.5),
            palette: Palette::new(&config.colors),
            anchors: config.active_points(),
            seed: config.seed as u32,
        }
    }
}

/// Render the gradient described by `config` for a `width × height` target.
///
/// The raster is `floor(size × quality)` on each axis. Returns `None` if the
/// cancel flag was raised before the last row finished.
pub fn render_gradient(
    config: &GradientConfig,
    width: u32,
    height: u32,
    opts: &RenderOptions,
) -> Option<RgbaImage> {
    let scale = opts.scale();
    let w = (width as f64 * scale).floor() as usize;
    let h = (height as f64 * scale).floor() as usize;
    if opts.is_cancelled() {
        return None;
    }
    if w == 0 || h == 0 {
        return Some(RgbaImage::new(w as u32, h as u32));
    }

    let params = Params::new(config);
    let stride = w * 4;
    let mut raw = vec![0u8; stride * h];

    raw.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        if opts.is_cancelled() {
            return;
        }
        render_row(&params, y, w, h, row);
    });

    if opts.is_cancelled() {
        return None;
    }
    RgbaImage::from_raw(w as u32, h as u32, raw)
}

fn render_row(p: &Params<'_>, y: usize, w: usize, h: usize, row: &mut [u8]) {
    let mut rng = Rng::for_stream(p.seed, y as u32);
    let wf = w as f64;
    let hf = h as f64;

    for x in 0..w {
        let xf = x as f64;
        let n = sample_warp(p.config.warp_shape, xf, y as f64, p.warp_scale);
        let warp = (n - 0.5) * 2.0 * p.warp_strength * hf * 0.3;
        let gy = y as f64 + warp;

        // Mesh modes draw their jitter before anything else so the stream
        // layout is the same with and without anchors.
        let base = base_position(p.mode, xf, gy, wf, hf, &mut rng);

        let px = x * 4;
        let out = &mut row[px..px + 4];

        if let Some(anchors) = p.anchors {
            let (a, b, t) = anchor_blend(anchors, xf / wf, gy / hf);
            let ca = p.palette.color(a);
            let cb = p.palette.color(b);
            for c in 0..3 {
                let mixed = (ca[c] as f64 * (1.0 - t) + cb[c] as f64 * t).round();
                out[c] = apply_grain(mixed, rng.next_signed(), p.noise_amount);
            }
            out[3] = 255;
            continue;
        }

        let t = shape_curve(p.mode, base);
        let color: Rgb = p.palette.sample(t);
        for c in 0..3 {
            out[c] = apply_grain(color[c] as f64, rng.next_signed(), p.noise_amount);
        }
        out[3] = 255;
    }
}

/// Unshaped gradient position for a (warped) pixel, clamped to `[0, 1]`.
fn base_position(mode: GradientMode, x: f64, y: f64, w: f64, h: f64, rng: &mut Rng) -> f64 {
    match mode {
        GradientMode::Simple | GradientMode::SoftBezier | GradientMode::SharpBezier => {
            (y / h).clamp(0.0, 1.0)
        }
        GradientMode::MeshStatic | GradientMode::MeshGrid => {
            let cell_x = ((x / w) * MESH_CELLS).floor() as i64;
            let cell_y = ((y / h) * MESH_CELLS).floor() as i64;
            let cell_base = Rng::new((cell_x * 100 + cell_y) as u32).next_f64();
            let jitter = (rng.next_f64() - 0.5) * MESH_JITTER;
            (cell_base + jitter).clamp(0.0, 1.0)
        }
    }
}

fn shape_curve(mode: GradientMode, t: f64) -> f64 {
    match mode {
        GradientMode::SharpBezier => {
            let a = t.powi(SHARP_EXPONENT);
            let b = (1.0 - t).powi(SHARP_EXPONENT);
            a / (a + b)
        }
        GradientMode::SoftBezier => smoothstep(t),
        _ => t,
    }
}

/// The two anchors nearest to `(px, py)` and the blend fraction towards the
/// second one.
fn anchor_blend(anchors: &[AnchorPoint], px: f64, py: f64) -> (usize, usize, f64) {
    let mut nearest = 0;
    let mut second = 0;
    let mut d1 = f64::INFINITY;
    let mut d2 = f64::INFINITY;
    for (i, a) in anchors.iter().enumerate() {
        let dx = px - a.x;
        let dy = py - a.y;
        let d = dx * dx + dy * dy;
        if d < d1 {
            d2 = d1;
            second = nearest;
            d1 = d;
            nearest = i;
        } else if d < d2 {
            d2 = d;
            second = i;
        }
    }
    let w1 = 1.0 / (d1 + 1e-6);
    let w2 = 1.0 / (d2 + 1e-6);
    let t = w2 / (w1 + w2);
    (nearest, second, if t.is_finite() { t } else { 0.0 })
}

#[inline]
fn apply_grain(value: f64, signed: f64, amount: f64) -> u8 {
    (value + signed * GRAIN_RANGE * amount).round().clamp(0.0, 255.0) as u8
}

/// Render and PNG-encode. `Ok(None)` means the render was cancelled.
pub fn generate_asset(
    config: &GradientConfig,
    width: u32,
    height: u32,
    opts: &RenderOptions,
) -> Result<Option<GradientAsset>, ImageError> {
    let Some(image) = render_gradient(config, width, height, opts) else {
        return Ok(None);
    };
    let png = crate::io::encode_png(&image)?;
    Ok(Some(GradientAsset {
        width: image.width(),
        height: image.height(),
        scale: opts.scale(),
        png,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WarpShape;

    fn config(mode: GradientMode) -> GradientConfig {
        GradientConfig {
            mode,
            warp_shape: WarpShape::FbmNoise,
            warp_strength: 0.6,
            warp_scale: 40.0,
            noise_amount: 0.2,
            seed: 1234,
            colors: vec!["#0f172a".into(), "#6366f1".into(), "#f472b6".into()],
            points: None,
        }
    }

    #[test]
    fn raster_is_supersampled() {
        let img = render_gradient(&config(GradientMode::Simple), 20, 10, &RenderOptions::default())
            .unwrap();
        assert_eq!(img.dimensions(), (30, 15));

        let img = render_gradient(&config(GradientMode::Simple), 7, 5, &RenderOptions::with_quality(9.0))
            .unwrap();
        assert_eq!(img.dimensions(), (21, 15));

        let img = render_gradient(&config(GradientMode::Simple), 7, 5, &RenderOptions::with_quality(0.1))
            .unwrap();
        assert_eq!(img.dimensions(), (7, 5));
    }

    #[test]
    fn identical_inputs_render_identical_pixels() {
        for mode in [
            GradientMode::SharpBezier,
            GradientMode::SoftBezier,
            GradientMode::MeshStatic,
            GradientMode::MeshGrid,
            GradientMode::Simple,
        ] {
            let cfg = config(mode);
            let a = render_gradient(&cfg, 24, 16, &RenderOptions::default()).unwrap();
            let b = render_gradient(&cfg, 24, 16, &RenderOptions::default()).unwrap();
            assert_eq!(a.as_raw(), b.as_raw(), "{mode:?}");
        }
    }

    #[test]
    fn seed_changes_grain() {
        let a = render_gradient(&config(GradientMode::Simple), 16, 16, &RenderOptions::default()).unwrap();
        let mut cfg = config(GradientMode::Simple);
        cfg.seed = 99;
        let b = render_gradient(&cfg, 16, 16, &RenderOptions::default()).unwrap();
        assert_ne!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn output_is_opaque() {
        let img = render_gradient(&config(GradientMode::MeshGrid), 12, 12, &RenderOptions::default())
            .unwrap();
        assert!(img.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn flat_noiseless_gradient_runs_top_to_bottom() {
        let cfg = GradientConfig {
            mode: GradientMode::Simple,
            warp_shape: WarpShape::Flat,
            warp_strength: 1.0,
            warp_scale: 100.0,
            noise_amount: 0.0,
            seed: 5,
            colors: vec!["#000000".into(), "#ffffff".into()],
            points: None,
        };
        let img = render_gradient(&cfg, 10, 40, &RenderOptions::with_quality(1.0)).unwrap();
        // Flat warp is 0.5, so there is no displacement.
        assert_eq!(img.get_pixel(3, 0).0, [0, 0, 0, 255]);
        let top = img.get_pixel(0, 5)[0];
        let bottom = img.get_pixel(0, 35)[0];
        assert!(bottom > top);
        // Rows are uniform without grain or warp.
        for x in 0..10 {
            assert_eq!(img.get_pixel(x, 20), img.get_pixel(0, 20));
        }
    }

    #[test]
    fn grain_is_bounded() {
        let mut cfg = config(GradientMode::Simple);
        cfg.warp_shape = WarpShape::Flat;
        cfg.colors = vec!["#808080".into()];
        cfg.noise_amount = 0.5;
        let img = render_gradient(&cfg, 20, 20, &RenderOptions::with_quality(1.0)).unwrap();
        for p in img.pixels() {
            for c in 0..3 {
                assert!((118..=138).contains(&p[c]), "{:?}", p);
            }
        }
    }

    #[test]
    fn anchors_pull_color_towards_nearest_point() {
        let cfg = GradientConfig {
            mode: GradientMode::Simple,
            warp_shape: WarpShape::Flat,
            warp_strength: 0.0,
            warp_scale: 100.0,
            noise_amount: 0.0,
            seed: 1,
            colors: vec!["#ff0000".into(), "#0000ff".into()],
            points: Some(vec![AnchorPoint { x: 0.0, y: 0.0 }, AnchorPoint { x: 1.0, y: 1.0 }]),
        };
        let img = render_gradient(&cfg, 20, 20, &RenderOptions::with_quality(1.0)).unwrap();
        let near_red = img.get_pixel(1, 1);
        let near_blue = img.get_pixel(18, 18);
        assert!(near_red[0] > near_red[2]);
        assert!(near_blue[2] > near_blue[0]);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let cfg = GradientConfig {
            warp_scale: -50.0,
            warp_strength: 12.0,
            noise_amount: 9.0,
            colors: vec!["nonsense".into(), "#zzzzzz".into()],
            ..config(GradientMode::SharpBezier)
        };
        let img = render_gradient(&cfg, 8, 8, &RenderOptions::default()).unwrap();
        // Both stops decode as black; only grain (at most ±10) remains.
        assert!(img.pixels().all(|p| p[0] <= 10 && p[1] <= 10 && p[2] <= 10));
    }

    #[test]
    fn empty_palette_renders_black() {
        let mut cfg = config(GradientMode::SoftBezier);
        cfg.colors.clear();
        cfg.noise_amount = 0.0;
        let img = render_gradient(&cfg, 6, 6, &RenderOptions::default()).unwrap();
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn raised_flag_cancels_render() {
        let flag = Arc::new(AtomicBool::new(true));
        let opts = RenderOptions::default().with_cancel(flag);
        assert!(render_gradient(&config(GradientMode::Simple), 64, 64, &opts).is_none());
    }

    #[test]
    fn flag_raised_mid_render_abandons_it() {
        let flag = Arc::new(AtomicBool::new(false));
        let opts = RenderOptions::with_quality(MAX_QUALITY).with_cancel(flag.clone());
        let mut cfg = config(GradientMode::MeshGrid);
        cfg.warp_shape = WarpShape::FbmNoise;

        let raiser = {
            let flag = flag.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(20));
                flag.store(true, Ordering::Relaxed);
            })
        };
        // 4500×4500 raster: far longer than the 20ms before the flag goes up.
        let out = render_gradient(&cfg, 1500, 1500, &opts);
        raiser.join().unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn zero_sized_request_is_empty() {
        let img = render_gradient(&config(GradientMode::Simple), 0, 10, &RenderOptions::default())
            .unwrap();
        assert_eq!(img.dimensions(), (0, 15));
    }

    #[test]
    fn asset_carries_png_bytes() {
        let asset = generate_asset(&config(GradientMode::SoftBezier), 10, 10, &RenderOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!((asset.width, asset.height), (15, 15));
        assert_eq!(asset.scale, 1.5);
        assert_eq!(&asset.png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
