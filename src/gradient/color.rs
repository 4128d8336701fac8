// ============================================================================
// COLOR — hex parsing, CIE LAB conversion, palette sampling
// ============================================================================

use super::noise::{lerp, smoothstep};

/// 8-bit sRGB triple.
pub type Rgb = [u8; 3];

const BLACK: Rgb = [0, 0, 0];

// D65 reference white.
const WHITE_X: f64 = 0.95047;
const WHITE_Z: f64 = 1.08883;

/// Parse `#rrggbb` or `#rgb` (the `#` is optional). Anything else decodes as
/// black.
pub fn parse_hex(hex: &str) -> Rgb {
    let h = hex.trim().trim_start_matches('#');
    if !h.is_ascii() {
        return BLACK;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    let parsed = match h.len() {
        6 => channel(&h[0..2])
            .zip(channel(&h[2..4]))
            .zip(channel(&h[4..6]))
            .map(|((r, g), b)| [r, g, b]),
        3 => channel(&h[0..1])
            .zip(channel(&h[1..2]))
            .zip(channel(&h[2..3]))
            .map(|((r, g), b)| [r * 17, g * 17, b * 17]),
        _ => None,
    };
    parsed.unwrap_or(BLACK)
}

#[inline]
fn srgb_to_linear(c: f64) -> f64 {
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

#[inline]
fn linear_to_srgb(c: f64) -> f64 {
    if c > 0.003_130_8 {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * c
    }
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

#[inline]
fn lab_f_inv(t: f64) -> f64 {
    if t > 0.206897 {
        t * t * t
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

/// sRGB → CIE L\*a\*b\* (D65).
pub fn rgb_to_lab(rgb: Rgb) -> [f64; 3] {
    let r = srgb_to_linear(rgb[0] as f64 / 255.0);
    let g = srgb_to_linear(rgb[1] as f64 / 255.0);
    let b = srgb_to_linear(rgb[2] as f64 / 255.0);

    let x = r * 0.412_456_4 + g * 0.357_576_1 + b * 0.180_437_5;
    let y = r * 0.212_672_9 + g * 0.715_152_2 + b * 0.072_175_0;
    let z = r * 0.019_333_9 + g * 0.119_192_0 + b * 0.950_304_1;

    let fx = lab_f(x / WHITE_X);
    let fy = lab_f(y);
    let fz = lab_f(z / WHITE_Z);

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// CIE L\*a\*b\* (D65) → sRGB, rounded and clamped into gamut.
pub fn lab_to_rgb(lab: [f64; 3]) -> Rgb {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = lab[1] / 500.0 + fy;
    let fz = fy - lab[2] / 200.0;

    let x = lab_f_inv(fx) * WHITE_X;
    let y = lab_f_inv(fy);
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = x * 3.240_454_2 + y * -1.537_138_5 + z * -0.498_531_4;
    let g = x * -0.969_266_0 + y * 1.876_010_8 + z * 0.041_556_0;
    let b = x * 0.055_643_4 + y * -0.204_025_9 + z * 1.057_225_2;

    let to_u8 = |c: f64| (linear_to_srgb(c) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_u8(r), to_u8(g), to_u8(b)]
}

/// Pre-parsed palette, so the per-pixel lookup does no string work.
#[derive(Clone, Debug)]
pub struct Palette {
    rgb: Vec<Rgb>,
    lab: Vec<[f64; 3]>,
}

impl Palette {
    pub fn new<S: AsRef<str>>(colors: &[S]) -> Self {
        let rgb: Vec<Rgb> = colors.iter().map(|c| parse_hex(c.as_ref())).collect();
        let lab = rgb.iter().map(|c| rgb_to_lab(*c)).collect();
        Self { rgb, lab }
    }

    pub fn len(&self) -> usize {
        self.rgb.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rgb.is_empty()
    }

    /// Palette entry `i` as parsed, black when out of range.
    pub fn color(&self, i: usize) -> Rgb {
        self.rgb.get(i).copied().unwrap_or(BLACK)
    }

    /// Color at position `t` along the palette, interpolated in LAB with an
    /// eased fraction between neighbouring stops.
    pub fn sample(&self, t: f64) -> Rgb {
        match self.rgb.len() {
            0 => BLACK,
            1 => self.rgb[0],
            n => {
                let scaled = t.clamp(0.0, 1.0) * (n - 1) as f64;
                let i = (scaled.floor() as usize).min(n - 1);
                let j = (i + 1).min(n - 1);
                let frac = smoothstep(scaled - i as f64);
                let (a, b) = (self.lab[i], self.lab[j]);
                lab_to_rgb([
                    lerp(a[0], b[0], frac),
                    lerp(a[1], b[1], frac),
                    lerp(a[2], b[2], frac),
                ])
            }
        }
    }
}

/// One-shot palette lookup over hex strings.
pub fn sample_palette<S: AsRef<str>>(colors: &[S], t: f64) -> Rgb {
    Palette::new(colors).sample(t)
}
