// ============================================================================
// FLATTENED EXPORT — layout → single RGBA raster
// ============================================================================
//
// Cards are rasterized as rounded panels on a white canvas. Gradient panels
// are rendered for their footprint first (in parallel), then composited row
// by row. Text is not drawn.

use image::imageops::FilterType;
use image::RgbaImage;
use rayon::prelude::*;

use crate::gradient::color::{Rgb, parse_hex};
use crate::gradient::{RenderOptions, render_gradient};
use crate::grid::{self, GridConfig};
use crate::model::{BackgroundStyle, Card};
use crate::settings::EditorSettings;

const CANVAS_COLOR: Rgb = [255, 255, 255];
const DEFAULT_FILL: &str = "#f3f4f6";
const DEFAULT_BORDER: &str = "#e5e7eb";
const DEFAULT_BORDER_WIDTH: u32 = 2;
const CORNER_RADIUS: f64 = 16.0;
/// How far border-style fills are pulled towards white.
const BORDER_FILL_LIGHTEN: f64 = 0.95;

#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    /// Canvas padding around the grid, in unscaled pixels.
    pub padding: u32,
    /// Output multiplier (1–4).
    pub scale: f64,
    /// Supersample factor for gradient panels before they are resized down.
    pub gradient_quality: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_settings(&EditorSettings::default())
    }
}

impl ExportOptions {
    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self {
            padding: settings.canvas_padding,
            scale: settings.export_scale,
            gradient_quality: settings.gradient_quality,
        }
    }

    fn scale(&self) -> f64 {
        if self.scale.is_finite() {
            self.scale.clamp(1.0, 4.0)
        } else {
            1.0
        }
    }
}

/// Mix `c` towards white by `amount` (0 = unchanged, 1 = white).
pub fn lighten(c: Rgb, amount: f64) -> Rgb {
    let mix = |v: u8| (v as f64 + (255.0 - v as f64) * amount).round().clamp(0.0, 255.0) as u8;
    [mix(c[0]), mix(c[1]), mix(c[2])]
}

/// One card resolved to output pixels.
struct Panel {
    x0: u32,
    y0: u32,
    w: u32,
    h: u32,
    radius: f64,
    fill: Rgb,
    border: Option<(Rgb, f64)>,
    gradient: Option<RgbaImage>,
}

impl Panel {
    fn for_card(card: &Card, grid: &GridConfig, padding: f64, scale: f64, quality: f64) -> Self {
        let step = grid.step() as f64;
        let (cw, ch) = card.pixel_size(grid);
        let x0 = ((padding + card.x as f64 * step) * scale).round().max(0.0) as u32;
        let y0 = ((padding + card.y as f64 * step) * scale).round().max(0.0) as u32;
        let w = (cw as f64 * scale).round() as u32;
        let h = (ch as f64 * scale).round() as u32;

        let mut panel = Panel {
            x0,
            y0,
            w,
            h,
            radius: CORNER_RADIUS * scale,
            fill: parse_hex(card.background_color.as_deref().unwrap_or(DEFAULT_FILL)),
            border: None,
            gradient: None,
        };

        match card.background_style() {
            BackgroundStyle::Fill => {}
            BackgroundStyle::Border => {
                let color = card
                    .border_color
                    .as_deref()
                    .or(card.background_color.as_deref())
                    .unwrap_or(DEFAULT_BORDER);
                let color = parse_hex(color);
                let width = match card.border_width {
                    Some(0) | None => DEFAULT_BORDER_WIDTH,
                    Some(w) => w,
                };
                panel.fill = lighten(color, BORDER_FILL_LIGHTEN);
                panel.border = Some((color, width as f64 * scale));
            }
            BackgroundStyle::Gradient => {
                if let Some(config) = &card.gradient
                    && w > 0
                    && h > 0
                {
                    let opts = RenderOptions::with_quality(quality);
                    panel.gradient = render_gradient(config, w, h, &opts).map(|img| {
                        if img.dimensions() == (w, h) {
                            img
                        } else {
                            image::imageops::resize(&img, w, h, FilterType::Triangle)
                        }
                    });
                }
            }
        }
        panel
    }

    fn covers_row(&self, y: u32) -> bool {
        y >= self.y0 && y < self.y0 + self.h
    }

    /// Output color for local pixel `(lx, ly)`, or `None` outside the
    /// rounded corners.
    fn shade(&self, lx: u32, ly: u32) -> Option<Rgb> {
        let (fx, fy) = (lx as f64 + 0.5, ly as f64 + 0.5);
        let (w, h) = (self.w as f64, self.h as f64);
        if !inside_rounded(fx, fy, w, h, self.radius) {
            return None;
        }
        if let Some((color, bw)) = self.border {
            let inner = inside_rounded(
                fx - bw,
                fy - bw,
                w - 2.0 * bw,
                h - 2.0 * bw,
                (self.radius - bw).max(0.0),
            );
            if !inner {
                return Some(color);
            }
        }
        if let Some(g) = &self.gradient
            && lx < g.width()
            && ly < g.height()
        {
            let p = g.get_pixel(lx, ly);
            return Some([p[0], p[1], p[2]]);
        }
        Some(self.fill)
    }
}

/// Point-in-rounded-rectangle test, rectangle anchored at the origin.
fn inside_rounded(x: f64, y: f64, w: f64, h: f64, r: f64) -> bool {
    if x < 0.0 || y < 0.0 || x > w || y > h {
        return false;
    }
    let r = r.min(w * 0.5).min(h * 0.5).max(0.0);
    let cx = x.clamp(r, w - r);
    let cy = y.clamp(r, h - r);
    let (dx, dy) = (x - cx, y - cy);
    dx * dx + dy * dy <= r * r
}

/// Output size for a grid at the given options.
pub fn export_dimensions(grid: &GridConfig, opts: &ExportOptions) -> (u32, u32) {
    let (gw, gh) = grid.pixel_extent();
    let pad = 2.0 * opts.padding as f64;
    let scale = opts.scale();
    (
        ((gw as f64 + pad) * scale).round() as u32,
        ((gh as f64 + pad) * scale).round() as u32,
    )
}

/// Flatten `cards` onto a white canvas.
pub fn render_layout(cards: &[Card], grid: &GridConfig, opts: &ExportOptions) -> RgbaImage {
    let scale = opts.scale();
    let padding = opts.padding as f64;
    let (width, height) = export_dimensions(grid, opts);

    let panels: Vec<Panel> = cards
        .par_iter()
        .map(|c| Panel::for_card(c, grid, padding, scale, opts.gradient_quality))
        .collect();

    let w = width as usize;
    let stride = w * 4;
    let mut raw = vec![255u8; stride * height as usize];
    if stride == 0 {
        return RgbaImage::new(width, height);
    }

    raw.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        let y = y as u32;
        for panel in panels.iter().filter(|p| p.covers_row(y)) {
            let x_end = (panel.x0 + panel.w).min(width);
            for x in panel.x0..x_end {
                if let Some(c) = panel.shade(x - panel.x0, y - panel.y0) {
                    let pi = x as usize * 4;
                    row[pi..pi + 3].copy_from_slice(&c);
                    row[pi + 3] = 255;
                }
            }
        }
    });

    RgbaImage::from_raw(width, height, raw).unwrap_or_else(|| {
        RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([CANVAS_COLOR[0], CANVAS_COLOR[1], CANVAS_COLOR[2], 255]),
        )
    })
}

/// Pixel rectangle `(x, y, w, h)` of a card in an export with `opts`.
pub fn card_rect(card: &Card, grid: &GridConfig, opts: &ExportOptions) -> (u32, u32, u32, u32) {
    let scale = opts.scale();
    let pad = opts.padding as f64;
    let (cw, ch) = card.pixel_size(grid);
    let x = ((pad + grid::grid_to_pixels(card.x, grid.cell_size, grid.gap) as f64) * scale).round();
    let y = ((pad + grid::grid_to_pixels(card.y, grid.cell_size, grid.gap) as f64) * scale).round();
    (
        x.max(0.0) as u32,
        y.max(0.0) as u32,
        (cw as f64 * scale).round() as u32,
        (ch as f64 * scale).round() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GRID_CONFIG;
    use crate::model::{CardSize, GradientConfig};

    fn opts() -> ExportOptions {
        ExportOptions {
            padding: 32,
            scale: 1.0,
            gradient_quality: 1.0,
        }
    }

    fn center(img: &RgbaImage, card: &Card) -> [u8; 4] {
        let (x, y, w, h) = card_rect(card, &GRID_CONFIG, &opts());
        img.get_pixel(x + w / 2, y + h / 2).0
    }

    #[test]
    fn empty_layout_is_white_canvas() {
        let img = render_layout(&[], &GRID_CONFIG, &opts());
        assert_eq!(img.dimensions(), (1136 + 64, 560 + 64));
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn scale_multiplies_output() {
        let o = ExportOptions { scale: 2.0, ..opts() };
        assert_eq!(export_dimensions(&GRID_CONFIG, &o), (2400, 1248));
    }

    #[test]
    fn fill_card_uses_background_color() {
        let mut card = Card::new("a", CardSize::Wide, 2, 1);
        card.background_color = Some("#336699".into());
        let img = render_layout(std::slice::from_ref(&card), &GRID_CONFIG, &opts());
        assert_eq!(center(&img, &card), [0x33, 0x66, 0x99, 255]);
        // Rounded corner stays canvas white.
        let (x, y, _, _) = card_rect(&card, &GRID_CONFIG, &opts());
        assert_eq!(img.get_pixel(x, y).0, [255, 255, 255, 255]);
        // Gap between cells stays white too.
        assert_eq!(img.get_pixel(x - 8, y + 40).0, [255, 255, 255, 255]);
    }

    #[test]
    fn unset_fill_uses_default_grey() {
        let card = Card::new("a", CardSize::Square, 0, 0);
        let img = render_layout(std::slice::from_ref(&card), &GRID_CONFIG, &opts());
        assert_eq!(center(&img, &card), [0xf3, 0xf4, 0xf6, 255]);
    }

    #[test]
    fn border_card_draws_border_over_light_fill() {
        let mut card = Card::new("b", CardSize::Square, 0, 0);
        card.background_style = Some(BackgroundStyle::Border);
        card.border_color = Some("#000000".into());
        card.border_width = Some(4);
        let img = render_layout(std::slice::from_ref(&card), &GRID_CONFIG, &opts());
        let (x, y, _, h) = card_rect(&card, &GRID_CONFIG, &opts());
        // Left edge, halfway down.
        assert_eq!(img.get_pixel(x + 1, y + h / 2).0, [0, 0, 0, 255]);
        let lit = lighten([0, 0, 0], BORDER_FILL_LIGHTEN);
        assert_eq!(center(&img, &card), [lit[0], lit[1], lit[2], 255]);
    }

    #[test]
    fn gradient_card_is_not_flat() {
        let mut card = Card::new("g", CardSize::Large, 4, 0);
        card.background_style = Some(BackgroundStyle::Gradient);
        card.gradient = Some(GradientConfig {
            warp_strength: 0.0,
            colors: vec!["#000000".into(), "#ffffff".into()],
            ..GradientConfig::default()
        });
        let img = render_layout(std::slice::from_ref(&card), &GRID_CONFIG, &opts());
        let (x, y, w, h) = card_rect(&card, &GRID_CONFIG, &opts());
        let top = img.get_pixel(x + w / 2, y + 20)[0] as i32;
        let bottom = img.get_pixel(x + w / 2, y + h - 20)[0] as i32;
        assert!(bottom - top > 60, "top {top}, bottom {bottom}");
    }

    #[test]
    fn lighten_moves_towards_white() {
        assert_eq!(lighten([0, 100, 255], 0.0), [0, 100, 255]);
        assert_eq!(lighten([0, 100, 255], 1.0), [255, 255, 255]);
        assert_eq!(lighten([0, 0, 0], 0.5), [128, 128, 128]);
    }
}
