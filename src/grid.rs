// ============================================================================
// GRID GEOMETRY — spans, snapping, bounds, collisions
// ============================================================================

use crate::model::{Card, CardSize};

/// Immutable grid constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridConfig {
    pub cols: i32,
    pub rows: i32,
    /// Cell edge in pixels.
    pub cell_size: i32,
    /// Gap between cells in pixels.
    pub gap: i32,
}

pub const GRID_CONFIG: GridConfig = GridConfig {
    cols: 12,
    rows: 6,
    cell_size: 80,
    gap: 16,
};

impl Default for GridConfig {
    fn default() -> Self {
        GRID_CONFIG
    }
}

impl GridConfig {
    /// Distance in pixels between the origins of two adjacent cells.
    pub fn step(&self) -> i32 {
        self.cell_size + self.gap
    }

    /// Pixel size (width, height) of the whole grid, without canvas padding.
    pub fn pixel_extent(&self) -> (i32, i32) {
        (
            footprint_pixels(self.cols, self.cell_size, self.gap),
            footprint_pixels(self.rows, self.cell_size, self.gap),
        )
    }
}

/// Size ↔ span table. Both directions read from here.
const SIZE_SPANS: [(CardSize, (i32, i32)); 4] = [
    (CardSize::Square, (2, 2)),
    (CardSize::Wide, (4, 2)),
    (CardSize::Portrait, (2, 4)),
    (CardSize::Large, (4, 4)),
];

/// Occupied span (width, height) in cells.
pub fn dimensions_of(size: CardSize) -> (i32, i32) {
    SIZE_SPANS
        .iter()
        .find(|(s, _)| *s == size)
        .map(|(_, dims)| *dims)
        .unwrap_or((2, 2))
}

/// Span for a size given by name; unrecognised names fall back to 2×2.
pub fn dimensions_of_name(name: &str) -> (i32, i32) {
    CardSize::from_name(name).map_or((2, 2), dimensions_of)
}

/// Reverse lookup: the size whose span is exactly `(width, height)`.
pub fn size_from_dimensions(width: i32, height: i32) -> Option<CardSize> {
    SIZE_SPANS
        .iter()
        .find(|(_, dims)| *dims == (width, height))
        .map(|(s, _)| *s)
}

/// Whether a card of `size` anchored at `(x, y)` lies inside the grid.
/// Holds for any `i32` input; extents are compared in `i64`.
pub fn is_valid_position(x: i32, y: i32, size: CardSize, cols: i32, rows: i32) -> bool {
    let (w, h) = dimensions_of(size);
    x >= 0
        && y >= 0
        && x as i64 + w as i64 <= cols as i64
        && y as i64 + h as i64 <= rows as i64
}

/// Axis-aligned overlap test. Touching edges do not collide.
pub fn rects_collide(a: (i32, i32, CardSize), b: (i32, i32, CardSize)) -> bool {
    let (ax, ay, asize) = a;
    let (bx, by, bsize) = b;
    let (aw, ah) = dimensions_of(asize);
    let (bw, bh) = dimensions_of(bsize);
    let (ax, ay, aw, ah) = (ax as i64, ay as i64, aw as i64, ah as i64);
    let (bx, by, bw, bh) = (bx as i64, by as i64, bw as i64, bh as i64);
    !(ax + aw <= bx || bx + bw <= ax || ay + ah <= by || by + bh <= ay)
}

pub fn collides(a: &Card, b: &Card) -> bool {
    rects_collide((a.x, a.y, a.size), (b.x, b.y, b.size))
}

/// Nearest grid coordinate for a pixel offset. Rounds so the snap zone is
/// centred on each cell boundary.
pub fn snap_to_grid(pixel_offset: f64, cell_size: i32, gap: i32) -> i32 {
    let step = (cell_size + gap) as f64;
    if step <= 0.0 {
        return 0;
    }
    // JS-style rounding: halves go towards +inf.
    (pixel_offset / step + 0.5).floor() as i32
}

pub fn grid_to_pixels(grid_value: i32, cell_size: i32, gap: i32) -> i32 {
    grid_value * (cell_size + gap)
}

/// Pixel length of a span of cells; the trailing gap is not drawn.
pub fn footprint_pixels(span: i32, cell_size: i32, gap: i32) -> i32 {
    span * (cell_size + gap) - gap
}
