// ============================================================================
// DATA MODEL — cards, layouts, gradient configuration
// ============================================================================
//
// Shapes shared by the placement engine, the gradient renderer, and the
// persistence layer. JSON field names are camelCase so exported layouts stay
// readable by the web editor that produces them.

use serde::{Deserialize, Serialize};

use crate::grid::{self, GridConfig};

// ============================================================================
// CARD SIZE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSize {
    Square,
    Wide,
    Portrait,
    Large,
}

impl CardSize {
    /// Catalog order, used by auto-placement fallbacks and the CLI help text.
    pub const ALL: [CardSize; 4] = [
        CardSize::Square,
        CardSize::Wide,
        CardSize::Portrait,
        CardSize::Large,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CardSize::Square => "square",
            CardSize::Wide => "wide",
            CardSize::Portrait => "portrait",
            CardSize::Large => "large",
        }
    }

    pub fn from_name(s: &str) -> Option<CardSize> {
        match s.trim().to_lowercase().as_str() {
            "square" => Some(CardSize::Square),
            "wide" => Some(CardSize::Wide),
            "portrait" => Some(CardSize::Portrait),
            "large" => Some(CardSize::Large),
            _ => None,
        }
    }

    /// Cell span (width, height).
    pub fn dimensions(self) -> (i32, i32) {
        grid::dimensions_of(self)
    }
}

impl std::fmt::Display for CardSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// PRESENTATION ENUMS
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundStyle {
    #[default]
    Fill,
    Border,
    Gradient,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextOrientation {
    #[default]
    Horizontal,
    Vertical,
}

// ============================================================================
// GRADIENT CONFIG
// ============================================================================

/// Shaping curve applied to the base gradient position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradientMode {
    SharpBezier,
    SoftBezier,
    MeshStatic,
    MeshGrid,
    Simple,
}

impl GradientMode {
    pub fn from_name(s: &str) -> Option<GradientMode> {
        match s {
            "sharpBezier" => Some(GradientMode::SharpBezier),
            "softBezier" => Some(GradientMode::SoftBezier),
            "meshStatic" => Some(GradientMode::MeshStatic),
            "meshGrid" => Some(GradientMode::MeshGrid),
            "simple" => Some(GradientMode::Simple),
            _ => None,
        }
    }
}

/// Noise or pattern field used to warp the gradient.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WarpShape {
    SimplexNoise,
    Circular,
    ValueNoise,
    WorleyNoise,
    FbmNoise,
    VoronoiNoise,
    DomainWarping,
    Waves,
    SmoothNoise,
    Oval,
    Rows,
    Columns,
    Flat,
    Gravity,
}

impl WarpShape {
    pub const ALL: [WarpShape; 14] = [
        WarpShape::SimplexNoise,
        WarpShape::Circular,
        WarpShape::ValueNoise,
        WarpShape::WorleyNoise,
        WarpShape::FbmNoise,
        WarpShape::VoronoiNoise,
        WarpShape::DomainWarping,
        WarpShape::Waves,
        WarpShape::SmoothNoise,
        WarpShape::Oval,
        WarpShape::Rows,
        WarpShape::Columns,
        WarpShape::Flat,
        WarpShape::Gravity,
    ];
}

/// Normalized anchor position inside the gradient, `[0, 1]` on both axes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientConfig {
    pub mode: GradientMode,
    pub warp_shape: WarpShape,
    /// 0–1
    pub warp_strength: f64,
    /// 1–600, larger is coarser
    pub warp_scale: f64,
    /// 0–0.5 grain magnitude
    pub noise_amount: f64,
    pub seed: i64,
    /// 2–6 hex colors, e.g. `#ff8800`
    pub colors: Vec<String>,
    #[serde(default)]
    pub points: Option<Vec<AnchorPoint>>,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            mode: GradientMode::SoftBezier,
            warp_shape: WarpShape::SimplexNoise,
            warp_strength: 0.5,
            warp_scale: 200.0,
            noise_amount: 0.1,
            seed: 1,
            colors: vec!["#6366f1".to_string(), "#ec4899".to_string()],
            points: None,
        }
    }
}

impl GradientConfig {
    /// Anchor points are only honoured when there is exactly one per color.
    pub fn active_points(&self) -> Option<&[AnchorPoint]> {
        match &self.points {
            Some(points) if !points.is_empty() && points.len() == self.colors.len() => {
                Some(points.as_slice())
            }
            _ => None,
        }
    }
}

// ============================================================================
// CARD
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub size: CardSize,
    pub x: i32,
    pub y: i32,

    // Presentation attributes. The placement engine never touches these.
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
    /// Reference to an image held in the local image store.
    #[serde(default)]
    pub uploaded_image_id: Option<String>,
    #[serde(default)]
    pub background_style: Option<BackgroundStyle>,
    #[serde(default)]
    pub gradient: Option<GradientConfig>,
    #[serde(default)]
    pub border_color: Option<String>,
    #[serde(default)]
    pub border_width: Option<u32>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub text_alignment: Option<TextAlignment>,
    #[serde(default)]
    pub vertical_alignment: Option<VerticalAlignment>,
    #[serde(default)]
    pub text_orientation: Option<TextOrientation>,
    #[serde(default)]
    pub font_size: Option<u32>,
}

impl Card {
    /// A bare card with no presentation attributes.
    pub fn new(id: impl Into<String>, size: CardSize, x: i32, y: i32) -> Self {
        Self {
            id: id.into(),
            size,
            x,
            y,
            background_color: None,
            background_image: None,
            uploaded_image_id: None,
            background_style: None,
            gradient: None,
            border_color: None,
            border_width: None,
            text: String::new(),
            subtitle: None,
            link: None,
            text_color: None,
            text_alignment: None,
            vertical_alignment: None,
            text_orientation: None,
            font_size: None,
        }
    }

    /// A card with the editor's defaults for freshly added cards.
    pub fn with_defaults(id: impl Into<String>, size: CardSize, x: i32, y: i32) -> Self {
        Self {
            background_color: Some("#f3f4f6".to_string()),
            text_color: Some("#1f2937".to_string()),
            text_alignment: Some(TextAlignment::Left),
            text_orientation: Some(TextOrientation::Horizontal),
            font_size: Some(16),
            ..Self::new(id, size, x, y)
        }
    }

    pub fn dimensions(&self) -> (i32, i32) {
        self.size.dimensions()
    }

    pub fn background_style(&self) -> BackgroundStyle {
        self.background_style.unwrap_or_default()
    }

    /// Pixel footprint (width, height) of the card on the given grid.
    pub fn pixel_size(&self, grid: &GridConfig) -> (u32, u32) {
        let (w, h) = self.dimensions();
        (
            grid::footprint_pixels(w, grid.cell_size, grid.gap).max(0) as u32,
            grid::footprint_pixels(h, grid.cell_size, grid.gap).max(0) as u32,
        )
    }

    /// Copy of this card moved to `(x, y)`.
    pub fn moved_to(&self, x: i32, y: i32) -> Card {
        Card {
            x,
            y,
            ..self.clone()
        }
    }

    /// Copy of this card with a new size at `(x, y)`.
    pub fn resized(&self, size: CardSize, x: i32, y: i32) -> Card {
        Card {
            size,
            x,
            y,
            ..self.clone()
        }
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub id: String,
    pub name: String,
    pub cards: Vec<Card>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
    #[serde(default)]
    pub version: Option<u32>,
}

/// Current layout schema version written on save.
pub const LAYOUT_VERSION: u32 = 2;

impl Layout {
    pub fn new(id: impl Into<String>, name: impl Into<String>, cards: Vec<Card>) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            name: name.into(),
            cards,
            created_at: now,
            updated_at: now,
            version: Some(LAYOUT_VERSION),
        }
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }
}

pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
