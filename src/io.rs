use image::codecs::png::PngEncoder;
use image::{ImageError, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

use crate::grid::{self, GridConfig};
use crate::model::{Layout, now_millis};
use crate::{log_info, log_warn};

/// File name of the saved-layouts store inside the data directory.
pub const DEFAULT_LAYOUTS_FILE: &str = "layouts.json";

/// Replaces locally stored images in portable exports.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://placehold.co/600x400?text=Image";

// ============================================================================
// ERRORS
// ============================================================================

/// Error type for layout persistence and import
#[derive(Debug)]
pub enum LayoutError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Serialize(String),
    InvalidFormat(String),
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::Io(e) => write!(f, "I/O error: {}", e),
            LayoutError::Json(e) => write!(f, "JSON error: {}", e),
            LayoutError::Serialize(e) => write!(f, "Serialization error: {}", e),
            LayoutError::InvalidFormat(e) => write!(f, "Invalid layout: {}", e),
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LayoutError::Io(e) => Some(e),
            LayoutError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LayoutError {
    fn from(e: std::io::Error) -> Self {
        LayoutError::Io(e)
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(e: serde_json::Error) -> Self {
        LayoutError::Json(e)
    }
}

impl From<Box<bincode::ErrorKind>> for LayoutError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        LayoutError::Serialize(e.to_string())
    }
}

// ============================================================================
// SAVED LAYOUTS
// ============================================================================

/// All saved layouts, kept as one JSON array on disk.
#[derive(Clone, Debug)]
pub struct LayoutStore {
    path: PathBuf,
}

impl LayoutStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every saved layout. A missing file is an empty store.
    pub fn list(&self) -> Result<Vec<Layout>, LayoutError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<Layout>, LayoutError> {
        Ok(self.list()?.into_iter().find(|l| l.id == id))
    }

    /// Insert or replace by id. Replacing refreshes `updated_at`. Returns the
    /// layout as stored.
    pub fn save(&self, layout: &Layout) -> Result<Layout, LayoutError> {
        let mut layouts = self.list()?;
        let stored = match layouts.iter().position(|l| l.id == layout.id) {
            Some(i) => {
                let mut updated = layout.clone();
                updated.updated_at = now_millis().max(layout.updated_at);
                layouts[i] = updated.clone();
                updated
            }
            None => {
                layouts.push(layout.clone());
                layout.clone()
            }
        };
        self.write_all(&layouts)?;
        log_info!("store: saved layout '{}' ({})", stored.name, stored.id);
        Ok(stored)
    }

    /// Remove by id. Returns whether anything was removed.
    pub fn delete(&self, id: &str) -> Result<bool, LayoutError> {
        let mut layouts = self.list()?;
        let before = layouts.len();
        layouts.retain(|l| l.id != id);
        if layouts.len() == before {
            return Ok(false);
        }
        self.write_all(&layouts)?;
        Ok(true)
    }

    fn write_all(&self, layouts: &[Layout]) -> Result<(), LayoutError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(layouts)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

// ============================================================================
// JSON EXPORT / IMPORT
// ============================================================================

/// Copy of `layout` with references to locally stored images removed, so the
/// file opens the same on another machine.
pub fn portable_layout(layout: &Layout) -> Layout {
    let mut out = layout.clone();
    for card in &mut out.cards {
        card.uploaded_image_id = None;
        if let Some(img) = &card.background_image
            && (img.starts_with("blob:") || img.starts_with("data:"))
        {
            card.background_image = Some(PLACEHOLDER_IMAGE_URL.to_string());
        }
    }
    out
}

/// Pretty-printed portable JSON.
pub fn export_json(layout: &Layout) -> Result<String, LayoutError> {
    Ok(serde_json::to_string_pretty(&portable_layout(layout))?)
}

/// Suggested download name: whitespace runs become underscores.
pub fn export_file_name(layout: &Layout) -> String {
    let stem = layout.name.split_whitespace().collect::<Vec<_>>().join("_");
    if stem.is_empty() {
        "layout.json".to_string()
    } else {
        format!("{stem}.json")
    }
}

pub fn write_json(layout: &Layout, path: &Path) -> Result<(), LayoutError> {
    std::fs::write(path, export_json(layout)?)?;
    Ok(())
}

/// Parse and validate a layout file's contents against `grid`.
pub fn import_json(content: &str, grid: &GridConfig) -> Result<Layout, LayoutError> {
    let mut layout: Layout = serde_json::from_str(content).map_err(|e| {
        LayoutError::InvalidFormat(format!("not a valid Bento layout file ({e})"))
    })?;
    validate_import(&layout, grid)?;
    let now = now_millis();
    if layout.created_at == 0 {
        layout.created_at = now;
    }
    if layout.updated_at == 0 {
        layout.updated_at = layout.created_at;
    }
    Ok(layout)
}

pub fn read_json(path: &Path, grid: &GridConfig) -> Result<Layout, LayoutError> {
    let content = std::fs::read_to_string(path)?;
    import_json(&content, grid)
}

/// Reject layouts the placement engine could never have produced.
pub fn validate_import(layout: &Layout, grid: &GridConfig) -> Result<(), LayoutError> {
    let mut seen = HashSet::new();
    for card in &layout.cards {
        if card.id.is_empty() {
            return Err(LayoutError::InvalidFormat("card with an empty id".into()));
        }
        if !seen.insert(card.id.as_str()) {
            return Err(LayoutError::InvalidFormat(format!(
                "duplicate card id '{}'",
                card.id
            )));
        }
        if !grid::is_valid_position(card.x, card.y, card.size, grid.cols, grid.rows) {
            return Err(LayoutError::InvalidFormat(format!(
                "card '{}' ({} at {},{}) lies outside the {}x{} grid",
                card.id, card.size, card.x, card.y, grid.cols, grid.rows
            )));
        }
    }
    for (i, a) in layout.cards.iter().enumerate() {
        for b in &layout.cards[i + 1..] {
            if grid::collides(a, b) {
                return Err(LayoutError::InvalidFormat(format!(
                    "cards '{}' and '{}' overlap",
                    a.id, b.id
                )));
            }
        }
    }
    Ok(())
}

// ============================================================================
// BENTO PROJECT FILE FORMAT
// ============================================================================

/// Magic header for the binary project file
const BENTO_MAGIC_V1: &str = "BNT1";

#[derive(Serialize, Deserialize)]
struct ProjectFileV1 {
    magic: String,
    layout: Layout,
}

/// Save a layout as a `.bento` project file
pub fn save_bento(layout: &Layout, path: &Path) -> Result<(), LayoutError> {
    let project = ProjectFileV1 {
        magic: BENTO_MAGIC_V1.to_string(),
        layout: layout.clone(),
    };
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, &project)?;
    Ok(())
}

/// Load and validate a `.bento` project file
pub fn load_bento(path: &Path, grid: &GridConfig) -> Result<Layout, LayoutError> {
    let raw = std::fs::read(path)?;
    if raw.len() < 12 {
        return Err(LayoutError::InvalidFormat("file too small".into()));
    }

    // bincode encodes a String as an 8-byte length prefix + UTF-8 data, so
    // the 4-char magic sits at bytes 8..12.
    let magic = std::str::from_utf8(&raw[8..12]).unwrap_or("");
    if magic != BENTO_MAGIC_V1 {
        log_warn!("load_bento: unknown magic '{}' in {}", magic, path.display());
        return Err(LayoutError::InvalidFormat(format!("unknown magic '{}'", magic)));
    }

    let project: ProjectFileV1 = bincode::deserialize(&raw)?;
    validate_import(&project.layout, grid)?;
    Ok(project.layout)
}

fn is_bento_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("bento"))
}

/// Load a layout file, `.bento` as a project file and anything else as JSON.
pub fn read_layout(path: &Path, grid: &GridConfig) -> Result<Layout, LayoutError> {
    if is_bento_path(path) {
        load_bento(path, grid)
    } else {
        read_json(path, grid)
    }
}

/// Write a layout file by extension. JSON written here keeps local image
/// references; use [`write_json`] for a portable copy.
pub fn write_layout(layout: &Layout, path: &Path) -> Result<(), LayoutError> {
    if is_bento_path(path) {
        save_bento(layout, path)
    } else {
        std::fs::write(path, serde_json::to_string_pretty(layout)?)?;
        Ok(())
    }
}

// ============================================================================
// PNG
// ============================================================================

/// Encode an RGBA image as PNG bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    let encoder = PngEncoder::new(Cursor::new(&mut bytes));
    #[allow(deprecated)]
    encoder.encode(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(bytes)
}

pub fn write_png(image: &RgbaImage, path: &Path) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = PngEncoder::new(&mut writer);
    #[allow(deprecated)]
    encoder.encode(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(())
}
