//! Editor settings persisted across sessions as a `key=value` text file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gradient::render::{DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY};
use crate::log_warn;

const SETTINGS_FILE: &str = "bento_settings.cfg";

#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    /// Gradient supersample multiplier (1–3)
    pub gradient_quality: f64,
    /// Delay before a gradient re-render starts, in milliseconds
    pub gradient_debounce_ms: u64,
    /// Pixels between the canvas edge and the grid
    pub canvas_padding: u32,
    /// Saved-layouts file. Empty string = default location.
    pub layouts_file: String,
    /// Multiplier applied to flattened PNG exports (1–4)
    pub export_scale: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            gradient_quality: DEFAULT_QUALITY,
            gradient_debounce_ms: 150,
            canvas_padding: 32,
            layouts_file: String::new(),
            export_scale: 1.0,
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/bento-studio/bento_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\BentoStudio\bento_settings.cfg
    /// On macOS:   ~/Library/Application Support/BentoStudio/bento_settings.cfg
    pub(crate) fn settings_path() -> Option<PathBuf> {
        let dir = Self::config_dir()?;
        let _ = std::fs::create_dir_all(&dir);
        Some(dir.join(SETTINGS_FILE))
    }

    fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("BentoStudio"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("BentoStudio"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let base = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(base.join("bento-studio"))
        }
    }

    pub fn gradient_debounce(&self) -> Duration {
        Duration::from_millis(self.gradient_debounce_ms)
    }

    /// Saved-layouts file, resolving the empty default.
    pub fn layouts_path(&self) -> PathBuf {
        if self.layouts_file.trim().is_empty() {
            crate::logger::data_dir()
                .join("BentoStudio")
                .join(crate::io::DEFAULT_LAYOUTS_FILE)
        } else {
            PathBuf::from(self.layouts_file.trim())
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "gradient_quality={}\n\
             gradient_debounce_ms={}\n\
             canvas_padding={}\n\
             layouts_file={}\n\
             export_scale={}\n",
            self.gradient_quality,
            self.gradient_debounce_ms,
            self.canvas_padding,
            self.layouts_file,
            self.export_scale,
        )
    }

    /// Parse settings text. Unknown keys and unparsable values are skipped;
    /// numeric values are clamped to their valid ranges.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "gradient_quality" => {
                    if let Ok(v) = val.parse::<f64>()
                        && v.is_finite()
                    {
                        s.gradient_quality = v;
                    }
                }
                "gradient_debounce_ms" => {
                    s.gradient_debounce_ms = val.parse().unwrap_or(150);
                }
                "canvas_padding" => {
                    s.canvas_padding = val.parse().unwrap_or(32);
                }
                "layouts_file" => {
                    s.layouts_file = val.to_string();
                }
                "export_scale" => {
                    if let Ok(v) = val.parse::<f64>()
                        && v.is_finite()
                    {
                        s.export_scale = v;
                    }
                }
                _ => {}
            }
        }
        s.clamp();
        s
    }

    fn clamp(&mut self) {
        self.gradient_quality = self.gradient_quality.clamp(MIN_QUALITY, MAX_QUALITY);
        self.gradient_debounce_ms = self.gradient_debounce_ms.min(5_000);
        self.canvas_padding = self.canvas_padding.min(512);
        self.export_scale = self.export_scale.clamp(1.0, 4.0);
    }

    /// Save settings to the default location.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        self.save_to(&path);
    }

    pub fn save_to(&self, path: &Path) {
        if let Err(e) = std::fs::write(path, self.to_config_string()) {
            log_warn!("settings: could not write {}: {}", path.display(), e);
        }
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else { return Self::default() };
        Self::from_config_str(&content)
    }
}
