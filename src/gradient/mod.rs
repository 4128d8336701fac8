//! Procedural gradient rasters: seeded noise-warped palettes rendered on the
//! rayon pool, plus the per-card scheduler the editor drives.

pub mod color;
pub mod noise;
pub mod render;
pub mod rng;
pub mod scheduler;

pub use color::{Palette, Rgb, parse_hex, sample_palette};
pub use render::{GradientAsset, RenderOptions, generate_asset, render_gradient};
pub use rng::Rng;
pub use scheduler::{GradientRequest, GradientScheduler};
