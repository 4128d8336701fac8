//! Bento Studio core: grid placement for bento card layouts, procedural
//! gradient backgrounds, and the persistence around them.
//!
//! The placement engine (`placement`) is synchronous and never mutates its
//! input; every committed operation yields a fresh card collection. Gradient
//! rendering (`gradient`) runs on the rayon pool and is cancellable per row.

#![allow(clippy::too_many_arguments)]

pub mod logger;

pub mod cli;
pub mod export;
pub mod gradient;
pub mod grid;
pub mod io;
pub mod model;
pub mod placement;
pub mod project;
pub mod random_layout;
pub mod settings;

pub use grid::{GRID_CONFIG, GridConfig};
pub use model::{Card, CardSize, GradientConfig, Layout};
pub use placement::{DropKind, PlacementError};
