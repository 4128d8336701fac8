// ============================================================================
// Bento CLI — headless layout editing and gradient rendering
// ============================================================================
//
// Usage examples:
//   bento gradient --config sunset.json --size wide --output sunset.png
//   bento gradient --config '{"mode":"meshGrid",...}' --width 640 --height 360 -o g.png
//   bento new --output portfolio.json
//   bento add page.json --size large
//   bento move page.json --card <id> --x 4 --y 0
//   bento render page.json --output page.png --scale 2
//   bento saved save page.json
//   bento saved list
//
// Layout files ending in `.bento` are read and written as binary project
// files; anything else is JSON. Every command runs synchronously and exits
// non-zero on failure.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use crate::export::{ExportOptions, render_layout};
use crate::gradient::{RenderOptions, render_gradient};
use crate::grid::GRID_CONFIG;
use crate::io::{LayoutStore, read_layout, write_json, write_layout, write_png};
use crate::model::{CardSize, GradientConfig, Layout};
use crate::placement::validate_layout;
use crate::project::Project;
use crate::random_layout::generate_random_layout;
use crate::settings::EditorSettings;
use crate::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Bento Studio headless layout tool.
#[derive(Parser, Debug)]
#[command(
    name = "bento",
    about = "Bento grid layout editor and gradient renderer",
    long_about = "Edit bento grid layouts and render procedural gradients without\n\
                  opening the editor. Layout files are JSON, or binary project files\n\
                  when the name ends in .bento.\n\n\
                  Example:\n  \
                  bento gradient --config sunset.json --size wide --output sunset.png\n  \
                  bento render page.json --output page.png"
)]
pub struct CliArgs {
    /// Print per-command timing information.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a gradient config to a PNG.
    Gradient(GradientArgs),
    /// Create an empty layout file, named after the file unless --name is given.
    New {
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Add a card at the first free cell.
    Add {
        layout: PathBuf,
        #[arg(long, value_parser = parse_size)]
        size: CardSize,
        /// Card text.
        #[arg(long)]
        text: Option<String>,
    },
    /// Drop a card at a grid cell, swapping or rearranging neighbours.
    Move {
        layout: PathBuf,
        #[arg(long)]
        card: String,
        #[arg(long, allow_negative_numbers = true)]
        x: i32,
        #[arg(long, allow_negative_numbers = true)]
        y: i32,
    },
    /// Change a card's size.
    Resize {
        layout: PathBuf,
        #[arg(long)]
        card: String,
        #[arg(long, value_parser = parse_size)]
        size: CardSize,
    },
    /// Remove a card.
    Delete {
        layout: PathBuf,
        #[arg(long)]
        card: String,
    },
    /// Validate a layout file and list its cards.
    Check { layout: PathBuf },
    /// Flatten a layout to PNG, or export portable JSON when the output ends
    /// in .json.
    Render {
        layout: PathBuf,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
        /// Output multiplier (1–4). Defaults to the saved export scale.
        #[arg(long)]
        scale: Option<f64>,
        /// Canvas padding in pixels. Defaults to the saved canvas padding.
        #[arg(long)]
        padding: Option<u32>,
    },
    /// Manage the saved-layouts store.
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },
    /// Generate a random layout.
    Random {
        #[arg(long)]
        seed: Option<u32>,
        #[arg(long, default_value = "Random layout")]
        name: String,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum SavedAction {
    /// List saved layouts, most recently updated first.
    List,
    /// Save a layout file into the store, replacing any with the same id.
    Save { layout: PathBuf },
    /// Write a saved layout out to a file.
    Load {
        id: String,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Remove a saved layout.
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct GradientArgs {
    /// Gradient config: a JSON file path or an inline JSON object.
    #[arg(short, long, value_name = "JSON")]
    pub config: String,

    /// Render at the pixel footprint of a card size.
    #[arg(long, value_parser = parse_size, conflicts_with_all = ["width", "height"])]
    pub size: Option<CardSize>,

    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Supersample multiplier (1–3). Defaults to the saved gradient quality.
    #[arg(short, long)]
    pub quality: Option<f64>,

    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

fn parse_size(s: &str) -> Result<CardSize, String> {
    CardSize::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = CardSize::ALL.iter().map(|s| s.name()).collect();
        format!("unknown size '{}' (expected one of: {})", s, names.join(", "))
    })
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run one CLI command and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = EditorSettings::load();
    let start = Instant::now();

    let result = match args.command {
        Command::Gradient(g) => run_gradient(&g, &settings),
        Command::New { name, output } => run_new(name.as_deref(), &output, &settings),
        Command::Add { layout, size, text } => run_add(&layout, size, text, &settings),
        Command::Move { layout, card, x, y } => run_move(&layout, &card, x, y, &settings),
        Command::Resize { layout, card, size } => run_resize(&layout, &card, size, &settings),
        Command::Delete { layout, card } => run_delete(&layout, &card, &settings),
        Command::Check { layout } => run_check(&layout),
        Command::Render {
            layout,
            output,
            scale,
            padding,
        } => run_render(&layout, &output, scale, padding, &settings),
        Command::Saved { action } => run_saved(action, &LayoutStore::open(settings.layouts_path())),
        Command::Random { seed, name, output } => run_random(seed, &name, &output),
    };

    match result {
        Ok(()) => {
            if args.verbose {
                println!("done ({:.0}ms)", start.elapsed().as_secs_f64() * 1000.0);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_err!("cli: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_gradient(args: &GradientArgs, settings: &EditorSettings) -> Result<(), String> {
    let config = load_gradient_config(&args.config)?;
    let (width, height) = match (args.size, args.width, args.height) {
        (Some(size), _, _) => crate::model::Card::new("", size, 0, 0).pixel_size(&GRID_CONFIG),
        (None, Some(w), Some(h)) => (w, h),
        _ => return Err("pass either --size or both --width and --height".into()),
    };
    if width == 0 || height == 0 {
        return Err("width and height must be positive".into());
    }

    let quality = args.quality.unwrap_or(settings.gradient_quality);
    let opts = RenderOptions::with_quality(quality);
    let image = render_gradient(&config, width, height, &opts)
        .ok_or_else(|| "render was cancelled".to_string())?;
    write_png(&image, &args.output).map_err(|e| format!("save failed: {}", e))?;
    println!(
        "{} ({}x{}, quality {:.2})",
        args.output.display(),
        image.width(),
        image.height(),
        opts.scale()
    );
    Ok(())
}

fn load_gradient_config(arg: &str) -> Result<GradientConfig, String> {
    let text = if arg.trim_start().starts_with('{') {
        arg.to_string()
    } else {
        std::fs::read_to_string(arg)
            .map_err(|e| format!("could not read config '{}': {}", arg, e))?
    };
    serde_json::from_str(&text).map_err(|e| format!("invalid gradient config: {}", e))
}

fn run_new(name: Option<&str>, output: &Path, settings: &EditorSettings) -> Result<(), String> {
    let mut project = Project::new_untitled(1, settings);
    let saved = match name {
        Some(name) => {
            project.rename(name);
            project.path = Some(output.to_path_buf());
            project.save()
        }
        None => project.save_as(output),
    };
    saved.map_err(|e| format!("{}: {}", output.display(), e))?;
    println!("{} '{}'", output.display(), project.name);
    Ok(())
}

fn run_add(
    path: &Path,
    size: CardSize,
    text: Option<String>,
    settings: &EditorSettings,
) -> Result<(), String> {
    let mut project = open_project(path, settings)?;
    let id = project.add_card(size).map_err(|e| e.to_string())?;
    if let Some(text) = text {
        project
            .update_card(&id, Instant::now(), |c| c.text = text)
            .map_err(|e| e.to_string())?;
    }
    save_project(&mut project)?;
    if let Some(c) = project.card(&id) {
        println!("{} {} at ({}, {})", c.id, c.size, c.x, c.y);
    }
    Ok(())
}

fn run_move(path: &Path, card: &str, x: i32, y: i32, settings: &EditorSettings) -> Result<(), String> {
    let mut project = open_project(path, settings)?;
    let kind = project.move_card(card, (x, y)).map_err(|e| e.to_string())?;
    save_project(&mut project)?;
    println!("{:?}", kind);
    Ok(())
}

fn run_resize(
    path: &Path,
    card: &str,
    size: CardSize,
    settings: &EditorSettings,
) -> Result<(), String> {
    let mut project = open_project(path, settings)?;
    project
        .resize_card(card, size, Instant::now())
        .map_err(|e| e.to_string())?;
    save_project(&mut project)?;
    if let Some(c) = project.card(card) {
        println!("{} {} at ({}, {})", c.id, c.size, c.x, c.y);
    }
    Ok(())
}

fn run_delete(path: &Path, card: &str, settings: &EditorSettings) -> Result<(), String> {
    let mut project = open_project(path, settings)?;
    if !project.delete_card(card) {
        return Err(format!("no card with id '{}'", card));
    }
    save_project(&mut project)
}

fn run_check(path: &Path) -> Result<(), String> {
    let layout = load(path)?;
    println!("{}: '{}', {} card(s)", path.display(), layout.name, layout.cards.len());
    for c in &layout.cards {
        println!("  {:<38} {:<8} ({:>2}, {:>2}) {:?}", c.id, c.size.name(), c.x, c.y, c.background_style());
    }
    Ok(())
}

fn run_render(
    path: &Path,
    output: &Path,
    scale: Option<f64>,
    padding: Option<u32>,
    settings: &EditorSettings,
) -> Result<(), String> {
    let layout = load(path)?;
    let is_json = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        write_json(&layout, output).map_err(|e| e.to_string())?;
        println!("{}", output.display());
        return Ok(());
    }

    let mut opts = ExportOptions::from_settings(settings);
    if let Some(s) = scale {
        opts.scale = s;
    }
    if let Some(p) = padding {
        opts.padding = p;
    }
    let image = render_layout(&layout.cards, &GRID_CONFIG, &opts);
    write_png(&image, output).map_err(|e| format!("save failed: {}", e))?;
    println!("{} ({}x{})", output.display(), image.width(), image.height());
    Ok(())
}

fn run_random(seed: Option<u32>, name: &str, output: &Path) -> Result<(), String> {
    let seed = seed.unwrap_or_else(|| crate::model::now_millis() as u32);
    let cards = generate_random_layout(seed, &GRID_CONFIG);
    if !validate_layout(&cards, &GRID_CONFIG) {
        return Err("generated layout failed validation".into());
    }
    let layout = Layout::new(uuid::Uuid::new_v4().to_string(), name, cards);
    save(&layout, output)?;
    println!("{} (seed {}, {} cards)", output.display(), seed, layout.cards.len());
    Ok(())
}

fn run_saved(action: SavedAction, store: &LayoutStore) -> Result<(), String> {
    let store_err = |e: crate::io::LayoutError| format!("{}: {}", store.path().display(), e);
    match action {
        SavedAction::List => {
            let mut layouts = store.list().map_err(store_err)?;
            layouts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            for l in &layouts {
                println!("{:<38} {:>3} card(s)  {}", l.id, l.cards.len(), l.name);
            }
        }
        SavedAction::Save { layout } => {
            let layout = load(&layout)?;
            let stored = store.save(&layout).map_err(store_err)?;
            println!("{} '{}'", stored.id, stored.name);
        }
        SavedAction::Load { id, output } => {
            let layout = store
                .get(&id)
                .map_err(store_err)?
                .ok_or_else(|| format!("no saved layout with id '{}'", id))?;
            write_layout(&layout, &output).map_err(|e| format!("{}: {}", output.display(), e))?;
            println!("{}", output.display());
        }
        SavedAction::Delete { id } => {
            if !store.delete(&id).map_err(store_err)? {
                return Err(format!("no saved layout with id '{}'", id));
            }
        }
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn open_project(path: &Path, settings: &EditorSettings) -> Result<Project, String> {
    Project::open(path, settings).map_err(|e| format!("{}: {}", path.display(), e))
}

fn save_project(project: &mut Project) -> Result<(), String> {
    let label = project
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| project.name.clone());
    project.save().map_err(|e| format!("{}: {}", label, e))
}

fn load(path: &Path) -> Result<Layout, String> {
    read_layout(path, &GRID_CONFIG).map_err(|e| format!("{}: {}", path.display(), e))
}

fn save(layout: &Layout, path: &Path) -> Result<(), String> {
    let mut layout = layout.clone();
    layout.updated_at = crate::model::now_millis();
    write_layout(&layout, path).map_err(|e| format!("{}: {}", path.display(), e))?;
    log_info!("cli: wrote {} ({} cards)", path.display(), layout.cards.len());
    Ok(())
}
